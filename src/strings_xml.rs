//! Reading and writing Android `strings.xml` files.
//!
//! Only `<string>` elements are handled. Markup nested inside a string value
//! is flattened to its text content.

use quick_xml::{
    Reader, Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, TranslateError};
use crate::filter::{TechnicalPredicate, contains_technical_parts, is_purely_technical};
use crate::progress::LogSink;
use crate::resource::StringResource;

/// Result of reading a strings.xml file
#[derive(Debug, Clone, Default)]
pub struct ParsedStrings {
    /// Entries in file order; technical ones arrive already "translated"
    pub resources: Vec<StringResource>,
    /// Entries marked `translatable="false"`, left out entirely
    pub non_translatable: usize,
    /// Entries copied through unchanged by the technical heuristic
    pub technical: usize,
    /// Entries without any text, left out like non-translatable ones
    pub empty: usize,
    /// Entries to translate that carry placeholders or identifiers to keep
    pub with_technical_parts: usize,
}

impl ParsedStrings {
    pub fn pending(&self) -> usize {
        self.resources.iter().filter(|r| r.needs_translation()).count()
    }
}

pub fn parse_strings_xml<R: BufRead>(reader: R) -> Result<ParsedStrings> {
    parse_strings_xml_with(reader, is_purely_technical)
}

pub fn parse_strings_xml_with<R: BufRead>(
    reader: R,
    is_technical: TechnicalPredicate,
) -> Result<ParsedStrings> {
    let mut xml_reader = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut parsed = ParsedStrings::default();

    loop {
        let entry = match xml_reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"string" => {
                let (name, translatable) = string_attributes(e)?;
                let value = read_string_value(&mut xml_reader)?;
                Some((name, translatable, value))
            }
            Event::Empty(ref e) if e.name().as_ref() == b"string" => {
                let (name, translatable) = string_attributes(e)?;
                Some((name, translatable, String::new()))
            }
            Event::Eof => break,
            _ => None,
        };
        buf.clear();

        let Some((name, translatable, value)) = entry else {
            continue;
        };
        if !translatable {
            parsed.non_translatable += 1;
            continue;
        }
        if value.trim().is_empty() {
            parsed.empty += 1;
            continue;
        }

        let mut resource = StringResource::new(name, value);
        if is_technical(&resource.source_value) {
            resource.translated_value = resource.source_value.clone();
            parsed.technical += 1;
        } else if contains_technical_parts(&resource.source_value) {
            parsed.with_technical_parts += 1;
        }
        parsed.resources.push(resource);
    }

    debug!(
        "Parsed {} strings ({} technical, {} non-translatable, {} empty, {} with placeholders or identifiers)",
        parsed.resources.len(),
        parsed.technical,
        parsed.non_translatable,
        parsed.empty,
        parsed.with_technical_parts
    );
    Ok(parsed)
}

fn string_attributes(e: &BytesStart) -> Result<(String, bool)> {
    let mut name = None;
    let mut translatable = true;

    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| TranslateError::InvalidResource(e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.to_string()),
            b"translatable" => translatable = attr.unescape_value()?.trim() != "false",
            _ => {}
        }
    }

    let name = name
        .ok_or_else(|| TranslateError::InvalidResource("<string> is missing 'name'".to_string()))?;
    Ok((name, translatable))
}

fn read_string_value<R: BufRead>(xml_reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut value = String::new();
    let mut depth = 1usize;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Text(e) => value.push_str(&e.unescape()?),
            Event::CData(e) => value.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => {
                return Err(TranslateError::InvalidResource(
                    "unexpected end of file inside <string>".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(value)
}

pub fn read_strings_file<P: AsRef<Path>>(path: P) -> Result<ParsedStrings> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TranslateError::FileNotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    parse_strings_xml(std::io::BufReader::new(file))
}

/// One `<string>` per resource: the translation when present, else the source
pub fn write_strings_xml<W: Write>(writer: W, resources: &[StringResource]) -> Result<()> {
    let mut xml_writer = Writer::new_with_indent(writer, b' ', 4);

    xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    xml_writer.write_event(Event::Start(BytesStart::new("resources")))?;

    for resource in resources {
        let mut elem = BytesStart::new("string");
        elem.push_attribute(("name", resource.name.as_str()));
        xml_writer.write_event(Event::Start(elem))?;
        let text = BytesText::from_escaped(partial_escape(resource.output_value()));
        xml_writer.write_event(Event::Text(text))?;
        xml_writer.write_event(Event::End(BytesEnd::new("string")))?;
    }

    xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
    xml_writer.get_mut().write_all(b"\n")?;
    Ok(())
}

/// `values-<lang>` resource folder; English goes to the default `values`
pub fn values_folder_name(target_language: &str) -> String {
    match target_language.trim().to_lowercase().as_str() {
        "en" => "values".to_string(),
        lang => format!("values-{}", lang),
    }
}

/// `<root>/res/<values folder>/strings.xml`
pub fn output_path<P: AsRef<Path>>(root: P, target_language: &str) -> PathBuf {
    root.as_ref()
        .join("res")
        .join(values_folder_name(target_language))
        .join("strings.xml")
}

/// Write the translated file under `root` and record the outcome in `log`
pub async fn save_translated_file<P: AsRef<Path>>(
    root: P,
    target_language: &str,
    resources: &[StringResource],
    log: &LogSink,
) -> Result<PathBuf> {
    let result = write_translated_file(root.as_ref(), target_language, resources).await;
    match &result {
        Ok(path) => log.info(format!("Saved file to {}.", path.display())),
        Err(e) => log.error(format!("Failed to save file: {}", e)),
    }
    result
}

async fn write_translated_file(
    root: &Path,
    target_language: &str,
    resources: &[StringResource],
) -> Result<PathBuf> {
    if resources.is_empty() {
        return Err(TranslateError::InvalidResource("No strings to save".to_string()));
    }

    let path = output_path(root, target_language);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut content = Vec::new();
    write_strings_xml(&mut content, resources)?;
    fs::write(&path, content).await?;

    info!("Wrote {} strings to {}", resources.len(), path.display());
    Ok(path)
}
