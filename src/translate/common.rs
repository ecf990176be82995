use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, TranslateError};

/// Target languages with a prompt name; anything else is treated as Vietnamese
pub const SUPPORTED_LANGUAGES: [&str; 9] = ["vi", "en", "zh", "ru", "ko", "es", "fr", "de", "ja"];

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s*(.+)$").expect("numbered line pattern should compile"));

/// Build the shared HTTP client with a hard per-request timeout
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// True when `code` has its own language name in the prompt
pub fn is_supported_language(code: &str) -> bool {
    let code = code.trim().to_lowercase();
    SUPPORTED_LANGUAGES.contains(&code.as_str())
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> &'static str {
    match code.trim().to_lowercase().as_str() {
        "vi" => "Vietnamese",
        "en" => "English",
        "zh" => "Chinese",
        "ru" => "Russian",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "ja" => "Japanese",
        _ => "Vietnamese",
    }
}

/// Build the translation prompt: a bare request for one text, numbered
/// `k. text` lines for several.
pub fn build_translation_prompt(texts: &[String], target_language: &str) -> String {
    let language_name = language_code_to_name(target_language);

    if let [text] = texts {
        return format!(
            "Translate the following Android string resource value into {}. \
             Return ONLY the translated text without any quotes, explanations, or additional formatting. \
             IMPORTANT: Do NOT translate technical identifiers, package names (like androidx.startup), \
             class names, URLs, placeholders (like {{name}}), or format specifiers (like %s, %d). \
             Keep those exactly as they are in the original text.\n\
             \n\
             Original text: {}",
            language_name, text
        );
    }

    let numbered_texts = texts
        .iter()
        .enumerate()
        .map(|(index, text)| format!("{}. {}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Translate the following Android string resource values into {}.\n\
         Return ONLY the translated texts, one per line, in the same order.\n\
         Format: [number]. [translated text]\n\
         Do not add quotes around the translated text.\n\
         IMPORTANT: Do NOT translate technical identifiers, package names (like androidx.startup), \
         class names, URLs, placeholders (like {{name}}), or format specifiers (like %s, %d).\n\
         \n\
         Original texts:\n\
         {}",
        language_name, numbered_texts
    )
}

/// Strip whitespace and one pair of matching surrounding quotes
pub fn clean_translation(text: &str) -> String {
    let trimmed = text.trim();
    let unquoted = strip_surrounding(trimmed, '"');
    let unquoted = strip_surrounding(unquoted, '\'');
    unquoted.to_string()
}

fn strip_surrounding(text: &str, quote: char) -> &str {
    if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
        &text[quote.len_utf8()..text.len() - quote.len_utf8()]
    } else {
        text
    }
}

/// Extract translations from the model's reply.
///
/// A single text takes the whole reply. For several, `k. text` lines are
/// placed by their number and the run of answers from `1.` onwards is
/// returned, so a missing or garbled line shortens the result instead of
/// shifting the rest. A reply with no numbering at all falls back to its
/// first `expected` non-blank lines. The result is never longer than
/// `expected`; an empty result is a malformed response.
pub fn parse_translations(provider: &str, content: &str, expected: usize) -> Result<Vec<String>> {
    let content = content.trim();
    if content.is_empty() || expected == 0 {
        return Err(malformed(provider, "empty translation received"));
    }

    if expected == 1 {
        return Ok(vec![clean_translation(content)]);
    }

    let mut slots: Vec<Option<String>> = vec![None; expected];
    let mut numbered = 0;
    for caps in content.lines().filter_map(|line| NUMBERED_LINE.captures(line.trim())) {
        numbered += 1;
        let Ok(number) = caps[1].parse::<usize>() else {
            continue;
        };
        if let Some(slot) = number.checked_sub(1).and_then(|i| slots.get_mut(i)) {
            slot.get_or_insert_with(|| clean_translation(&caps[2]));
        }
    }

    if numbered == 0 {
        warn!("{} returned no numbered lines for {} texts, using raw lines", provider, expected);
        debug!("Unnumbered response: {}", content);
        return Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(expected)
            .map(clean_translation)
            .collect());
    }

    let translations: Vec<String> = slots.into_iter().map_while(|slot| slot).collect();
    if translations.is_empty() {
        debug!("Unmatched response: {}", content);
        return Err(malformed(provider, "reply does not start at line 1"));
    }
    if translations.len() < expected {
        warn!(
            "{} answered {} of {} numbered lines in order",
            provider,
            translations.len(),
            expected
        );
        debug!("Partial response: {}", content);
    }
    Ok(translations)
}

fn malformed(provider: &str, message: &str) -> TranslateError {
    TranslateError::MalformedResponse {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

/// Map a non-success HTTP status onto the failure taxonomy
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> TranslateError {
    let provider = provider.to_string();
    let code = status.as_u16();
    match code {
        401 | 403 => TranslateError::Auth { provider, status: code },
        404 => TranslateError::NotFound {
            provider,
            message: body_or_reason(status, body),
        },
        429 => TranslateError::RateLimited { provider },
        500..=599 => TranslateError::Server { provider, status: code },
        _ => TranslateError::Api {
            provider,
            status: code,
            message: body_or_reason(status, body),
        },
    }
}

fn body_or_reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        body.chars().take(500).collect()
    }
}

/// Connection, DNS, TLS and timeout failures
pub fn network_error(provider: &str, error: reqwest::Error) -> TranslateError {
    let message = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    };
    TranslateError::Network {
        provider: provider.to_string(),
        message,
    }
}

/// Turn a failed response into a classified error, logging the body
pub async fn error_from_response(provider: &str, response: reqwest::Response) -> TranslateError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!("{} HTTP {}: {}", provider, status.as_u16(), body);
    classify_status(provider, status, &body)
}
