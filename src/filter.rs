//! Heuristics for strings that carry no natural language.
//!
//! These are known to misclassify edge cases; callers can pass their own
//! predicate to the strings.xml reader instead of [`is_purely_technical`].

use regex::Regex;
use std::sync::LazyLock;

/// Longest value still considered a technical token
pub const TECHNICAL_MAX_LEN: usize = 50;

/// Signature of a "do not send this to the translator" predicate
pub type TechnicalPredicate = fn(&str) -> bool;

static PURELY_TECHNICAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // 42
        r"^[0-9]+$",
        // 1.0.0
        r"^[0-9]+(\.[0-9]+)+$",
        // androidx.startup.InitializationProvider
        r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+){2,}$",
        r"^https?://\S+$",
        r"^#([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$",
        // MAX_RETRY_COUNT
        r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("technical pattern should compile"))
    .collect()
});

static FORMAT_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(\d+\$)?[-#+ 0,(]*\d*(\.\d+)?[sdfxXoceEgGb%]")
        .expect("format specifier pattern should compile")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("placeholder pattern should compile"));

static EMBEDDED_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(androidx|android|java|kotlin)\.[A-Za-z0-9_.]+")
        .expect("identifier pattern should compile")
});

/// True when `value` should be copied through untranslated: blank strings,
/// numbers, versions, dotted identifiers with at least three segments, bare
/// URLs, hex colors, all-caps constants, and strings made only of
/// placeholders and format specifiers.
pub fn is_purely_technical(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }

    let short_token = trimmed.chars().count() <= TECHNICAL_MAX_LEN
        && !trimmed.chars().any(char::is_whitespace);
    if short_token && PURELY_TECHNICAL.iter().any(|re| re.is_match(trimmed)) {
        return true;
    }

    is_only_placeholders(trimmed)
}

/// Placeholders and format specifiers with nothing worth translating around them
fn is_only_placeholders(value: &str) -> bool {
    if !contains_placeholders(value) {
        return false;
    }
    let stripped = FORMAT_SPECIFIER.replace_all(value, "");
    let stripped = PLACEHOLDER.replace_all(&stripped, "");
    !stripped.chars().any(char::is_alphabetic)
}

pub fn contains_placeholders(value: &str) -> bool {
    FORMAT_SPECIFIER.is_match(value) || PLACEHOLDER.is_match(value)
}

/// Natural-language text mixed with parts a translator must keep verbatim
pub fn contains_technical_parts(value: &str) -> bool {
    contains_placeholders(value) || EMBEDDED_IDENTIFIER.is_match(value)
}
