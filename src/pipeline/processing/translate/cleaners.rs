//! Pure string transforms applied around a translation call.

use once_cell::sync::Lazy;
use regex::Regex;

pub type Cleaner = fn(&str) -> String;

static SOURCE_QUALIFIERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(renewed|refurbished)\b").expect("valid qualifier pattern"));

static TRANSLATED_QUALIFIERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\byenilenmiş\b").expect("valid qualifier pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Removes refurbishment qualifiers from a source title.
pub fn strip_qualifiers(text: &str) -> String {
    collapse_whitespace(&SOURCE_QUALIFIERS.replace_all(text, ""))
}

/// Removes the translated refurbishment qualifier from a result.
pub fn strip_translated_qualifiers(text: &str) -> String {
    collapse_whitespace(&TRANSLATED_QUALIFIERS.replace_all(text, ""))
}

/// Resolves a cleaner by its config name.
pub fn lookup(name: &str) -> Option<Cleaner> {
    match name {
        "strip_qualifiers" => Some(strip_qualifiers as Cleaner),
        "strip_translated_qualifiers" => Some(strip_translated_qualifiers as Cleaner),
        "collapse_whitespace" => Some(collapse_whitespace as Cleaner),
        _ => None,
    }
}

/// Optional pre/post hooks for one translation job.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCleaners {
    pub pre: Option<Cleaner>,
    pub post: Option<Cleaner>,
}

impl TextCleaners {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pre_clean(&self, text: &str) -> String {
        self.pre.map_or_else(|| text.to_string(), |f| f(text))
    }

    pub fn post_clean(&self, text: &str) -> String {
        self.post.map_or_else(|| text.to_string(), |f| f(text))
    }
}
