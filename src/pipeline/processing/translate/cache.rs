use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use super::TranslationOutcome;

/// Identifies one independent cache: a text field translated from one
/// language into another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheNamespace {
    pub field: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl CacheNamespace {
    pub fn new(
        field: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Stable key used by storage backends.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.field, self.source_lang, self.target_lang)
    }

    /// Filesystem-safe name: readable slugs plus a short digest of the key, so
    /// namespaces that slug to the same text never share a file.
    pub fn file_stem(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!(
            "{}_{}_{}-{}",
            slug(&self.field),
            slug(&self.source_lang),
            slug(&self.target_lang),
            &digest[..8]
        )
    }
}

fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}->{}", self.field, self.source_lang, self.target_lang)
    }
}

/// Raw text → translation. `None` marks a value that was attempted and failed;
/// it stays terminal until explicitly discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationCache {
    entries: BTreeMap<String, Option<String>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the value has a terminal result, success or failure.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// `None` when unknown, `Some(None)` when previously failed.
    pub fn get(&self, text: &str) -> Option<Option<&str>> {
        self.entries.get(text).map(|v| v.as_deref())
    }

    /// The successful translation, if any.
    pub fn translation(&self, text: &str) -> Option<&str> {
        self.get(text).flatten()
    }

    pub fn insert(&mut self, text: impl Into<String>, translation: Option<String>) {
        self.entries.insert(text.into(), translation);
    }

    pub fn record(&mut self, text: impl Into<String>, outcome: &TranslationOutcome) {
        self.insert(text, outcome.translation().map(str::to_string));
    }

    pub fn succeeded(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.values().filter(|v| v.is_none()).count()
    }

    /// Forgets failed entries so the next run attempts them again.
    pub fn discard_failures(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, v| v.is_some());
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl FromIterator<(String, Option<String>)> for TranslationCache {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_entries_are_terminal_until_discarded() {
        let mut cache = TranslationCache::new();
        cache.insert("Bausatz", Some("Yapı seti".to_string()));
        cache.insert("Kaputt", None);

        assert!(cache.contains("Kaputt"));
        assert_eq!(cache.get("Kaputt"), Some(None));
        assert_eq!(cache.get("unknown"), None);
        assert_eq!(cache.translation("Bausatz"), Some("Yapı seti"));
        assert_eq!((cache.succeeded(), cache.failed()), (1, 1));

        assert_eq!(cache.discard_failures(), 1);
        assert!(!cache.contains("Kaputt"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_snapshot_json_uses_null_for_failures() {
        let mut cache = TranslationCache::new();
        cache.insert("Spielzeug", Some("Oyuncak".to_string()));
        cache.insert("???", None);
        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(json, r#"{"???":null,"Spielzeug":"Oyuncak"}"#);
    }

    #[test]
    fn test_file_stem_is_safe_and_distinct() {
        let a = CacheNamespace::new("Categories: Tree", "de", "tr");
        let b = CacheNamespace::new("Categories/Tree", "de", "tr");
        assert!(a.file_stem().starts_with("categories_tree_de_tr-"));
        assert!(a.file_stem().chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        assert_ne!(a.file_stem(), b.file_stem());
    }

    #[test]
    fn test_file_stem_slugs_languages() {
        let ns = CacheNamespace::new("Title", "zh/TW", "../tr");
        let stem = ns.file_stem();
        assert!(stem.starts_with("title_zh_tw_tr-"));
        assert!(!stem.contains('/') && !stem.contains(".."));
        assert_ne!(stem, CacheNamespace::new("Title", "zh_TW", "tr").file_stem());
    }
}
