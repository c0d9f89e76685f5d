use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::app::ports::CacheStore;
use crate::error::{CatalogError, Result};
use crate::pipeline::processing::translate::{CacheNamespace, TranslationCache};

/// One pretty-printed JSON object per namespace under a directory.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    dir: PathBuf,
}

impl JsonCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, namespace: &CacheNamespace) -> PathBuf {
        self.dir.join(format!("{}.json", namespace.file_stem()))
    }
}

impl CacheStore for JsonCacheStore {
    fn load(&self, namespace: &CacheNamespace) -> Result<TranslationCache> {
        let path = self.path_for(namespace);
        if !path.exists() {
            return Ok(TranslationCache::new());
        }
        let content = fs::read_to_string(&path)?;
        // A corrupt snapshot is fatal: continuing would overwrite prior progress
        serde_json::from_str(&content).map_err(|e| {
            CatalogError::CacheStore(format!("unreadable snapshot {}: {}", path.display(), e))
        })
    }

    fn save(&self, namespace: &CacheNamespace, cache: &TranslationCache) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, cache)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(namespace))
            .map_err(|e| CatalogError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_namespace_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path());
        let cache = store.load(&CacheNamespace::new("Title", "de", "tr")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_failures() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path().join("cache"));
        let ns = CacheNamespace::new("Title", "de", "tr");
        let mut cache = TranslationCache::new();
        cache.insert("Haus", Some("Ev".into()));
        cache.insert("Kaputt", None);
        store.save(&ns, &cache).unwrap();

        assert_eq!(store.load(&ns).unwrap(), cache);
        // Namespaces do not share files
        let other = CacheNamespace::new("Title", "en", "tr");
        assert!(store.load(&other).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path());
        let ns = CacheNamespace::new("Title", "de", "tr");
        fs::write(store.path_for(&ns), "{ not json").unwrap();
        assert!(matches!(store.load(&ns), Err(CatalogError::CacheStore(_))));
    }

    #[test]
    fn test_language_with_separator_stays_in_cache_dir() {
        let dir = TempDir::new().unwrap();
        let store = JsonCacheStore::new(dir.path());
        let ns = CacheNamespace::new("Title", "zh/TW", "tr");
        let mut cache = TranslationCache::new();
        cache.insert("书", Some("Kitap".into()));
        store.save(&ns, &cache).unwrap();

        assert_eq!(store.path_for(&ns).parent(), Some(dir.path()));
        assert_eq!(store.load(&ns).unwrap(), cache);
    }
}
