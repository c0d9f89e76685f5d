use async_trait::async_trait;

use crate::error::{Result, TranslateError};
use crate::pipeline::processing::translate::cache::{CacheNamespace, TranslationCache};

/// A text translation backend. Online and offline engines both implement
/// this and can be swapped without touching the cache engine.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslateError>;

    /// Rebuild any connection or session state after a failed call.
    async fn reset(&mut self) -> std::result::Result<(), TranslateError> {
        Ok(())
    }
}

/// Durable snapshot storage for translation caches.
///
/// `load` of an unknown namespace returns an empty cache. `save` replaces the
/// whole namespace atomically: readers see the old or the new snapshot.
pub trait CacheStore: Send + Sync {
    fn load(&self, namespace: &CacheNamespace) -> Result<TranslationCache>;
    fn save(&self, namespace: &CacheNamespace, cache: &TranslationCache) -> Result<()>;
}
