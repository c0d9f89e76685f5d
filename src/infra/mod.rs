//! Adapters for files, cache storage and translation backends.

pub mod command_translator;
pub mod csv_table;
pub mod http_translator;
pub mod json_cache_store;
pub mod sqlite_cache_store;

use std::sync::Arc;
use std::time::Duration;

use crate::app::ports::{CacheStore, Translator};
use crate::config::{BackendConfig, CacheConfig, CacheKind};
use crate::error::{CatalogError, Result};

pub use command_translator::CommandTranslator;
pub use csv_table::{read_table, write_table};
pub use http_translator::HttpTranslator;
pub use json_cache_store::JsonCacheStore;
pub use sqlite_cache_store::SqliteCacheStore;

pub fn build_translator(backend: &BackendConfig) -> Result<Box<dyn Translator>> {
    match backend {
        BackendConfig::Online {
            endpoint,
            api_key,
            timeout_secs,
        } => {
            let translator =
                HttpTranslator::new(endpoint, api_key.clone(), Duration::from_secs(*timeout_secs))
                    .map_err(|e| CatalogError::Config(format!("cannot build HTTP client: {e}")))?;
            Ok(Box::new(translator))
        }
        BackendConfig::Offline {
            command,
            args,
            timeout_secs,
        } => Ok(Box::new(CommandTranslator::new(
            command,
            args.clone(),
            Duration::from_secs(*timeout_secs),
        ))),
    }
}

pub fn build_cache_store(cache: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match cache.kind {
        CacheKind::Json => Ok(Arc::new(JsonCacheStore::new(cache.path.clone()))),
        CacheKind::Sqlite => Ok(Arc::new(SqliteCacheStore::open(&cache.path)?)),
    }
}
