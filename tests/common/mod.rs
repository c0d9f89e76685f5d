#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use catalog_sync::app::ports::{CacheStore, Translator};
use catalog_sync::config::BackoffKind;
use catalog_sync::error::{Result, TranslateError};
use catalog_sync::infra::JsonCacheStore;
use catalog_sync::pipeline::processing::translate::{
    CacheNamespace, EngineSettings, RetryPolicy, TranslationCache,
};
use catalog_sync::rate_limiter::PacingPolicy;
use catalog_sync::types::{Record, Table};

/// In-process translator answering "{source}>{target}:{text}".
#[derive(Clone, Default)]
pub struct FakeTranslator {
    pub calls: Arc<AtomicUsize>,
    pub resets: Arc<AtomicUsize>,
    /// Texts that always fail
    always_fail: HashSet<String>,
    /// Texts that fail this many more times before succeeding
    flaky: Arc<Mutex<HashMap<String, usize>>>,
    /// Raise the flag once this many calls have been made
    interrupt_after: Option<(usize, Arc<AtomicBool>)>,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.always_fail.insert(text.to_string());
        self
    }

    pub fn flaky_on(self, text: &str, failures: usize) -> Self {
        self.flaky
            .lock()
            .unwrap()
            .insert(text.to_string(), failures);
        self
    }

    pub fn interrupting_after(mut self, calls: usize, flag: Arc<AtomicBool>) -> Self {
        self.interrupt_after = Some((calls, flag));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslateError> {
        let made = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, flag)) = &self.interrupt_after {
            if made >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        if self.always_fail.contains(text) {
            return Err(TranslateError::Engine(format!("cannot translate '{text}'")));
        }
        if let Some(left) = self.flaky.lock().unwrap().get_mut(text) {
            if *left > 0 {
                *left -= 1;
                return Err(TranslateError::Rejected {
                    status: 503,
                    message: "busy".to_string(),
                });
            }
        }
        Ok(format!("{source_lang}>{target_lang}:{text}"))
    }

    async fn reset(&mut self) -> std::result::Result<(), TranslateError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// JSON store that counts snapshot writes.
pub struct CountingStore {
    pub inner: JsonCacheStore,
    pub saves: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: JsonCacheStore) -> Self {
        Self {
            inner,
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CacheStore for CountingStore {
    fn load(&self, namespace: &CacheNamespace) -> Result<TranslationCache> {
        self.inner.load(namespace)
    }

    fn save(&self, namespace: &CacheNamespace, cache: &TranslationCache) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(namespace, cache)
    }
}

/// No waiting between calls or retries.
pub fn fast_settings(checkpoint_every: usize) -> EngineSettings {
    EngineSettings {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            backoff: BackoffKind::Linear,
            jitter: Duration::ZERO,
        },
        pacing: PacingPolicy::unthrottled(),
        checkpoint_every,
        progress_every: 0,
    }
}

pub fn title_table(values: &[&str]) -> Table {
    let rows = values
        .iter()
        .map(|v| Record::from_pairs([("Title", *v)]))
        .collect();
    Table::with_rows(vec!["Title".to_string()], rows)
}
