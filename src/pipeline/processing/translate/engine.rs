use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{CacheNamespace, TranslationCache};
use super::cleaners::TextCleaners;
use super::TranslationOutcome;
use crate::app::ports::{CacheStore, Translator};
use crate::config::BackoffKind;
use crate::constants;
use crate::error::{CatalogError, Result, TranslateError};
use crate::rate_limiter::{Pacer, PacingPolicy};
use crate::types::{Record, Table};

/// Bounded retry for one distinct value.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: BackoffKind,
    /// Upper bound of the random extra delay added to each wait
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::MAX_TRANSLATE_ATTEMPTS,
            base_delay: Duration::from_millis(constants::RETRY_BASE_DELAY_MS),
            backoff: BackoffKind::Exponential,
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the `attempt`-th failure (1-based), without jitter.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            BackoffKind::Linear => self.base_delay.saturating_mul(attempt),
            BackoffKind::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt - 1)),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        if self.jitter.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        base + Duration::from_millis(extra)
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub retry: RetryPolicy,
    pub pacing: PacingPolicy,
    /// Persist the cache after this many newly completed values
    pub checkpoint_every: usize,
    pub progress_every: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            pacing: PacingPolicy {
                min_interval: Duration::from_millis(constants::PACING_DELAY_MS),
                block_size: constants::PACING_BLOCK_SIZE,
                block_pause: Duration::from_millis(constants::PACING_BLOCK_PAUSE_MS),
                requests_per_min: None,
            },
            checkpoint_every: constants::CHECKPOINT_EVERY,
            progress_every: constants::PROGRESS_EVERY,
        }
    }
}

/// Counts for one namespace run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    pub distinct_values: usize,
    /// Values skipped because the loaded snapshot already had a result
    pub already_cached: usize,
    pub translated: usize,
    pub failed: usize,
    /// Calls made to the translator, retries included
    pub calls: usize,
    pub retries: usize,
    pub checkpoints: usize,
    /// Failed entries dropped from the snapshot before the run
    pub failures_discarded: usize,
}

#[derive(Debug, Clone)]
pub struct ColumnTranslation {
    pub namespace: CacheNamespace,
    pub cache: TranslationCache,
    pub report: TranslationReport,
}

/// Drives distinct text values through a translator, one at a time, with
/// retry, pacing and periodic snapshots.
pub struct TranslationEngine {
    translator: Box<dyn Translator>,
    store: Arc<dyn CacheStore>,
    settings: EngineSettings,
    pacer: Pacer,
    retry_failed: bool,
    interrupt: Option<Arc<AtomicBool>>,
}

impl TranslationEngine {
    pub fn new(
        translator: Box<dyn Translator>,
        store: Arc<dyn CacheStore>,
        settings: EngineSettings,
    ) -> Self {
        let pacer = Pacer::new(settings.pacing.clone());
        Self {
            translator,
            store,
            settings,
            pacer,
            retry_failed: false,
            interrupt: None,
        }
    }

    /// Discard previously failed entries on load so they are attempted again.
    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    /// Stop cleanly (after checkpointing) once the flag is raised.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Translates every distinct value of `field` among the rows accepted by
    /// `include`, resuming from the persisted snapshot of the namespace.
    pub async fn translate_column<F>(
        &mut self,
        table: &Table,
        field: &str,
        source_lang: &str,
        target_lang: &str,
        cleaners: &TextCleaners,
        include: F,
    ) -> Result<ColumnTranslation>
    where
        F: Fn(&Record) -> bool,
    {
        let namespace = CacheNamespace::new(field, source_lang, target_lang);
        let mut cache = self.store.load(&namespace)?;
        let mut report = TranslationReport::default();
        if self.retry_failed {
            report.failures_discarded = cache.discard_failures();
        }

        let values = distinct_values(table, field, include);
        report.distinct_values = values.len();
        let pending: Vec<String> = values.into_iter().filter(|v| !cache.contains(v)).collect();
        report.already_cached = report.distinct_values - pending.len();

        info!(
            "[{}] {} distinct values, {} cached, {} to translate via {}",
            namespace,
            report.distinct_values,
            report.already_cached,
            pending.len(),
            self.translator.name()
        );

        let total = pending.len();
        let mut completed = 0usize;
        for value in pending {
            if self.interrupted() {
                self.checkpoint(&namespace, &cache, &mut report)?;
                warn!("[{}] interrupted after {}/{} values", namespace, completed, total);
                return Err(CatalogError::Interrupted);
            }

            let outcome = self
                .translate_value(&value, source_lang, target_lang, cleaners, &mut report)
                .await;
            match &outcome {
                TranslationOutcome::Success(_) => report.translated += 1,
                TranslationOutcome::Failure(reason) => {
                    report.failed += 1;
                    warn!("[{}] giving up on value: {}", namespace, reason);
                }
            }
            cache.record(value, &outcome);
            completed += 1;

            if completed % self.settings.checkpoint_every.max(1) == 0 {
                self.checkpoint(&namespace, &cache, &mut report)?;
            }
            if self.settings.progress_every > 0 && completed % self.settings.progress_every == 0 {
                info!(
                    "[{}] progress {}/{} | ok={} fail={}",
                    namespace, completed, total, report.translated, report.failed
                );
            }
        }

        let unsaved = completed % self.settings.checkpoint_every.max(1) != 0;
        if unsaved || report.failures_discarded > 0 {
            self.checkpoint(&namespace, &cache, &mut report)?;
        }

        info!(
            "[{}] done: {} translated, {} failed, {} calls ({} retries)",
            namespace, report.translated, report.failed, report.calls, report.retries
        );
        crate::metrics::translate::column_finished(&report);

        Ok(ColumnTranslation {
            namespace,
            cache,
            report,
        })
    }

    fn checkpoint(
        &self,
        namespace: &CacheNamespace,
        cache: &TranslationCache,
        report: &mut TranslationReport,
    ) -> Result<()> {
        self.store.save(namespace, cache)?;
        report.checkpoints += 1;
        debug!("[{}] checkpoint with {} entries", namespace, cache.len());
        crate::metrics::translate::checkpoint_written();
        Ok(())
    }

    /// PENDING → (attempt → retryable failure)* → DONE(success | failure).
    async fn translate_value(
        &mut self,
        value: &str,
        source_lang: &str,
        target_lang: &str,
        cleaners: &TextCleaners,
        report: &mut TranslationReport,
    ) -> TranslationOutcome {
        let prepared = cleaners.pre_clean(value);
        if prepared.trim().is_empty() {
            return TranslationOutcome::Failure("empty after pre-clean".to_string());
        }

        let max_attempts = self.settings.retry.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            self.pacer.acquire().await;
            report.calls += 1;

            match self.attempt(&prepared, source_lang, target_lang).await {
                Ok(raw) => {
                    let cleaned = cleaners.post_clean(&raw);
                    if cleaned.trim().is_empty() {
                        return TranslationOutcome::Failure("empty after post-clean".to_string());
                    }
                    debug!(attempt, "translated value");
                    return TranslationOutcome::Success(cleaned);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "translation attempt failed");
                    last_error = e.to_string();
                }
            }

            // Failures can leave the session in a bad state
            if let Err(e) = self.translator.reset().await {
                warn!(error = %e, "translator reset failed");
            }
            if attempt < max_attempts {
                report.retries += 1;
                tokio::time::sleep(self.settings.retry.delay_for(attempt)).await;
            }
        }
        TranslationOutcome::Failure(last_error)
    }

    async fn attempt(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslateError> {
        let out = self.translator.translate(text, source_lang, target_lang).await?;
        if out.trim().is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        Ok(out)
    }
}

/// Distinct trimmed, non-empty values of `field` in first-seen order.
pub fn distinct_values<F>(table: &Table, field: &str, include: F) -> Vec<String>
where
    F: Fn(&Record) -> bool,
{
    let mut seen = HashSet::new();
    table
        .rows()
        .iter()
        .filter(|row| include(row))
        .filter_map(|row| row.get_trimmed(field))
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub rows: usize,
    pub filled: usize,
    /// Rows whose source value was null or blank
    pub blank_source: usize,
    /// Rows whose value has a failed or missing translation
    pub untranslated: usize,
}

impl ApplyReport {
    pub fn merge(&mut self, other: &ApplyReport) {
        self.rows += other.rows;
        self.filled += other.filled;
        self.blank_source += other.blank_source;
        self.untranslated += other.untranslated;
    }
}

/// Fills `output_column` of every included row from the cache, keyed by the
/// row's trimmed `field` value. Blank sources and failures become null.
pub fn apply_translations<F>(
    table: &mut Table,
    field: &str,
    output_column: &str,
    cache: &TranslationCache,
    include: F,
) -> ApplyReport
where
    F: Fn(&Record) -> bool,
{
    table.ensure_column(output_column);
    let mut report = ApplyReport::default();
    for row in table.rows_mut().iter_mut().filter(|row| include(row)) {
        report.rows += 1;
        let translated = match row.get_trimmed(field) {
            None => {
                report.blank_source += 1;
                None
            }
            Some(value) => match cache.translation(value) {
                Some(t) => {
                    report.filled += 1;
                    Some(t.to_string())
                }
                None => {
                    report.untranslated += 1;
                    None
                }
            },
        };
        row.set(output_column, translated);
    }
    report
}

/// Translates one column with default pacing and retry settings and returns
/// the full raw text → translation mapping of its namespace.
pub async fn translate_table_column(
    table: &Table,
    field: &str,
    source_lang: &str,
    target_lang: &str,
    translator: Box<dyn Translator>,
    store: Arc<dyn CacheStore>,
) -> Result<TranslationCache> {
    let mut engine = TranslationEngine::new(translator, store, EngineSettings::default());
    let result = engine
        .translate_column(table, field, source_lang, target_lang, &TextCleaners::none(), |_| true)
        .await?;
    Ok(result.cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_with_attempts() {
        let linear = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            backoff: BackoffKind::Linear,
            jitter: Duration::ZERO,
        };
        assert_eq!(linear.delay_for(1), Duration::from_millis(100));
        assert_eq!(linear.delay_for(2), Duration::from_millis(200));

        let exponential = RetryPolicy {
            backoff: BackoffKind::Exponential,
            ..linear
        };
        assert_eq!(exponential.delay_for(1), Duration::from_millis(100));
        assert_eq!(exponential.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            backoff: BackoffKind::Linear,
            jitter: Duration::from_millis(5),
        };
        for _ in 0..20 {
            let d = policy.delay_for(1);
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(15));
        }
    }

    #[test]
    fn test_distinct_values_trim_and_skip_blank() {
        let rows = vec![
            Record::from_pairs([("Title", " Haus ")]),
            Record::from_pairs([("Title", "Haus")]),
            Record::from_pairs([("Title", "   ")]),
            Record::new(),
            Record::from_pairs([("Title", "Auto")]),
        ];
        let table = Table::with_rows(vec!["Title".into()], rows);
        assert_eq!(distinct_values(&table, "Title", |_| true), vec!["Haus", "Auto"]);
    }

    #[test]
    fn test_apply_translations_never_writes_empty_strings() {
        let rows = vec![
            Record::from_pairs([("Title", " Haus ")]),
            Record::from_pairs([("Title", "Kaputt")]),
            Record::new(),
        ];
        let mut table = Table::with_rows(vec!["Title".into()], rows);
        let mut cache = TranslationCache::new();
        cache.insert("Haus", Some("Ev".to_string()));
        cache.insert("Kaputt", None);

        let report = apply_translations(&mut table, "Title", "TR", &cache, |_| true);
        assert_eq!(
            report,
            ApplyReport {
                rows: 3,
                filled: 1,
                blank_source: 1,
                untranslated: 1
            }
        );
        assert_eq!(table.rows()[0].get("TR"), Some("Ev"));
        assert_eq!(table.rows()[1].get("TR"), None);
        assert_eq!(table.rows()[2].get("TR"), None);
    }
}
