use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::app::ports::{CacheStore, Translator};
use crate::config::PipelineConfig;
use crate::constants;
use crate::error::{CatalogError, Result};
use crate::infra;
use crate::pipeline::processing::filters::{shape_output, OutputReport};
use crate::pipeline::processing::normalize::{
    clean_code_column, convert_price_column, CodeCleanReport, CodePolicy, CurrencyTable, PriceReport,
};
use crate::pipeline::processing::reconcile::{reconcile, ReconcileOptions, ReconcileReport, SourceTable};
use crate::pipeline::processing::translate::{
    run_job, EngineSettings, JobReport, LanguageRouting, RetryPolicy, TranslationEngine, TranslationJob,
};
use crate::rate_limiter::PacingPolicy;
use crate::types::Table;

/// Counts collected over one run, printed by the CLI.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Rows read per source id
    pub rows_read: BTreeMap<String, usize>,
    pub codes: BTreeMap<String, CodeCleanReport>,
    pub prices: BTreeMap<String, PriceReport>,
    pub reconcile: Option<ReconcileReport>,
    pub translation: Vec<JobReport>,
    pub output: OutputReport,
    pub rows_written: usize,
    pub output_file: PathBuf,
}

impl PipelineResult {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            rows_read: BTreeMap::new(),
            codes: BTreeMap::new(),
            prices: BTreeMap::new(),
            reconcile: None,
            translation: Vec::new(),
            output: OutputReport::default(),
            rows_written: 0,
            output_file: PathBuf::new(),
        }
    }

    pub fn rows_removed_for_codes(&self) -> usize {
        self.codes
            .values()
            .map(|r| r.missing_removed + r.duplicates_removed)
            .sum()
    }

    pub fn prices_converted(&self) -> usize {
        self.prices.values().map(|r| r.converted).sum()
    }

    pub fn prices_unconverted(&self) -> usize {
        self.prices.values().map(|r| r.rows - r.converted - r.empty).sum()
    }
}

/// A merged table plus the counts gathered while building it.
#[derive(Debug, Clone)]
pub struct Merged {
    pub table: Table,
    pub result: PipelineResult,
}

/// Sequences normalize → reconcile → translate → output for one config.
pub struct Pipeline {
    config: PipelineConfig,
    retry_failed: bool,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            retry_failed: false,
            interrupt: None,
        }
    }

    /// Re-attempt values whose previous translation failed.
    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full run with the translator and cache store described by the config.
    pub async fn run(&self) -> Result<PipelineResult> {
        if !self.config.translation.enabled {
            return self.run_with(None).await;
        }
        let translator = infra::build_translator(&self.config.translation.backend)?;
        let store = infra::build_cache_store(&self.config.translation.cache)?;
        self.run_with(Some((translator, store))).await
    }

    /// Full run with an explicit translation backend. Nothing is written
    /// unless every stage succeeds.
    #[instrument(skip(self, translation), fields(output = %self.config.output.path.display()))]
    pub async fn run_with(
        &self,
        translation: Option<(Box<dyn Translator>, Arc<dyn CacheStore>)>,
    ) -> Result<PipelineResult> {
        let clock = Instant::now();
        let sources = self.load_sources()?;
        self.validate_run_columns(&sources, true, translation.is_some())?;

        let Merged { mut table, mut result } = self.merge(sources, true)?;

        if let Some((translator, store)) = translation {
            let mut engine = self.engine(translator, store);
            result.translation = self.translate(&mut engine, &mut table).await?;
        }

        result.output = shape_output(&mut table, &self.config.output)?;
        infra::write_table(&table, &self.config.output.path)?;
        result.rows_written = table.len();
        result.output_file = self.config.output.path.clone();
        result.finished_at = Utc::now();

        crate::metrics::run::finished(clock.elapsed().as_secs_f64());
        info!(
            run_id = %result.run_id,
            "Pipeline finished: {} rows written to {}",
            result.rows_written,
            result.output_file.display()
        );
        Ok(result)
    }

    /// Reads every configured source. A missing file aborts before any work.
    pub fn load_sources(&self) -> Result<Vec<SourceTable>> {
        self.config
            .sources
            .iter()
            .map(|source| -> Result<SourceTable> {
                let table = infra::read_table(&source.path)?;
                info!(source = %source.id, rows = table.len(), "loaded {}", source.path.display());
                let st = SourceTable::new(&source.id, table);
                Ok(match &source.locale {
                    Some(locale) => st.with_locale(locale),
                    None => st,
                })
            })
            .collect()
    }

    /// Checks every column the enabled stages touch before anything runs.
    /// The key must be in every source; stage columns in at least one.
    pub fn validate_run_columns(
        &self,
        sources: &[SourceTable],
        with_prices: bool,
        translating: bool,
    ) -> Result<()> {
        let key = self.config.columns.key.as_str();
        for source in sources {
            source.table.require_columns(&source.id, &[key])?;
        }

        let union: BTreeSet<&str> = sources
            .iter()
            .flat_map(|s| s.table.columns().iter().map(String::as_str))
            .collect();
        let mut stage_columns: Vec<&str> = Vec::new();
        if self.config.codes.enabled {
            stage_columns.push(&self.config.codes.column);
        }
        if with_prices && self.config.price.enabled {
            stage_columns.push(&self.config.price.column);
        }
        if translating {
            stage_columns.extend(self.config.translation.jobs.iter().map(|j| j.field.as_str()));
        }
        match stage_columns.into_iter().find(|c| !union.contains(c)) {
            Some(missing) => Err(CatalogError::MissingColumn {
                source_id: "all sources".to_string(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn currencies(&self) -> Result<CurrencyTable> {
        CurrencyTable::from_pairs(
            self.config
                .price
                .markers
                .iter()
                .map(|m| (m.marker.as_str(), m.rate)),
        )
    }

    /// Normalizes each source, then reconciles them. Price conversion is
    /// skipped when `with_prices` is false.
    pub fn merge(&self, sources: Vec<SourceTable>, with_prices: bool) -> Result<Merged> {
        let mut result = PipelineResult::start();
        let currencies = if with_prices && self.config.price.enabled {
            Some(self.currencies()?)
        } else {
            None
        };

        let mut normalized = Vec::with_capacity(sources.len());
        for mut source in sources {
            result.rows_read.insert(source.id.clone(), source.table.len());
            let codes = &self.config.codes;
            if codes.enabled && source.table.has_column(&codes.column) {
                // Duplicates are resolved inside each export in file order
                let policy = CodePolicy {
                    drop_missing: codes.drop_missing,
                    dedupe: codes.dedupe,
                };
                let report = clean_code_column(&mut source.table, &codes.column, policy);
                result.codes.insert(source.id.clone(), report);
            }
            if let Some(currencies) = &currencies {
                let price = &self.config.price;
                if source.table.has_column(&price.column) {
                    let report = convert_price_column(
                        &mut source.table,
                        &price.column,
                        &price.output_column,
                        currencies,
                    );
                    result.prices.insert(source.id.clone(), report);
                } else {
                    warn!(source = %source.id, "no '{}' column; prices left empty", price.column);
                }
            }
            normalized.push(source);
        }

        let mut options = ReconcileOptions::new(&self.config.columns.key);
        if let Some(provenance) = self.config.columns.provenance_column() {
            options = options.with_provenance(provenance);
        }
        let reconciled = reconcile(normalized, &self.config.ranked_sources(), &options)?;
        result.reconcile = Some(reconciled.report);

        Ok(Merged {
            table: reconciled.table,
            result,
        })
    }

    /// Merge stage only: normalized codes and reconciled rows, no prices or
    /// translations. Output shaping is not applied.
    pub fn run_merge(&self, output: &Path) -> Result<PipelineResult> {
        let sources = self.load_sources()?;
        self.validate_run_columns(&sources, false, false)?;
        let Merged { table, mut result } = self.merge(sources, false)?;
        infra::write_table(&table, output)?;
        result.rows_written = table.len();
        result.output_file = output.to_path_buf();
        result.finished_at = Utc::now();
        Ok(result)
    }

    /// Translation stage only, over an already merged table file.
    pub async fn run_translate(
        &self,
        translator: Box<dyn Translator>,
        store: Arc<dyn CacheStore>,
        input: &Path,
        output: &Path,
    ) -> Result<PipelineResult> {
        let mut table = infra::read_table(input)?;
        let mut result = PipelineResult::start();
        result.rows_read.insert(input.display().to_string(), table.len());
        let mut engine = self.engine(translator, store);
        result.translation = self.translate(&mut engine, &mut table).await?;
        infra::write_table(&table, output)?;
        result.rows_written = table.len();
        result.output_file = output.to_path_buf();
        result.finished_at = Utc::now();
        Ok(result)
    }

    pub fn engine(&self, translator: Box<dyn Translator>, store: Arc<dyn CacheStore>) -> TranslationEngine {
        let engine = TranslationEngine::new(translator, store, self.engine_settings())
            .with_retry_failed(self.retry_failed);
        match &self.interrupt {
            Some(flag) => engine.with_interrupt(flag.clone()),
            None => engine,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let t = &self.config.translation;
        EngineSettings {
            retry: RetryPolicy {
                max_attempts: t.retry.max_attempts,
                base_delay: Duration::from_millis(t.retry.base_delay_ms),
                backoff: t.retry.backoff,
                jitter: Duration::from_millis(t.retry.jitter_ms),
            },
            pacing: PacingPolicy {
                min_interval: Duration::from_millis(t.pacing.min_delay_ms),
                block_size: t.pacing.block_size,
                block_pause: Duration::from_millis(t.pacing.block_pause_ms),
                requests_per_min: t.pacing.requests_per_min,
            },
            checkpoint_every: t.checkpoint_every,
            progress_every: constants::PROGRESS_EVERY,
        }
    }

    /// Runs every configured translation job over the table in order.
    pub async fn translate(&self, engine: &mut TranslationEngine, table: &mut Table) -> Result<Vec<JobReport>> {
        let t = &self.config.translation;
        let routing = LanguageRouting::from_config(&self.config)?;
        let jobs = t
            .jobs
            .iter()
            .map(TranslationJob::from_config)
            .collect::<Result<Vec<_>>>()?;
        for job in &jobs {
            table.require_columns("translation", &[job.field.as_str()])?;
        }

        let mut reports = Vec::with_capacity(jobs.len());
        for job in &jobs {
            info!(
                "Translating '{}' -> '{}' ({}) with {}",
                job.field,
                job.output_column,
                t.target_lang,
                engine.translator_name()
            );
            reports.push(run_job(engine, table, job, &routing, &t.target_lang).await?);
        }
        Ok(reports)
    }
}

/// Single-stage helper: converts the price column of an existing table file.
pub fn convert_prices_in_file(config: &PipelineConfig, input: &Path, output: &Path) -> Result<PriceReport> {
    let pipeline = Pipeline::new(config.clone());
    let currencies = pipeline.currencies()?;
    let mut table = infra::read_table(input)?;
    table.require_columns(&input.display().to_string(), &[config.price.column.as_str()])?;
    let report = convert_price_column(
        &mut table,
        &config.price.column,
        &config.price.output_column,
        &currencies,
    );
    infra::write_table(&table, output)?;
    Ok(report)
}
