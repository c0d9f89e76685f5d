use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{CatalogError, Result};

/// Top-level pipeline configuration, read from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    /// Source ids from highest to lowest precedence. Empty means `[[sources]]` order.
    #[serde(default)]
    pub precedence: Vec<String>,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub codes: CodeConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    pub output: OutputConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub path: PathBuf,
    /// Provenance tag written into the provenance column (e.g. "com", "de")
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_key_column")]
    pub key: String,
    /// Empty string disables provenance tagging.
    #[serde(default = "default_provenance_column")]
    pub provenance: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            key: default_key_column(),
            provenance: default_provenance_column(),
        }
    }
}

impl ColumnConfig {
    pub fn provenance_column(&self) -> Option<&str> {
        let trimmed = self.provenance.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_code_column")]
    pub column: String,
    #[serde(default = "default_true")]
    pub drop_missing: bool,
    #[serde(default = "default_true")]
    pub dedupe: bool,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            column: default_code_column(),
            drop_missing: true,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_price_column")]
    pub column: String,
    #[serde(default = "default_price_output_column")]
    pub output_column: String,
    /// Checked in order; the first marker found in a raw price wins.
    #[serde(default = "default_markers")]
    pub markers: Vec<MarkerConfig>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            column: default_price_column(),
            output_column: default_price_output_column(),
            markers: default_markers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub marker: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
    /// Provenance tag → source language
    #[serde(default = "default_locales")]
    pub locales: BTreeMap<String, String>,
    /// Language used when no provenance column is configured
    #[serde(default)]
    pub default_source_lang: Option<String>,
    #[serde(default = "default_jobs")]
    pub jobs: Vec<JobConfig>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: default_target_lang(),
            backend: BackendConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            checkpoint_every: default_checkpoint_every(),
            locales: default_locales(),
            default_source_lang: None,
            jobs: default_jobs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// LibreTranslate-compatible HTTP endpoint
    Online {
        #[serde(default = "default_endpoint")]
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Local model CLI reading the text on stdin
    Offline {
        #[serde(default = "default_offline_command")]
        command: String,
        #[serde(default = "default_offline_args")]
        args: Vec<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Online {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub kind: CacheKind,
    /// Directory for JSON snapshots, database file for SQLite
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::Json,
            path: default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Linear,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            backoff: BackoffKind::default(),
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_pacing_block_size")]
    pub block_size: u64,
    #[serde(default = "default_pacing_block_pause_ms")]
    pub block_pause_ms: u64,
    #[serde(default)]
    pub requests_per_min: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_pacing_delay_ms(),
            block_size: default_pacing_block_size(),
            block_pause_ms: default_pacing_block_pause_ms(),
            requests_per_min: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub field: String,
    pub output_column: String,
    #[serde(default)]
    pub pre_clean: Option<String>,
    #[serde(default)]
    pub post_clean: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Non-empty means only these columns are written, in this order.
    #[serde(default)]
    pub keep_columns: Vec<String>,
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Rows missing any of these columns are removed before writing.
    #[serde(default)]
    pub require_complete: Vec<String>,
}

impl PipelineConfig {
    /// Read, parse, apply environment overrides and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Environment variables (optionally from `.env`) win over the file.
    pub fn apply_env_overrides(&mut self) {
        let _ = dotenv::dotenv();
        match &mut self.translation.backend {
            BackendConfig::Online {
                endpoint, api_key, ..
            } => {
                if let Ok(url) = std::env::var("CATALOG_TRANSLATE_URL") {
                    if !url.trim().is_empty() {
                        *endpoint = url;
                    }
                }
                if let Ok(key) = std::env::var("CATALOG_TRANSLATE_API_KEY") {
                    if !key.trim().is_empty() {
                        *api_key = Some(key);
                    }
                }
            }
            BackendConfig::Offline { command, .. } => {
                if let Ok(cmd) = std::env::var("CATALOG_OFFLINE_COMMAND") {
                    if !cmd.trim().is_empty() {
                        *command = cmd;
                    }
                }
            }
        }
    }

    /// Source ids ranked from highest to lowest precedence.
    pub fn ranked_sources(&self) -> Vec<String> {
        if self.precedence.is_empty() {
            self.sources.iter().map(|s| s.id.clone()).collect()
        } else {
            self.precedence.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(CatalogError::Config("at least one [[sources]] entry is required".into()));
        }
        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(CatalogError::Config("source id must not be empty".into()));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(CatalogError::DuplicateSource(source.id.clone()));
            }
        }
        for id in &self.precedence {
            if !ids.contains(id.as_str()) {
                return Err(CatalogError::Config(format!(
                    "precedence names unknown source '{id}'"
                )));
            }
        }
        for source in &self.sources {
            if !self.precedence.is_empty() && !self.precedence.contains(&source.id) {
                return Err(CatalogError::UnrankedSource(source.id.clone()));
            }
        }
        if self.columns.key.trim().is_empty() {
            return Err(CatalogError::Config("key column must not be empty".into()));
        }
        if self.price.enabled {
            if self.price.markers.is_empty() {
                return Err(CatalogError::Config("price conversion needs at least one marker".into()));
            }
            for m in &self.price.markers {
                if m.marker.is_empty() || !m.rate.is_finite() || m.rate <= 0.0 {
                    return Err(CatalogError::Config(format!(
                        "invalid currency marker '{}' with rate {}",
                        m.marker, m.rate
                    )));
                }
            }
        }
        let t = &self.translation;
        if t.enabled {
            if t.retry.max_attempts == 0 {
                return Err(CatalogError::Config("retry.max_attempts must be at least 1".into()));
            }
            if t.checkpoint_every == 0 {
                return Err(CatalogError::Config("checkpoint_every must be at least 1".into()));
            }
            if self.columns.provenance_column().is_none() && t.default_source_lang.is_none() {
                return Err(CatalogError::Config(
                    "translation without a provenance column needs default_source_lang".into(),
                ));
            }
            for job in &t.jobs {
                for name in job.pre_clean.iter().chain(job.post_clean.iter()) {
                    if crate::pipeline::processing::translate::cleaners::lookup(name).is_none() {
                        return Err(CatalogError::Config(format!("unknown cleaner '{name}'")));
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_key_column() -> String {
    constants::KEY_COLUMN.to_string()
}

fn default_provenance_column() -> String {
    constants::PROVENANCE_COLUMN.to_string()
}

fn default_code_column() -> String {
    constants::CODE_COLUMN.to_string()
}

fn default_price_column() -> String {
    constants::PRICE_COLUMN.to_string()
}

fn default_price_output_column() -> String {
    constants::PRICE_OUTPUT_COLUMN.to_string()
}

fn default_markers() -> Vec<MarkerConfig> {
    vec![
        MarkerConfig {
            marker: constants::USD_MARKER.to_string(),
            rate: constants::USD_TO_TRY,
        },
        MarkerConfig {
            marker: constants::EUR_MARKER.to_string(),
            rate: constants::EUR_TO_TRY,
        },
    ]
}

fn default_target_lang() -> String {
    constants::TARGET_LANG.to_string()
}

fn default_checkpoint_every() -> usize {
    constants::CHECKPOINT_EVERY
}

fn default_locales() -> BTreeMap<String, String> {
    constants::default_locale_languages()
        .into_iter()
        .map(|(locale, lang)| (locale.to_string(), lang.to_string()))
        .collect()
}

fn default_jobs() -> Vec<JobConfig> {
    vec![
        JobConfig {
            field: constants::TITLE_COLUMN.to_string(),
            output_column: constants::TITLE_OUTPUT_COLUMN.to_string(),
            pre_clean: Some("strip_qualifiers".to_string()),
            post_clean: Some("strip_translated_qualifiers".to_string()),
        },
        JobConfig {
            field: constants::CATEGORY_COLUMN.to_string(),
            output_column: constants::CATEGORY_OUTPUT_COLUMN.to_string(),
            pre_clean: None,
            post_clean: None,
        },
    ]
}

fn default_endpoint() -> String {
    "http://localhost:5000/translate".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_offline_command() -> String {
    "argos-translate".to_string()
}

fn default_offline_args() -> Vec<String> {
    vec![
        "--from-lang".to_string(),
        "{source}".to_string(),
        "--to-lang".to_string(),
        "{target}".to_string(),
    ]
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("translation_cache")
}

fn default_max_attempts() -> u32 {
    constants::MAX_TRANSLATE_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    constants::RETRY_BASE_DELAY_MS
}

fn default_pacing_delay_ms() -> u64 {
    constants::PACING_DELAY_MS
}

fn default_pacing_block_size() -> u64 {
    constants::PACING_BLOCK_SIZE
}

fn default_pacing_block_pause_ms() -> u64 {
    constants::PACING_BLOCK_PAUSE_MS
}
