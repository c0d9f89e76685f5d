//! Translation jobs routed by row provenance.
//!
//! Each row's source language comes from its provenance tag. Rows are grouped
//! by language so every (field, language, target) pair keeps its own cache.

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::cleaners::{self, TextCleaners};
use super::engine::{apply_translations, ApplyReport, TranslationEngine, TranslationReport};
use crate::config::{JobConfig, PipelineConfig};
use crate::error::{CatalogError, Result};
use crate::types::{Record, Table};

/// One text column to translate into an output column.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub field: String,
    pub output_column: String,
    pub cleaners: TextCleaners,
}

impl TranslationJob {
    pub fn new(field: impl Into<String>, output_column: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            output_column: output_column.into(),
            cleaners: TextCleaners::none(),
        }
    }

    pub fn with_cleaners(mut self, cleaners: TextCleaners) -> Self {
        self.cleaners = cleaners;
        self
    }

    pub fn from_config(job: &JobConfig) -> Result<Self> {
        let resolve = |name: &Option<String>| -> Result<_> {
            match name {
                None => Ok(None),
                Some(n) => cleaners::lookup(n)
                    .map(Some)
                    .ok_or_else(|| CatalogError::Config(format!("unknown cleaner '{n}'"))),
            }
        };
        Ok(Self::new(&job.field, &job.output_column).with_cleaners(TextCleaners {
            pre: resolve(&job.pre_clean)?,
            post: resolve(&job.post_clean)?,
        }))
    }
}

/// How a row's source language is decided.
#[derive(Debug, Clone)]
pub enum LanguageRouting {
    /// Read the tag in `column` and map it through `locales` (tag → language)
    ByProvenance {
        column: String,
        locales: BTreeMap<String, String>,
    },
    /// Every row is in this language
    Fixed(String),
}

impl LanguageRouting {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let t = &config.translation;
        match (config.columns.provenance_column(), &t.default_source_lang) {
            (Some(column), _) => Ok(LanguageRouting::ByProvenance {
                column: column.to_string(),
                locales: t
                    .locales
                    .iter()
                    .map(|(tag, lang)| (tag.to_lowercase(), lang.clone()))
                    .collect(),
            }),
            (None, Some(lang)) => Ok(LanguageRouting::Fixed(lang.clone())),
            (None, None) => Err(CatalogError::Config(
                "translation needs a provenance column or default_source_lang".into(),
            )),
        }
    }

    /// Language of `row`, `None` when its tag is missing or unmapped.
    pub fn language_of<'a>(&'a self, row: &Record) -> Option<&'a str> {
        match self {
            LanguageRouting::Fixed(lang) => Some(lang.as_str()),
            LanguageRouting::ByProvenance { column, locales } => row
                .get_trimmed(column)
                .and_then(|tag| locales.get(&tag.to_lowercase()))
                .map(String::as_str),
        }
    }

    /// Distinct languages this routing can produce, sorted.
    fn languages(&self) -> Vec<String> {
        match self {
            LanguageRouting::Fixed(lang) => vec![lang.clone()],
            LanguageRouting::ByProvenance { locales, .. } => {
                let mut langs: Vec<String> = locales.values().cloned().collect();
                langs.sort();
                langs.dedup();
                langs
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub field: String,
    /// Per source language
    pub namespaces: BTreeMap<String, TranslationReport>,
    pub applied: ApplyReport,
    /// Rows whose provenance did not map to a language; their output is null
    pub unrouted_rows: usize,
}

impl JobReport {
    pub fn translated(&self) -> usize {
        self.namespaces.values().map(|r| r.translated).sum()
    }

    pub fn failed(&self) -> usize {
        self.namespaces.values().map(|r| r.failed).sum()
    }

    pub fn calls(&self) -> usize {
        self.namespaces.values().map(|r| r.calls).sum()
    }
}

/// Runs one job over the table: translate each language group, then fill the
/// output column. The source column is left untouched.
pub async fn run_job(
    engine: &mut TranslationEngine,
    table: &mut Table,
    job: &TranslationJob,
    routing: &LanguageRouting,
    target_lang: &str,
) -> Result<JobReport> {
    table.require_columns("translation", &[job.field.as_str()])?;
    if let LanguageRouting::ByProvenance { column, .. } = routing {
        table.require_columns("translation", &[column.as_str()])?;
    }
    table.ensure_column(&job.output_column);

    let mut report = JobReport {
        field: job.field.clone(),
        ..JobReport::default()
    };

    for row in table.rows_mut() {
        if routing.language_of(row).is_none() {
            row.set(&job.output_column, None);
            report.unrouted_rows += 1;
        }
    }
    if report.unrouted_rows > 0 {
        warn!(
            "[{}] {} rows have no source language and stay untranslated",
            job.field, report.unrouted_rows
        );
    }

    for lang in routing.languages() {
        let in_group = |row: &Record| routing.language_of(row) == Some(lang.as_str());
        let result = engine
            .translate_column(table, &job.field, &lang, target_lang, &job.cleaners, in_group)
            .await?;
        let applied =
            apply_translations(table, &job.field, &job.output_column, &result.cache, in_group);
        report.applied.merge(&applied);
        report.namespaces.insert(lang, result.report);
    }

    info!(
        "[{}] -> '{}': {} rows filled, {} untranslated, {} blank",
        job.field,
        job.output_column,
        report.applied.filled,
        report.applied.untranslated,
        report.applied.blank_source
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> LanguageRouting {
        LanguageRouting::ByProvenance {
            column: "Locale".to_string(),
            locales: [("com", "en"), ("de", "de"), ("co.uk", "en")]
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_language_of_uses_lowercased_tag() {
        let routing = provenance();
        assert_eq!(
            routing.language_of(&Record::from_pairs([("Locale", " DE ")])),
            Some("de")
        );
        assert_eq!(routing.language_of(&Record::from_pairs([("Locale", "fr")])), None);
        assert_eq!(routing.language_of(&Record::new()), None);
    }

    #[test]
    fn test_languages_are_deduplicated() {
        assert_eq!(provenance().languages(), vec!["de", "en"]);
        assert_eq!(LanguageRouting::Fixed("en".into()).languages(), vec!["en"]);
    }

    #[test]
    fn test_job_from_config_resolves_cleaners() {
        let job = TranslationJob::from_config(&JobConfig {
            field: "Title".into(),
            output_column: "Turkish Title".into(),
            pre_clean: Some("strip_qualifiers".into()),
            post_clean: None,
        })
        .unwrap();
        assert_eq!(job.cleaners.pre_clean("Renewed Kit"), "Kit");
        assert!(job.cleaners.post.is_none());
    }
}
