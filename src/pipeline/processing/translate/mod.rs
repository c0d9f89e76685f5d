pub mod cache;
pub mod cleaners;
pub mod engine;
pub mod jobs;

pub use cache::{CacheNamespace, TranslationCache};
pub use cleaners::TextCleaners;
pub use engine::{
    apply_translations, distinct_values, translate_table_column, ApplyReport, ColumnTranslation,
    EngineSettings, RetryPolicy, TranslationEngine, TranslationReport,
};
pub use jobs::{run_job, JobReport, LanguageRouting, TranslationJob};

/// Terminal result for one distinct value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Success(String),
    /// Attempts exhausted or the value cleaned down to nothing; carries the last reason
    Failure(String),
}

impl TranslationOutcome {
    pub fn translation(&self) -> Option<&str> {
        match self {
            TranslationOutcome::Success(text) => Some(text),
            TranslationOutcome::Failure(_) => None,
        }
    }
}
