//! Column and marker defaults mirroring the marketplace export format.
//! Every value here can be overridden from the pipeline config.

// Source columns as they appear in the exports
pub const KEY_COLUMN: &str = "ASIN";
pub const PROVENANCE_COLUMN: &str = "Locale";
pub const CODE_COLUMN: &str = "Product Codes: EAN";
pub const PRICE_COLUMN: &str = "List Price: Current";
pub const TITLE_COLUMN: &str = "Title";
pub const CATEGORY_COLUMN: &str = "Categories: Tree";

// Derived columns added by the pipeline
pub const PRICE_OUTPUT_COLUMN: &str = "TL Price";
pub const TITLE_OUTPUT_COLUMN: &str = "Turkish Title";
pub const CATEGORY_OUTPUT_COLUMN: &str = "Turkish Category Tree";

// Currency markers suffixed to raw prices
pub const USD_MARKER: &str = "-409";
pub const EUR_MARKER: &str = "-C0A";
pub const USD_TO_TRY: f64 = 43.6;
pub const EUR_TO_TRY: f64 = 50.6;

// Locale tags and the languages they are written in
pub const LOCALE_COM: &str = "com";
pub const LOCALE_DE: &str = "de";
pub const TARGET_LANG: &str = "tr";

// Translation batch policy
pub const MAX_TRANSLATE_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const PACING_DELAY_MS: u64 = 200;
pub const PACING_BLOCK_SIZE: u64 = 50;
pub const PACING_BLOCK_PAUSE_MS: u64 = 2_000;
pub const CHECKPOINT_EVERY: usize = 100;
pub const PROGRESS_EVERY: usize = 25;

/// Default locale → source language routing
pub fn default_locale_languages() -> Vec<(&'static str, &'static str)> {
    vec![(LOCALE_COM, "en"), (LOCALE_DE, "de")]
}
