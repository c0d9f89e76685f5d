//! Field normalization: pure transforms from raw export encodings to
//! canonical scalar values, plus the column-level passes built on them.

pub mod codes;
pub mod price;

pub use codes::{clean_code_column, normalize_multi_code, CodeCleanReport, CodePolicy};
pub use price::{
    classify_price, convert_price_column, normalize_price, CurrencyMarker, CurrencyTable,
    PriceOutcome, PriceReport,
};
