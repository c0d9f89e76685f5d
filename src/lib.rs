pub mod config;
pub mod constants;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod rate_limiter;
pub mod types;

// Layered boundaries: trait seams and their adapters
pub mod app;
pub mod infra;

pub use error::{CatalogError, Result};
