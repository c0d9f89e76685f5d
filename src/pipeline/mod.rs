// Catalog pipeline: per-stage processing and the orchestrator that sequences it

pub mod orchestrator;
pub mod processing;

pub use orchestrator::{convert_prices_in_file, Merged, Pipeline, PipelineResult};
