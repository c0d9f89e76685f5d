// Pipeline processing: field normalization, reconciliation, translation and output filters

pub mod filters;
pub mod normalize;
pub mod reconcile;
pub mod translate;
