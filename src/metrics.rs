//! Pipeline counters, grouped by stage.
//!
//! Emitted through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so library users only pay for what they wire up.

/// Registers descriptions for every metric the pipeline emits.
pub fn describe_metrics() {
    ::metrics::describe_counter!("catalog_codes_rows_total", "Rows seen by the code cleaner");
    ::metrics::describe_counter!(
        "catalog_codes_removed_total",
        "Rows removed for missing or duplicate codes"
    );
    ::metrics::describe_counter!("catalog_prices_converted_total", "Prices converted to the target currency");
    ::metrics::describe_counter!("catalog_prices_unconverted_total", "Prices left null");
    ::metrics::describe_counter!("catalog_reconcile_rows_total", "Rows written by reconciliation");
    ::metrics::describe_counter!(
        "catalog_reconcile_duplicates_total",
        "Rows discarded as duplicates or shadowed by precedence"
    );
    ::metrics::describe_counter!("catalog_translate_calls_total", "Calls made to the translation backend");
    ::metrics::describe_counter!("catalog_translate_success_total", "Values translated");
    ::metrics::describe_counter!("catalog_translate_failure_total", "Values that exhausted their attempts");
    ::metrics::describe_counter!("catalog_translate_reused_total", "Values served from a cache snapshot");
    ::metrics::describe_counter!("catalog_translate_checkpoints_total", "Cache snapshots written");
    ::metrics::describe_histogram!("catalog_run_duration_seconds", "Wall time of a pipeline run");
}

pub mod normalize {
    use crate::pipeline::processing::normalize::{CodeCleanReport, PriceReport};

    pub fn codes_cleaned(report: &CodeCleanReport) {
        ::metrics::counter!("catalog_codes_rows_total").increment(report.rows_in as u64);
        ::metrics::counter!("catalog_codes_removed_total")
            .increment((report.missing_removed + report.duplicates_removed) as u64);
    }

    pub fn prices_converted(report: &PriceReport) {
        ::metrics::counter!("catalog_prices_converted_total").increment(report.converted as u64);
        ::metrics::counter!("catalog_prices_unconverted_total")
            .increment((report.rows - report.converted) as u64);
    }
}

pub mod reconcile {
    use crate::pipeline::processing::reconcile::ReconcileReport;

    pub fn finished(report: &ReconcileReport) {
        ::metrics::counter!("catalog_reconcile_rows_total").increment(report.rows_out as u64);
        ::metrics::counter!("catalog_reconcile_duplicates_total")
            .increment((report.total_duplicates() + report.shadowed_by_precedence) as u64);
    }
}

pub mod translate {
    use crate::pipeline::processing::translate::TranslationReport;

    pub fn column_finished(report: &TranslationReport) {
        ::metrics::counter!("catalog_translate_calls_total").increment(report.calls as u64);
        ::metrics::counter!("catalog_translate_success_total").increment(report.translated as u64);
        ::metrics::counter!("catalog_translate_failure_total").increment(report.failed as u64);
        ::metrics::counter!("catalog_translate_reused_total").increment(report.already_cached as u64);
    }

    pub fn checkpoint_written() {
        ::metrics::counter!("catalog_translate_checkpoints_total").increment(1);
    }
}

pub mod run {
    pub fn finished(duration_secs: f64) {
        ::metrics::histogram!("catalog_run_duration_seconds").record(duration_secs);
    }
}
