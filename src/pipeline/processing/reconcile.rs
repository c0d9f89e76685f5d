use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::types::{Record, Table};

/// One input table and its provenance.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub id: String,
    pub table: Table,
    /// Tag written into the provenance column for rows that lack one
    pub locale: Option<String>,
}

impl SourceTable {
    pub fn new(id: impl Into<String>, table: Table) -> Self {
        Self {
            id: id.into(),
            table,
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub key_column: String,
    pub provenance_column: Option<String>,
}

impl ReconcileOptions {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            provenance_column: None,
        }
    }

    pub fn with_provenance(mut self, column: impl Into<String>) -> Self {
        self.provenance_column = Some(column.into());
        self
    }
}

/// Counts surfaced to the operator after a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows whose key was null, empty or whitespace
    pub empty_keys_dropped: usize,
    /// Repeated keys inside one source, per source id
    pub duplicates_within_source: BTreeMap<String, usize>,
    /// Rows discarded because a higher-precedence source had the key
    pub shadowed_by_precedence: usize,
    /// Winning rows per source id
    pub contributed: BTreeMap<String, usize>,
}

impl ReconcileReport {
    pub fn total_duplicates(&self) -> usize {
        self.duplicates_within_source.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub table: Table,
    pub report: ReconcileReport,
}

/// Merges the sources into one table with a unique key per row.
///
/// For every key the row comes from the highest-ranked source holding it;
/// inside a source the first row wins. The output schema is the union of the
/// input schemas in first-seen order and rows are sorted by key.
pub fn reconcile(
    sources: Vec<SourceTable>,
    precedence: &[String],
    options: &ReconcileOptions,
) -> Result<Reconciled> {
    let key_column = options.key_column.as_str();
    let ranks = rank_sources(&sources, precedence)?;
    for source in &sources {
        source.table.require_columns(&source.id, &[key_column])?;
    }

    let mut columns: Vec<String> = Vec::new();
    for source in &sources {
        for column in source.table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }
    if let Some(provenance) = &options.provenance_column {
        if !columns.contains(provenance) {
            columns.push(provenance.clone());
        }
    }

    let mut ordered = sources;
    ordered.sort_by_key(|s| ranks[s.id.as_str()]);

    let mut report = ReconcileReport::default();
    let mut chosen: BTreeMap<String, Record> = BTreeMap::new();

    for source in ordered {
        let SourceTable { id, table, locale } = source;
        info!(source = %id, rows = table.len(), "reconciling source");
        report.rows_in += table.len();
        let mut seen_here: HashSet<String> = HashSet::new();

        for mut record in table.into_rows() {
            let Some(key) = record.get_trimmed(key_column).map(str::to_string) else {
                report.empty_keys_dropped += 1;
                continue;
            };
            if !seen_here.insert(key.clone()) {
                *report.duplicates_within_source.entry(id.clone()).or_default() += 1;
                continue;
            }
            if chosen.contains_key(&key) {
                report.shadowed_by_precedence += 1;
                continue;
            }

            record.set(key_column, Some(key.clone()));
            if let Some(provenance) = &options.provenance_column {
                tag_provenance(&mut record, provenance, locale.as_deref());
            }
            *report.contributed.entry(id.clone()).or_default() += 1;
            chosen.insert(key, record);
        }
    }

    report.rows_out = chosen.len();
    if report.empty_keys_dropped > 0 {
        warn!("Dropped {} rows with an empty '{}'", report.empty_keys_dropped, key_column);
    }
    if report.total_duplicates() > 0 {
        warn!(
            "Collapsed {} duplicate keys inside sources: {:?}",
            report.total_duplicates(),
            report.duplicates_within_source
        );
    }
    debug!(?report, "reconcile finished");
    info!(
        "Reconciled {} rows into {} unique keys ({} shadowed by precedence)",
        report.rows_in, report.rows_out, report.shadowed_by_precedence
    );
    crate::metrics::reconcile::finished(&report);

    Ok(Reconciled {
        table: Table::with_rows(columns, chosen.into_values().collect()),
        report,
    })
}

/// Maps each source id to its position in the precedence list.
fn rank_sources(sources: &[SourceTable], precedence: &[String]) -> Result<HashMap<String, usize>> {
    let mut ranks = HashMap::new();
    for source in sources {
        let rank = precedence
            .iter()
            .position(|p| p == &source.id)
            .ok_or_else(|| CatalogError::UnrankedSource(source.id.clone()))?;
        if ranks.insert(source.id.clone(), rank).is_some() {
            return Err(CatalogError::DuplicateSource(source.id.clone()));
        }
    }
    Ok(ranks)
}

/// Lower-cases an existing provenance tag or fills it from the source.
fn tag_provenance(record: &mut Record, column: &str, locale: Option<&str>) {
    let tag = record
        .get_trimmed(column)
        .or(locale)
        .map(|t| t.trim().to_lowercase());
    record.set(column, tag);
}
