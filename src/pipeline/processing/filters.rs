//! Final row and column selection before the merged table is written.

use tracing::{info, warn};

use crate::config::OutputConfig;
use crate::error::Result;
use crate::types::Table;

/// Removes rows with no value in any of `required`. Returns the number removed.
pub fn filter_complete_rows(table: &mut Table, required: &[String]) -> Result<usize> {
    if required.is_empty() {
        return Ok(0);
    }
    let columns: Vec<&str> = required.iter().map(String::as_str).collect();
    table.require_columns("output", &columns)?;
    let removed = table.retain_rows(|row| columns.iter().all(|c| row.get_trimmed(c).is_some()));
    if removed > 0 {
        info!("removed {} incomplete rows ({} remain)", removed, table.len());
    }
    Ok(removed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputReport {
    pub incomplete_removed: usize,
    pub columns_dropped: usize,
}

/// Applies the output section: complete-row filter, dropped columns, then the
/// keep list (which also fixes column order).
pub fn shape_output(table: &mut Table, output: &OutputConfig) -> Result<OutputReport> {
    let incomplete_removed = filter_complete_rows(table, &output.require_complete)?;

    let missing = table.drop_columns(&output.drop_columns);
    for column in &missing {
        warn!("drop_columns names '{}' which the table does not have", column);
    }

    if !output.keep_columns.is_empty() {
        table.retain_columns("output", &output.keep_columns)?;
    }

    Ok(OutputReport {
        incomplete_removed,
        columns_dropped: output.drop_columns.len() - missing.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::types::Record;
    use std::path::PathBuf;

    fn table() -> Table {
        Table::with_rows(
            vec!["ASIN".into(), "TL Price".into(), "Turkish Title".into(), "Image".into()],
            vec![
                Record::from_pairs([("ASIN", "A"), ("TL Price", "10.00"), ("Turkish Title", "Set")]),
                Record::from_pairs([("ASIN", "B"), ("Turkish Title", "Kit")]),
                Record::from_pairs([("ASIN", "C"), ("TL Price", "5.00"), ("Turkish Title", "  ")]),
            ],
        )
    }

    #[test]
    fn test_filter_complete_rows() {
        let mut t = table();
        let removed =
            filter_complete_rows(&mut t, &["TL Price".to_string(), "Turkish Title".to_string()]).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(t.rows()[0].get("ASIN"), Some("A"));
    }

    #[test]
    fn test_filter_on_unknown_column_fails() {
        let mut t = table();
        let err = filter_complete_rows(&mut t, &["Reviews".to_string()]).unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn { .. }));
    }

    #[test]
    fn test_shape_output() {
        let mut t = table();
        let output = OutputConfig {
            path: PathBuf::from("out.csv"),
            keep_columns: vec!["Turkish Title".into(), "ASIN".into()],
            drop_columns: vec!["Image".into(), "Nope".into()],
            require_complete: vec!["TL Price".into()],
        };
        let report = shape_output(&mut t, &output).unwrap();
        assert_eq!(
            report,
            OutputReport {
                incomplete_removed: 1,
                columns_dropped: 1
            }
        );
        assert_eq!(t.columns(), &["Turkish Title".to_string(), "ASIN".to_string()]);
        assert_eq!(t.len(), 2);
    }
}
