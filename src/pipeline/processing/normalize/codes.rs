use std::collections::HashSet;
use tracing::{debug, info};

use crate::types::Table;

/// Reduces a possibly multi-valued code cell ("A, B, C") to its first code.
///
/// Blank input and a blank first token both yield `None`. The code format
/// itself is not validated.
pub fn normalize_multi_code(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let first = raw.split(',').next().unwrap_or_default().trim();
    (!first.is_empty()).then(|| first.to_string())
}

#[derive(Debug, Clone, Copy)]
pub struct CodePolicy {
    /// Remove rows whose code is blank after normalization
    pub drop_missing: bool,
    /// Remove later rows repeating an already seen code
    pub dedupe: bool,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            drop_missing: true,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeCleanReport {
    pub rows_in: usize,
    pub multi_value_collapsed: usize,
    pub missing_removed: usize,
    pub duplicates_removed: usize,
}

/// Normalizes every code in `column` in place, then applies the row policy.
pub fn clean_code_column(table: &mut Table, column: &str, policy: CodePolicy) -> CodeCleanReport {
    let mut report = CodeCleanReport {
        rows_in: table.len(),
        ..Default::default()
    };

    for row in table.rows_mut() {
        let raw = row.get(column).map(str::to_string);
        if raw.as_deref().is_some_and(|r| r.contains(',')) {
            report.multi_value_collapsed += 1;
        }
        row.set(column, normalize_multi_code(raw.as_deref()));
    }

    if policy.drop_missing {
        report.missing_removed = table.retain_rows(|row| row.get(column).is_some());
    }

    if policy.dedupe {
        let mut seen = HashSet::new();
        report.duplicates_removed = table.retain_rows(|row| match row.get(column) {
            Some(code) => seen.insert(code.to_string()),
            None => true,
        });
    }

    debug!(?report, column, "code column cleaned");
    info!(
        "Codes in '{}': {} collapsed, {} blank removed, {} duplicates removed",
        column, report.multi_value_collapsed, report.missing_removed, report.duplicates_removed
    );
    crate::metrics::normalize::codes_cleaned(&report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    #[test]
    fn test_normalize_multi_code() {
        assert_eq!(normalize_multi_code(None), None);
        assert_eq!(normalize_multi_code(Some("")), None);
        assert_eq!(normalize_multi_code(Some("   ")), None);
        assert_eq!(normalize_multi_code(Some("A,B,C")), Some("A".to_string()));
        assert_eq!(normalize_multi_code(Some("  X  ")), Some("X".to_string()));
        assert_eq!(
            normalize_multi_code(Some(" 5702017413, 5702017414")),
            Some("5702017413".to_string())
        );
        assert_eq!(normalize_multi_code(Some(",B")), None);
    }

    fn ean_table(codes: &[Option<&str>]) -> Table {
        let rows = codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let mut record = Record::from_pairs([("ASIN", format!("B{i}"))]);
                record.set("EAN", code.map(str::to_string));
                record
            })
            .collect();
        Table::with_rows(vec!["ASIN".into(), "EAN".into()], rows)
    }

    #[test]
    fn test_clean_code_column_drops_blank_and_duplicate_codes() {
        let mut table = ean_table(&[
            Some("111,222"),
            None,
            Some("  "),
            Some("111"),
            Some("333"),
            Some(",444"),
        ]);
        let report = clean_code_column(&mut table, "EAN", CodePolicy::default());

        assert_eq!(report.rows_in, 6);
        assert_eq!(report.multi_value_collapsed, 2);
        assert_eq!(report.missing_removed, 3);
        assert_eq!(report.duplicates_removed, 1);

        let kept: Vec<_> = table.rows().iter().map(|r| r.get("ASIN").unwrap()).collect();
        assert_eq!(kept, vec!["B0", "B4"]);
        assert_eq!(table.rows()[0].get("EAN"), Some("111"));
    }

    #[test]
    fn test_clean_code_column_can_keep_everything() {
        let mut table = ean_table(&[Some("1"), None, Some("1")]);
        let report = clean_code_column(
            &mut table,
            "EAN",
            CodePolicy {
                drop_missing: false,
                dedupe: false,
            },
        );
        assert_eq!(table.len(), 3);
        assert_eq!(report.missing_removed, 0);
        assert_eq!(report.duplicates_removed, 0);
    }
}
