use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::types::{Record, Table};

const BOM: &str = "\u{feff}";

/// Reads a headered CSV export. A leading byte-order mark is ignored and
/// empty cells are treated as missing values.
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(CatalogError::MissingFile(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut table = Table::new(headers.clone());
    for row in reader.records() {
        let row = row?;
        let record = headers
            .iter()
            .zip(row.iter())
            .fold(Record::new(), |mut record, (column, value)| {
                record.set(column.as_str(), Some(value.to_string()));
                record
            });
        table.push(record);
    }
    debug!("read {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Writes the table as UTF-8 CSV with a byte-order mark, so spreadsheet tools
/// detect the encoding. The file is replaced atomically.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(BOM.as_bytes())?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(table.columns().iter().map(|c| row.get(c).unwrap_or("")))?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CatalogError::Io(e.error))?;
    debug!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::MissingFile(_)));
    }

    #[test]
    fn test_bom_is_written_and_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("merged.csv");
        let table = Table::with_rows(
            vec!["ASIN".into(), "Title".into(), "Brand".into()],
            vec![Record::from_pairs([("ASIN", "B01"), ("Title", "Set, \"large\"")])],
        );
        write_table(&table, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM.as_bytes()));

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.rows()[0].get("ASIN"), Some("B01"));
        assert_eq!(back.rows()[0].get("Title"), Some("Set, \"large\""));
        assert_eq!(back.rows()[0].get("Brand"), None);
    }
}
