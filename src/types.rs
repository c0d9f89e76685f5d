use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{CatalogError, Result};

/// One catalog row. Absent and empty cells are both stored as "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.set(k, Some(v.into()));
        }
        record
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn get_trimmed(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match value {
            Some(v) if !v.is_empty() => {
                self.values.insert(column, v);
            }
            _ => {
                self.values.remove(&column);
            }
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// An ordered sequence of records sharing one column list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        let mut table = Self::default();
        for column in columns {
            table.ensure_column(&column);
        }
        table
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut table = Self::new(columns);
        table.rows = rows;
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Appends the column to the schema if it is not there yet.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps rows for which `keep` returns true and returns how many were removed.
    pub fn retain_rows<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(keep);
        before - self.rows.len()
    }

    /// Fails on the first column in `required` the table does not carry.
    pub fn require_columns(&self, source_id: &str, required: &[&str]) -> Result<()> {
        match required.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(CatalogError::MissingColumn {
                source_id: source_id.to_string(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Narrows the schema to `keep`, in that order. Unknown names are a configuration error.
    pub fn retain_columns(&mut self, source_id: &str, keep: &[String]) -> Result<()> {
        let required: Vec<&str> = keep.iter().map(String::as_str).collect();
        self.require_columns(source_id, &required)?;
        let keep_set: HashSet<&str> = required.iter().copied().collect();
        for row in &mut self.rows {
            let extra: Vec<String> = row
                .columns()
                .filter(|c| !keep_set.contains(c))
                .map(str::to_string)
                .collect();
            for column in extra {
                row.remove(&column);
            }
        }
        self.columns = keep.to_vec();
        Ok(())
    }

    /// Drops the named columns and returns the names that were not present.
    pub fn drop_columns(&mut self, drop: &[String]) -> Vec<String> {
        let mut missing = Vec::new();
        for column in drop {
            if !self.has_column(column) {
                missing.push(column.clone());
                continue;
            }
            self.columns.retain(|c| c != column);
            for row in &mut self.rows {
                row.remove(column);
            }
        }
        missing
    }
}
