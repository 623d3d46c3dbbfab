// src/table.rs

use serde_json::Value;
use std::collections::HashSet;

use crate::error::{CensusError, FetchError, Result};

/// Name of the key column every response carries.
pub const NAME: &str = "NAME";

/// Rows keyed by region name with untyped (string) cells.
///
/// `NAME` is kept apart from the data columns so that every row is
/// guaranteed to have a key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionTable {
    /// Data column names, excluding `NAME`.
    pub columns: Vec<String>,
    /// Region name per row.
    pub names: Vec<String>,
    /// Row-major cells; `cells[r].len() == columns.len()`.
    pub cells: Vec<Vec<Option<String>>>,
}

impl RegionTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            names: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.names.len()
    }

    pub fn push_row(&mut self, name: String, row: Vec<Option<String>>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.names.push(name);
        self.cells.push(row);
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Cell lookup by region and column.
    pub fn get(&self, name: &str, column: &str) -> Option<&Option<String>> {
        let c = self.column_index(column)?;
        let r = self.names.iter().position(|n| n == name)?;
        Some(&self.cells[r][c])
    }

    /// Remove `column`, returning its values in row order.
    pub fn drop_column(&mut self, column: &str) -> Option<Vec<Option<String>>> {
        let idx = self.column_index(column)?;
        self.columns.remove(idx);
        Some(self.cells.iter_mut().map(|row| row.remove(idx)).collect())
    }

    /// New table with the same regions and only `columns`, in that order.
    /// Columns not present are skipped.
    pub fn select(&self, columns: &[&str]) -> RegionTable {
        let picked: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|i| (i, *c)))
            .collect();
        RegionTable {
            columns: picked.iter().map(|(_, c)| c.to_string()).collect(),
            names: self.names.clone(),
            cells: self
                .cells
                .iter()
                .map(|row| picked.iter().map(|(i, _)| row[*i].clone()).collect())
                .collect(),
        }
    }

    /// Move an existing column to position `to` among the data columns.
    pub fn move_column(&mut self, column: &str, to: usize) -> bool {
        let Some(from) = self.column_index(column) else {
            return false;
        };
        let to = to.min(self.columns.len() - 1);
        let name = self.columns.remove(from);
        self.columns.insert(to, name);
        for row in &mut self.cells {
            let v = row.remove(from);
            row.insert(to, v);
        }
        true
    }

    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.column_index(from) {
            Some(i) => {
                self.columns[i] = to.into();
                true
            }
            None => false,
        }
    }

    /// Rewrite every region name.
    pub fn map_names(&mut self, f: impl Fn(&str) -> String) {
        for n in &mut self.names {
            *n = f(n);
        }
    }

    /// Reject tables that list a region twice; the outer join assumes unique keys.
    pub fn ensure_unique_names(&self, batch_index: usize) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.names.len());
        for n in &self.names {
            if !seen.insert(n.as_str()) {
                return Err(CensusError::DuplicateRegion {
                    batch_index,
                    region: n.clone(),
                });
            }
        }
        Ok(())
    }
}

fn cell_to_string(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Decode an API body: a JSON array of rows whose first row is the header.
pub fn parse_json_table(body: &str) -> std::result::Result<RegionTable, FetchError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    let mut rows = rows.into_iter();

    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| FetchError::Malformed("empty response, no header row".into()))?
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            other => Err(FetchError::Malformed(format!(
                "header cell {} is not a string",
                other
            ))),
        })
        .collect::<std::result::Result<_, _>>()?;

    let name_idx = header
        .iter()
        .position(|h| h == NAME)
        .ok_or_else(|| FetchError::Malformed(format!("no {} column in header", NAME)))?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_idx)
        .map(|(_, h)| h.clone())
        .collect();
    let mut table = RegionTable::new(columns);

    for (r, row) in rows.enumerate() {
        if row.len() != header.len() {
            return Err(FetchError::Malformed(format!(
                "row {} has {} cells, header has {}",
                r + 1,
                row.len(),
                header.len()
            )));
        }
        let mut name = None;
        let mut values = Vec::with_capacity(header.len() - 1);
        for (i, v) in row.into_iter().enumerate() {
            if i == name_idx {
                name = cell_to_string(v);
            } else {
                values.push(cell_to_string(v));
            }
        }
        let name =
            name.ok_or_else(|| FetchError::Malformed(format!("row {} has no {}", r + 1, NAME)))?;
        table.push_row(name, values);
    }

    Ok(table)
}
