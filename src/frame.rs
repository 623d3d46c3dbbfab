// src/frame.rs

use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::{
    error::{CensusError, Result},
    table::{RegionTable, NAME},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnData::Text(_) => DataType::Utf8,
            ColumnData::Int(_) => DataType::Int64,
            ColumnData::Float(_) => DataType::Float64,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnData::Text(v) => Arc::new(v.iter().map(|s| s.as_deref()).collect::<StringArray>()),
            ColumnData::Int(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnData::Float(v) => Arc::new(Float64Array::from(v.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Float(values),
        }
    }
}

/// Final typed table: `NAME` first, then columns in output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    pub columns: Vec<Column>,
}

impl DataTable {
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Region names.
    pub fn names(&self) -> Vec<&str> {
        match self.column(NAME).map(|c| &c.data) {
            Some(ColumnData::Text(v)) => v.iter().map(|s| s.as_deref().unwrap_or("")).collect(),
            _ => Vec::new(),
        }
    }

    pub fn row_of(&self, region: &str) -> Option<usize> {
        self.names().iter().position(|n| *n == region)
    }

    /// Float cell by region and column.
    pub fn float(&self, region: &str, column: &str) -> Option<f64> {
        let row = self.row_of(region)?;
        match &self.column(column)?.data {
            ColumnData::Float(v) => v[row],
            ColumnData::Int(v) => v[row].map(|i| i as f64),
            ColumnData::Text(_) => None,
        }
    }

    pub fn text(&self, region: &str, column: &str) -> Option<&str> {
        let row = self.row_of(region)?;
        match &self.column(column)?.data {
            ColumnData::Text(v) => v[row].as_deref(),
            _ => None,
        }
    }

    pub fn insert(&mut self, index: usize, column: Column) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
    }

    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Convert to an Arrow record batch for analysis or export.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(&c.name, c.data.data_type(), c.name != NAME))
                .collect::<Vec<_>>(),
        );
        let arrays = self.columns.iter().map(|c| c.data.to_array()).collect();
        Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
    }
}

/// Parse a cell as a number. Missing and blank cells are null.
fn parse_number(
    column: &str,
    region: &str,
    cell: &Option<String>,
) -> Result<Option<f64>> {
    let Some(raw) = cell else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| CensusError::NonNumericValue {
            column: column.to_string(),
            region: region.to_string(),
            value: raw.clone(),
        })
}

/// Type a merged string table: `NAME` and the columns in `text_columns` stay
/// text, everything else must parse as a number.
pub fn coerce(table: RegionTable, text_columns: &[String]) -> Result<DataTable> {
    let RegionTable {
        columns,
        names,
        cells,
    } = table;

    let mut out = DataTable::default();
    for (c, name) in columns.iter().enumerate() {
        let values = cells.iter().map(|row| &row[c]);
        let column = if text_columns.contains(name) {
            Column::text(name.clone(), values.cloned().collect())
        } else {
            let parsed = values
                .zip(&names)
                .map(|(cell, region)| parse_number(name, region, cell))
                .collect::<Result<Vec<_>>>()?;
            Column::float(name.clone(), parsed)
        };
        out.push(column);
    }
    out.insert(0, Column::text(NAME, names.into_iter().map(Some).collect()));
    Ok(out)
}
