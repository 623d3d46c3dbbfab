// src/timeseries.rs

use futures::{stream, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use crate::{
    batch::{fetch_batch, Query, RawBatchTable, RequestBatch},
    config::FetchConfig,
    error::{CensusError, Result},
    fetch::Transport,
    frame::{coerce, Column, ColumnData, DataTable},
    geography::{normalize_zip, split_extras},
    merge::MergeEngine,
    source::{Credential, Geography, Source},
};

/// Column holding `field_name` for `year`.
pub fn value_column(field_name: &str, year: u16) -> String {
    format!("{}_{}", field_name, year)
}

/// Last four characters of a value column, i.e. its year.
fn year_token(column: &str) -> String {
    let chars: Vec<char> = column.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

/// Name of the change column between two value columns.
pub fn change_column(from: &str, to: &str) -> String {
    format!("{}_to_{}_chg", year_token(from), year_token(to))
}

/// `(later / earlier) - 1`; null when either side is missing.
pub fn pct_change(earlier: Option<f64>, later: Option<f64>) -> Option<f64> {
    match (earlier, later) {
        (Some(a), Some(b)) => Some(b / a - 1.0),
        _ => None,
    }
}

fn floats<'a>(table: &'a DataTable, column: &str) -> &'a [Option<f64>] {
    match table.column(column).map(|c| &c.data) {
        Some(ColumnData::Float(v)) => v,
        _ => &[],
    }
}

/// Append one change column per adjacent pair of `value_columns`, plus a
/// first-to-last column when three or more are present.
pub fn add_change_columns(table: &mut DataTable, value_columns: &[String]) {
    let mut pairs: Vec<(&String, &String)> = value_columns
        .windows(2)
        .map(|w| (&w[0], &w[1]))
        .collect();
    if value_columns.len() >= 3 {
        pairs.push((&value_columns[0], &value_columns[value_columns.len() - 1]));
    }

    let snapshot = &*table;
    let computed: Vec<Column> = pairs
        .into_iter()
        .map(|(from, to)| {
            let values = floats(snapshot, from)
                .iter()
                .zip(floats(snapshot, to))
                .map(|(a, b)| pct_change(*a, *b))
                .collect();
            Column::float(change_column(from, to), values)
        })
        .collect();
    for c in computed {
        debug!(column = %c.name, "added change column");
        table.push(c);
    }
}

/// Fetch one field for one year, value column already renamed.
async fn fetch_field_year<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    field: &str,
    field_name: &str,
    index: usize,
    query: Query,
) -> Result<RawBatchTable> {
    let batch = RequestBatch {
        index,
        codes: vec![field.to_string()],
    };
    let mut raw = fetch_batch(transport, cfg, &query, batch).await?;
    if !raw.table.rename_column(field, value_column(field_name, query.year)) {
        return Err(CensusError::MissingField(field.to_string()));
    }
    Ok(raw)
}

fn validate_years(years: &[u16]) -> Result<()> {
    if years.is_empty() {
        return Err(CensusError::EmptyRequest("no years requested"));
    }
    let mut seen = HashSet::new();
    for &y in years {
        if !seen.insert(y) {
            return Err(CensusError::DuplicateYear(y));
        }
    }
    Ok(())
}

/// Fetch `field` for every year in `years` and compute percent changes.
///
/// Output layout: `NAME`, any of `state`/`county` (from the first year's
/// response), one `<field_name>_<year>` column per year, then the change
/// columns. A single year yields no change columns.
#[instrument(level = "info", skip(transport, cfg, credential))]
pub async fn compare_across_years<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    field: &str,
    field_name: &str,
    source: Source,
    years: &[u16],
    credential: &Credential,
) -> Result<DataTable> {
    validate_years(years)?;

    let mut results = stream::iter(years.iter().enumerate())
        .map(|(index, &year)| {
            let query = Query::new(year, source, credential.clone());
            fetch_field_year(transport, cfg, field, field_name, index, query)
        })
        .buffered(cfg.concurrency.max(1));

    let mut engine = MergeEngine::new(cfg.verify_geography);
    while let Some(raw) = results.next().await {
        engine.push(raw?)?;
    }
    let merged = engine.finish()?;

    let mut table = merged.table;
    if source.geography == Geography::Zip {
        table.map_names(normalize_zip);
    }
    let mut out = coerce(table, &merged.extra_columns)?;

    let value_columns: Vec<String> = years
        .iter()
        .map(|&y| value_column(field_name, y))
        .collect();
    add_change_columns(&mut out, &value_columns);

    info!(
        rows = out.height(),
        years = years.len(),
        columns = out.width(),
        "comparison complete"
    );
    Ok(out)
}

/// Fetch a single field for one year as `NAME` plus `<column_name>_<year>`.
/// Geography identifier columns are not kept.
#[instrument(level = "info", skip(transport, cfg, query), fields(year = query.year, source = ?query.source))]
pub async fn fetch_single_field<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    field: &str,
    column_name: &str,
    query: &Query,
) -> Result<DataTable> {
    let raw = fetch_field_year(transport, cfg, field, column_name, 0, query.clone()).await?;
    let mut table = raw.table;
    table.ensure_unique_names(raw.index)?;
    split_extras(&mut table);

    if query.source.geography == Geography::Zip {
        table.map_names(normalize_zip);
    }
    coerce(table, &[])
}
