// src/process.rs

use futures::StreamExt;
use std::{collections::HashMap, pin::pin};
use tracing::{info, instrument};

use crate::{
    batch::{fetch_all, validate_fields, Query},
    catalog::FieldDescriptor,
    config::FetchConfig,
    error::{CensusError, Result},
    fetch::Transport,
    frame::{coerce, Column, ColumnData, DataTable},
    geography::normalize_zip,
    merge::{MergeEngine, MergedTable},
    source::Geography,
    table::RegionTable,
};

pub const YEAR: &str = "Year";

/// Put the merged data columns in requested order and name them by
/// description.
///
/// Names are looked up by code from the response header, so a response that
/// reorders its columns is still labelled correctly. A header code nobody
/// asked for, or a requested code the API never returned, is an error.
pub fn rename_columns(merged: &MergedTable, fields: &[FieldDescriptor]) -> Result<RegionTable> {
    let descriptions: HashMap<&str, &str> = fields
        .iter()
        .map(|f| (f.code.as_str(), f.description.as_str()))
        .collect();

    if let Some(unknown) = merged
        .table
        .columns
        .iter()
        .filter(|c| !merged.extra_columns.contains(*c))
        .find(|c| !descriptions.contains_key(c.as_str()))
    {
        return Err(CensusError::UnknownField(unknown.clone()));
    }
    if let Some(missing) = fields.iter().find(|f| !merged.table.has_column(&f.code)) {
        return Err(CensusError::MissingField(missing.code.clone()));
    }

    let order: Vec<&str> = merged
        .extra_columns
        .iter()
        .map(String::as_str)
        .chain(fields.iter().map(|f| f.code.as_str()))
        .collect();
    let mut table = merged.table.select(&order);
    let width = merged.extra_columns.len();
    for (i, f) in fields.iter().enumerate() {
        table.columns[width + i] = descriptions[f.code.as_str()].to_string();
    }
    Ok(table)
}

/// Rename, add `Year`, fix zip names and type the merged table.
///
/// Output layout: `NAME`, `Year`, any of `state`/`county`, then one column
/// per requested field.
pub fn post_process(
    merged: MergedTable,
    fields: &[FieldDescriptor],
    year: u16,
    geography: Geography,
) -> Result<DataTable> {
    let mut table = rename_columns(&merged, fields)?;

    if geography == Geography::Zip {
        table.map_names(normalize_zip);
    }

    let height = table.height();
    let mut out = coerce(table, &merged.extra_columns)?;
    out.insert(
        1,
        Column {
            name: YEAR.to_string(),
            data: ColumnData::Int(vec![Some(i64::from(year)); height]),
        },
    );
    Ok(out)
}

/// Fetch `fields` for every region of the query's geography and assemble one
/// table. Any failed batch aborts the whole retrieval.
#[instrument(level = "info", skip(transport, cfg, fields, query), fields(fields = fields.len(), year = query.year, source = ?query.source))]
pub async fn retrieve<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    fields: &[FieldDescriptor],
    query: &Query,
) -> Result<DataTable> {
    validate_fields(fields)?;

    let mut engine = MergeEngine::new(cfg.verify_geography);
    let mut batches = pin!(fetch_all(transport, cfg, fields, query));
    while let Some(raw) = batches.next().await {
        engine.push(raw?)?;
    }

    let merged = engine.finish()?;
    let out = post_process(merged, fields, query.year, query.source.geography)?;
    info!(rows = out.height(), columns = out.width(), "retrieval complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::{batch::RawBatchTable, table::parse_json_table};

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("B02", "Estimate!!Total:", "SECOND", "B"),
            FieldDescriptor::new("A01", "Estimate!!Total:", "FIRST", "A"),
        ]
    }

    fn merged(json: &str) -> MergedTable {
        let mut engine = MergeEngine::new(false);
        engine
            .push(RawBatchTable {
                index: 0,
                table: parse_json_table(json).unwrap(),
            })
            .unwrap();
        engine.finish().unwrap()
    }

    #[test]
    fn renames_by_code_in_requested_order() {
        init_test_logging();
        // response lists A01 before B02; request order is B02, A01
        let m = merged(r#"[["NAME","A01","B02"],["Utah","1","2"]]"#);
        let t = rename_columns(&m, &fields()).unwrap();
        assert_eq!(
            t.columns,
            vec!["SECOND Estimate!!Total:", "FIRST Estimate!!Total:"]
        );
        assert_eq!(t.cells[0], vec![Some("2".into()), Some("1".into())]);
    }

    #[test]
    fn unexpected_and_missing_codes_fail_loudly() {
        init_test_logging();
        let m = merged(r#"[["NAME","A01","B02","C03"],["Utah","1","2","3"]]"#);
        assert!(matches!(
            rename_columns(&m, &fields()),
            Err(CensusError::UnknownField(c)) if c == "C03"
        ));

        let m = merged(r#"[["NAME","A01"],["Utah","1"]]"#);
        assert!(matches!(
            rename_columns(&m, &fields()),
            Err(CensusError::MissingField(c)) if c == "B02"
        ));
    }

    #[test]
    fn layout_is_name_year_geography_fields() {
        init_test_logging();
        let m = merged(r#"[["NAME","B02","A01","state"],["Utah","2","1","49"]]"#);
        let out = post_process(m, &fields(), 2019, Geography::State).unwrap();
        assert_eq!(
            out.column_names(),
            vec![
                "NAME",
                "Year",
                "state",
                "SECOND Estimate!!Total:",
                "FIRST Estimate!!Total:"
            ]
        );
        assert_eq!(out.float("Utah", YEAR), Some(2019.0));
        assert_eq!(out.text("Utah", "state"), Some("49"));
        assert_eq!(out.float("Utah", "FIRST Estimate!!Total:"), Some(1.0));
    }

    #[test]
    fn zip_names_are_normalized() {
        init_test_logging();
        let m = merged(r#"[["NAME","A01","B02"],["ZCTA5 501","1","2"],["ZCTA5 90210","3","4"]]"#);
        let out = post_process(m, &fields(), 2019, Geography::Zip).unwrap();
        assert_eq!(out.names(), vec!["00501", "90210"]);
    }
}
