// src/geography.rs

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{
    error::{CensusError, Result},
    table::RegionTable,
};

pub const STATE: &str = "state";
pub const COUNTY: &str = "county";
/// Duplicates `NAME` for zip requests; never kept.
pub const ZCTA: &str = "zip code tabulation area";

/// Identifier columns the API adds on its own, in output order.
pub const EXTRA_COLUMNS: [&str; 2] = [STATE, COUNTY];

/// `state`/`county` values per region, taken from the first batch only.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographyExtraColumns {
    pub table: RegionTable,
}

impl GeographyExtraColumns {
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    /// Check a later batch's identifiers against these. Regions the first
    /// batch never saw are only logged.
    pub fn verify(&self, batch_index: usize, other: &RegionTable) -> Result<()> {
        let rows: HashMap<&str, usize> = self
            .table
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        for column in &self.table.columns {
            let (Some(mine), Some(theirs)) = (
                self.table.column_index(column),
                other.column_index(column),
            ) else {
                continue;
            };
            for (r, region) in other.names.iter().enumerate() {
                let Some(&row) = rows.get(region.as_str()) else {
                    warn!(batch_index, %region, "region absent from first batch; its {} is not captured", column);
                    continue;
                };
                let expected = &self.table.cells[row][mine];
                let found = &other.cells[r][theirs];
                if expected != found {
                    return Err(CensusError::GeographyMismatch {
                        batch_index,
                        region: region.clone(),
                        column: column.clone(),
                        expected: expected.clone(),
                        found: found.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Strip incidental geography columns from a response so it can be merged.
///
/// The zip tabulation column is always discarded. `state`/`county` are
/// removed too, and returned as a side table when present.
pub fn split_extras(table: &mut RegionTable) -> Option<GeographyExtraColumns> {
    if table.drop_column(ZCTA).is_some() {
        debug!("dropped '{}' column", ZCTA);
    }

    let present: Vec<&str> = EXTRA_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();
    if present.is_empty() {
        return None;
    }

    let extras = table.select(&present);
    for c in &present {
        table.drop_column(c);
    }
    Some(GeographyExtraColumns { table: extras })
}

/// `"ZCTA5 501"` becomes `"00501"`.
pub fn normalize_zip(name: &str) -> String {
    let digits = name.replace("ZCTA5 ", "");
    format!("{:0>5}", digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::table::parse_json_table;

    #[test]
    fn zip_prefix_is_stripped_and_padded() {
        assert_eq!(normalize_zip("ZCTA5 501"), "00501");
        assert_eq!(normalize_zip("ZCTA5 90210"), "90210");
        assert_eq!(normalize_zip("02134"), "02134");
    }

    #[test]
    fn zcta_column_is_dropped_not_captured() {
        let mut t = parse_json_table(
            r#"[["NAME","X","zip code tabulation area"],["ZCTA5 00501","1","00501"]]"#,
        )
        .unwrap();
        assert!(split_extras(&mut t).is_none());
        assert_eq!(t.columns, vec!["X"]);
    }

    #[test]
    fn county_extras_are_split_in_state_county_order() {
        let mut t = parse_json_table(
            r#"[["NAME","X","county","state"],
                ["Autauga County, Alabama","1","001","01"],
                ["Baldwin County, Alabama","2","003","01"]]"#,
        )
        .unwrap();
        let extras = split_extras(&mut t).unwrap();
        assert_eq!(t.columns, vec!["X"]);
        assert_eq!(extras.columns(), ["state", "county"]);
        assert_eq!(
            extras.table.get("Baldwin County, Alabama", "county"),
            Some(&Some("003".into()))
        );
    }

    #[test]
    fn verify_flags_disagreement() {
        init_test_logging();
        let first = GeographyExtraColumns {
            table: parse_json_table(r#"[["NAME","state"],["Utah","49"],["Ohio","39"]]"#).unwrap(),
        };
        let same = parse_json_table(r#"[["NAME","state"],["Ohio","39"],["Iowa","19"]]"#).unwrap();
        assert!(first.verify(1, &same).is_ok());

        let differs = parse_json_table(r#"[["NAME","state"],["Utah","50"]]"#).unwrap();
        match first.verify(2, &differs) {
            Err(CensusError::GeographyMismatch {
                batch_index,
                region,
                expected,
                found,
                ..
            }) => {
                assert_eq!(batch_index, 2);
                assert_eq!(region, "Utah");
                assert_eq!(expected.as_deref(), Some("49"));
                assert_eq!(found.as_deref(), Some("50"));
            }
            other => panic!("expected GeographyMismatch, got {:?}", other),
        }
    }
}
