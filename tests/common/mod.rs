// tests/common/mod.rs

#![allow(dead_code)]

use census_batch::{CannedTransport, FieldDescriptor};
use serde_json::{json, Value};

pub const BASE: &str = "https://api.census.gov/data";

pub fn codes(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{}{:02}", prefix, i)).collect()
}

pub fn fields(codes: &[String]) -> Vec<FieldDescriptor> {
    codes
        .iter()
        .map(|c| FieldDescriptor::new(c.clone(), format!("Estimate!!{}", c), "CONCEPT", "G"))
        .collect()
}

pub fn data_url(year: u16, path: &str, codes: &[String], filter: &str, key: &str) -> String {
    format!(
        "{}/{}{}?get=NAME,{}&{}&key={}",
        BASE,
        year,
        path,
        codes.join(","),
        filter,
        key
    )
}

/// Build a JSON body: header row, then one row per region. `value` is asked
/// for every (region, code) cell; `extras` are appended verbatim.
pub fn body(
    codes: &[String],
    regions: &[&str],
    extra_headers: &[&str],
    value: impl Fn(&str, &str) -> Value,
    extras: impl Fn(&str) -> Vec<Value>,
) -> String {
    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut header = vec![json!("NAME")];
    header.extend(codes.iter().map(|c| json!(c)));
    header.extend(extra_headers.iter().map(|h| json!(h)));
    rows.push(header);
    for r in regions {
        let mut row = vec![json!(r)];
        row.extend(codes.iter().map(|c| value(r, c)));
        row.extend(extras(r));
        rows.push(row);
    }
    serde_json::to_string(&rows).expect("rows serialize")
}

pub fn transport() -> CannedTransport {
    CannedTransport::new()
}
