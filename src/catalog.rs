// src/catalog.rs

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use crate::{
    config::FetchConfig,
    error::{CensusError, FetchError, Result},
    fetch::{urls::catalog_url, Transport},
    source::Dataset,
};

/// One requestable field as listed on the dataset's variables page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub code: String,
    pub label: String,
    pub concept: String,
    pub group: String,
    /// `concept + " " + label`; becomes the output column name.
    pub description: String,
}

impl FieldDescriptor {
    pub fn new(
        code: impl Into<String>,
        label: impl Into<String>,
        concept: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let concept = concept.into();
        Self {
            code: code.into(),
            description: format!("{} {}", concept, label),
            label,
            concept,
            group: group.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub concept: String,
    pub group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Sorted by code.
    pub fields: Vec<FieldDescriptor>,
    /// Distinct (concept, group) pairs in first-seen order.
    pub groups: Vec<GroupEntry>,
}

impl Catalog {
    pub fn find(&self, code: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.code == code)
    }

    /// Fields belonging to one table group, in code order.
    pub fn in_group(&self, group: &str) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.group == group)
            .cloned()
            .collect()
    }
}

const REQUIRED_HEADERS: [&str; 4] = ["Name", "Label", "Concept", "Group"];

fn clean_text(raw: String) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the first HTML table of a variables page into a catalog.
///
/// `label_filter` is a plain substring test on the label; an empty filter
/// keeps every row.
pub fn parse_catalog_html(
    html: &str,
    label_filter: &str,
) -> std::result::Result<Catalog, FetchError> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("table selector should parse");
    let row_sel = Selector::parse("tr").expect("row selector should parse");
    let cell_sel = Selector::parse("th, td").expect("cell selector should parse");

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| FetchError::Malformed("no <table> in listing".into()))?;

    let mut rows = table.select(&row_sel).map(|tr| {
        tr.select(&cell_sel)
            .map(|cell| clean_text(cell.text().collect::<String>()))
            .collect::<Vec<String>>()
    });

    let header = rows
        .by_ref()
        .find(|r| !r.is_empty())
        .ok_or_else(|| FetchError::Malformed("listing table has no rows".into()))?;

    let mut idx = [0usize; 4];
    for (slot, want) in idx.iter_mut().zip(REQUIRED_HEADERS) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(want))
            .ok_or_else(|| {
                FetchError::Malformed(format!("listing table has no '{}' column", want))
            })?;
    }
    let [name_i, label_i, concept_i, group_i] = idx;
    let widest = idx.iter().copied().max().unwrap_or(0);

    let mut fields: Vec<FieldDescriptor> = rows
        .filter(|r| r.len() > widest)
        .filter(|r| r[name_i] != header[name_i])
        .filter(|r| r[label_i].contains(label_filter))
        .map(|r| {
            FieldDescriptor::new(
                r[name_i].clone(),
                r[label_i].clone(),
                r[concept_i].clone(),
                r[group_i].clone(),
            )
        })
        .collect();
    fields.sort_by(|a, b| a.code.cmp(&b.code));

    let mut seen = HashSet::new();
    let groups = fields
        .iter()
        .filter(|f| seen.insert((f.concept.clone(), f.group.clone())))
        .map(|f| GroupEntry {
            concept: f.concept.clone(),
            group: f.group.clone(),
        })
        .collect();

    Ok(Catalog { fields, groups })
}

/// Download and parse the field listing for `dataset` in `year`.
#[instrument(level = "info", skip(transport, cfg))]
pub async fn fetch_catalog<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    year: u16,
    dataset: Dataset,
    label_filter: &str,
) -> Result<Catalog> {
    let url = catalog_url(&cfg.base_url, year, dataset)?;
    info!(%url, "retrieving field catalog");

    let unavailable = |source| CensusError::CatalogUnavailable {
        url: url.to_string(),
        source,
    };
    let html = transport.get_text(&url).await.map_err(unavailable)?;
    let catalog = parse_catalog_html(&html, label_filter).map_err(unavailable)?;

    debug!(
        fields = catalog.fields.len(),
        groups = catalog.groups.len(),
        "parsed catalog"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::fetch::CannedTransport;

    const LISTING: &str = r##"
<html><body>
<table>
  <thead>
    <tr><th>Name</th><th>Label</th><th>Concept</th><th>Required</th><th>Group</th></tr>
  </thead>
  <tbody>
    <tr><td><a name="B01002_001E">B01002_001E</a></td><td>Estimate!!Median age --!!Total:</td>
        <td>MEDIAN AGE BY SEX</td><td>not required</td><td><a href="#">B01002</a></td></tr>
    <tr><td>B01001_001E</td><td>Estimate!!Total:</td><td>SEX BY AGE</td><td></td><td>B01001</td></tr>
    <tr><td>B01001_002E</td><td>Estimate!!Total:!!Male:</td><td>SEX BY AGE</td><td></td><td>B01001</td></tr>
    <tr><td>for</td><td>Census API FIPS 'for' clause</td><td>Census API Geography Specification</td><td></td><td>N/A</td></tr>
    <tr><td colspan="5">6 variables</td></tr>
  </tbody>
</table>
</body></html>"##;

    #[test]
    fn parses_sorts_and_describes() {
        init_test_logging();
        let cat = parse_catalog_html(LISTING, "").unwrap();
        let codes: Vec<&str> = cat.fields.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["B01001_001E", "B01001_002E", "B01002_001E", "for"]);
        assert_eq!(
            cat.find("B01001_002E").unwrap().description,
            "SEX BY AGE Estimate!!Total:!!Male:"
        );
        assert_eq!(cat.find("B01002_001E").unwrap().group, "B01002");
    }

    #[test]
    fn filter_is_a_substring_not_a_pattern() {
        let cat = parse_catalog_html(LISTING, "Estimate").unwrap();
        assert_eq!(cat.fields.len(), 3);
        assert!(cat.find("for").is_none());

        let cat = parse_catalog_html(LISTING, "Total:!!").unwrap();
        assert_eq!(cat.fields.len(), 1);

        // regex metacharacters match literally
        let cat = parse_catalog_html(LISTING, "Estimate.*").unwrap();
        assert!(cat.fields.is_empty());
    }

    #[test]
    fn groups_are_deduplicated_in_first_seen_order() {
        let cat = parse_catalog_html(LISTING, "Estimate").unwrap();
        assert_eq!(
            cat.groups,
            vec![
                GroupEntry {
                    concept: "SEX BY AGE".into(),
                    group: "B01001".into()
                },
                GroupEntry {
                    concept: "MEDIAN AGE BY SEX".into(),
                    group: "B01002".into()
                },
            ]
        );
        assert_eq!(cat.in_group("B01001").len(), 2);
    }

    #[test]
    fn pages_without_a_listing_are_rejected() {
        assert!(parse_catalog_html("<html><p>maintenance</p></html>", "").is_err());
        assert!(parse_catalog_html(
            "<table><tr><th>Name</th><th>Label</th></tr></table>",
            ""
        )
        .is_err());
    }

    #[tokio::test]
    async fn fetch_maps_failures_to_catalog_unavailable() -> anyhow::Result<()> {
        init_test_logging();
        let cfg = FetchConfig::default();
        let t = CannedTransport::new();
        t.respond(
            "https://api.census.gov/data/2019/acs/acs5/variables.html",
            LISTING,
        );

        let cat = fetch_catalog(&t, &cfg, 2019, Dataset::Acs5, "Estimate").await?;
        assert_eq!(cat.fields.len(), 3);

        match fetch_catalog(&t, &cfg, 2018, Dataset::Acs5, "").await {
            Err(CensusError::CatalogUnavailable { url, .. }) => {
                assert!(url.ends_with("/2018/acs/acs5/variables.html"))
            }
            other => panic!("expected CatalogUnavailable, got {:?}", other),
        }
        Ok(())
    }
}
