// src/source.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{CensusError, Result};

/// The dataset families served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// American Community Survey, 5-year estimates.
    Acs5,
    /// American Community Survey, 1-year estimates.
    Acs1,
    /// Decennial census redistricting data.
    CensusRedistricting,
    /// Decennial census summary file 1.
    CensusSf1,
}

impl Dataset {
    /// URL path fragment appended to `<base>/<year>`.
    pub fn path(self) -> &'static str {
        match self {
            Dataset::Acs5 => "/acs/acs5",
            Dataset::Acs1 => "/acs/acs1",
            Dataset::CensusRedistricting => "/dec/pl",
            Dataset::CensusSf1 => "/dec/sf1",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Dataset::Acs5 => "acs5",
            Dataset::Acs1 => "acs1",
            Dataset::CensusRedistricting => "census_redistricting",
            Dataset::CensusSf1 => "census_sf1",
        }
    }
}

impl FromStr for Dataset {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "acs5" => Ok(Dataset::Acs5),
            "acs1" => Ok(Dataset::Acs1),
            "census_redistricting" => Ok(Dataset::CensusRedistricting),
            "census_sf1" => Ok(Dataset::CensusSf1),
            other => Err(CensusError::UnsupportedDataset(other.to_string())),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Region level the rows of a response are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geography {
    Zip,
    County,
    State,
}

impl Geography {
    /// Query fragment selecting every region of this kind.
    pub fn filter(self) -> &'static str {
        match self {
            Geography::Zip => "for=zip%20code%20tabulation%20area:*",
            Geography::County => "for=county:*&in=state:*",
            Geography::State => "for=state:*",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Geography::Zip => "zip",
            Geography::County => "county",
            Geography::State => "state",
        }
    }
}

impl FromStr for Geography {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zip" => Ok(Geography::Zip),
            "county" => Ok(Geography::County),
            "state" => Ok(Geography::State),
            other => Err(CensusError::UnsupportedGeography(other.to_string())),
        }
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A dataset/geography pair, resolved once and handed to every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub dataset: Dataset,
    pub geography: Geography,
}

impl Source {
    pub fn new(dataset: Dataset, geography: Geography) -> Self {
        Self { dataset, geography }
    }

    /// Resolve symbolic identifiers, failing on anything outside the closed set.
    pub fn resolve(dataset: &str, geography: &str) -> Result<Self> {
        Ok(Self {
            dataset: dataset.parse()?,
            geography: geography.parse()?,
        })
    }
}

/// API key passed per call. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// No key; the API serves a small number of anonymous requests.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<none>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_supported_pair() {
        let src = Source::resolve("census_sf1", "county").unwrap();
        assert_eq!(src.dataset.path(), "/dec/sf1");
        assert_eq!(src.geography.filter(), "for=county:*&in=state:*");

        assert_eq!(Dataset::Acs5.path(), "/acs/acs5");
        assert_eq!(Dataset::Acs1.path(), "/acs/acs1");
        assert_eq!(Dataset::CensusRedistricting.path(), "/dec/pl");
        assert_eq!(Geography::State.filter(), "for=state:*");
        assert_eq!(
            Geography::Zip.filter(),
            "for=zip%20code%20tabulation%20area:*"
        );
    }

    #[test]
    fn rejects_unknown_identifiers_without_defaulting() {
        match Source::resolve("acs3", "state") {
            Err(CensusError::UnsupportedDataset(d)) => assert_eq!(d, "acs3"),
            other => panic!("expected UnsupportedDataset, got {:?}", other),
        }
        match Source::resolve("acs5", "tract") {
            Err(CensusError::UnsupportedGeography(g)) => assert_eq!(g, "tract"),
            other => panic!("expected UnsupportedGeography, got {:?}", other),
        }
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for d in [
            Dataset::Acs5,
            Dataset::Acs1,
            Dataset::CensusRedistricting,
            Dataset::CensusSf1,
        ] {
            assert_eq!(d.id().parse::<Dataset>().unwrap(), d);
        }
        for g in [Geography::Zip, Geography::County, Geography::State] {
            assert_eq!(g.to_string().parse::<Geography>().unwrap(), g);
        }
    }

    #[test]
    fn credential_debug_is_redacted() {
        let key = Credential::new("s3cr3t");
        assert_eq!(format!("{:?}", key), "Credential(<redacted>)");
        assert_eq!(key.expose(), "s3cr3t");
        assert!(Credential::anonymous().is_empty());
    }
}
