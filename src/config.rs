// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://api.census.gov/data";

/// Knobs for talking to the API. Every field has a default, so a YAML file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Root of the data API, without a trailing slash.
    pub base_url: String,
    /// Batch requests in flight at once. Results are merged in batch order
    /// regardless.
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Extra attempts per request; 0 disables `RetryTransport`.
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
    /// Compare `state`/`county` values of later batches against the first.
    pub verify_geography: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: 1,
            timeout_secs: 60,
            max_retries: 0,
            backoff_ms: 500,
            user_agent: concat!("census_batch/", env!("CARGO_PKG_VERSION")).to_string(),
            verify_geography: cfg!(debug_assertions),
        }
    }
}

impl FetchConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: FetchConfig = serde_yaml::from_str(text).context("parsing fetch config YAML")?;
        Ok(cfg.normalized())
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("loading config from {:?}", path))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn normalized(mut self) -> Self {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        self.concurrency = self.concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_sequential_without_retries() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let cfg = FetchConfig::from_yaml_str("concurrency: 4\nbase_url: http://localhost:8080/data/\n")?;
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.base_url, "http://localhost:8080/data");
        assert_eq!(cfg.backoff_ms, 500);
        Ok(())
    }

    #[test]
    fn zero_concurrency_is_clamped() -> Result<()> {
        let cfg = FetchConfig::from_yaml_str("concurrency: 0")?;
        assert_eq!(cfg.concurrency, 1);
        Ok(())
    }

    #[test]
    fn loads_from_file() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "max_retries: 3\nverify_geography: true")?;
        let cfg = FetchConfig::from_yaml_file(tmp.path())?;
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.verify_geography);
        Ok(())
    }

    #[test]
    fn unknown_type_is_reported_with_path() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "concurrency: lots").unwrap();
        let err = FetchConfig::from_yaml_file(tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("loading config from"));
    }
}
