// src/error.rs

use thiserror::Error;

/// Failure to obtain or decode one remote response.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("response is not a JSON table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("unsupported dataset '{0}' (expected acs5, acs1, census_redistricting or census_sf1)")]
    UnsupportedDataset(String),

    #[error("unsupported geography '{0}' (expected zip, county or state)")]
    UnsupportedGeography(String),

    #[error("field catalog at {url} is unavailable: {source}")]
    CatalogUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("batch {batch_index} ({} fields from {}) failed: {source}", .codes.len(), first_code(.codes))]
    BatchFetch {
        batch_index: usize,
        codes: Vec<String>,
        #[source]
        source: FetchError,
    },

    #[error("column '{column}' has non-numeric value '{value}' for region '{region}'")]
    NonNumericValue {
        column: String,
        region: String,
        value: String,
    },

    #[error("nothing to fetch: {0}")]
    EmptyRequest(&'static str),

    #[error("field '{0}' was requested more than once")]
    DuplicateField(String),

    #[error("year {0} was requested more than once")]
    DuplicateYear(u16),

    #[error("region '{region}' appears more than once in batch {batch_index}")]
    DuplicateRegion { batch_index: usize, region: String },

    #[error("column '{0}' is present on both sides of a merge")]
    ColumnCollision(String),

    #[error("response column '{0}' does not match any requested field")]
    UnknownField(String),

    #[error("requested field '{0}' is missing from the merged responses")]
    MissingField(String),

    #[error(
        "batch {batch_index} reports {column}={found:?} for '{region}', first batch reported {expected:?}"
    )]
    GeographyMismatch {
        batch_index: usize,
        region: String,
        column: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("batch {got} arrived before batch {expected}")]
    BatchOutOfOrder { expected: usize, got: usize },

    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

fn first_code(codes: &[String]) -> &str {
    codes.first().map(String::as_str).unwrap_or("-")
}

pub type Result<T> = std::result::Result<T, CensusError>;
