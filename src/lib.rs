//! Fetch wide census tables from an API that caps the number of fields per
//! request.
//!
//! Requested fields are split into batches of [`batch::MAX_FIELDS_PER_REQUEST`],
//! fetched, stripped of the geography columns the API adds on its own, outer
//! joined on `NAME`, and finally renamed and typed into a [`DataTable`].

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod geography;
pub mod logging;
pub mod merge;
pub mod process;
pub mod source;
pub mod table;
pub mod timeseries;

pub use batch::{fetch_all, probe_fields, Query, RawBatchTable, RequestBatch};
pub use catalog::{fetch_catalog, Catalog, FieldDescriptor, GroupEntry};
pub use config::FetchConfig;
pub use error::{CensusError, FetchError, Result};
pub use fetch::{CannedTransport, HttpTransport, RetryTransport, Transport};
pub use frame::{Column, ColumnData, DataTable};
pub use merge::{MergeEngine, MergedTable};
pub use process::retrieve;
pub use source::{Credential, Dataset, Geography, Source};
pub use timeseries::{compare_across_years, fetch_single_field};
