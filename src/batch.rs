// src/batch.rs

use futures::{stream, Stream, StreamExt};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::{
    catalog::FieldDescriptor,
    config::FetchConfig,
    error::{CensusError, Result},
    fetch::{urls::data_url, Transport},
    source::{Credential, Source},
    table::{parse_json_table, RegionTable},
};

/// Fields the API returns per request, `NAME` not counted.
pub const MAX_FIELDS_PER_REQUEST: usize = 45;

/// A contiguous run of requested field codes, fetched in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBatch {
    pub index: usize,
    pub codes: Vec<String>,
}

/// One batch's decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatchTable {
    pub index: usize,
    pub table: RegionTable,
}

/// Everything besides the field list that pins down a request.
#[derive(Debug, Clone)]
pub struct Query {
    pub year: u16,
    pub source: Source,
    pub credential: Credential,
}

impl Query {
    pub fn new(year: u16, source: Source, credential: Credential) -> Self {
        Self {
            year,
            source,
            credential,
        }
    }
}

/// Split `codes` into consecutive batches of at most `MAX_FIELDS_PER_REQUEST`.
pub fn plan_batches<S: AsRef<str>>(codes: &[S]) -> Vec<RequestBatch> {
    codes
        .chunks(MAX_FIELDS_PER_REQUEST)
        .enumerate()
        .map(|(index, chunk)| RequestBatch {
            index,
            codes: chunk.iter().map(|c| c.as_ref().to_string()).collect(),
        })
        .collect()
}

/// Reject empty lists and repeated codes before anything goes over the wire.
pub fn validate_fields(fields: &[FieldDescriptor]) -> Result<()> {
    if fields.is_empty() {
        return Err(CensusError::EmptyRequest("no fields requested"));
    }
    let mut seen = HashSet::with_capacity(fields.len());
    for f in fields {
        if !seen.insert(f.code.as_str()) {
            return Err(CensusError::DuplicateField(f.code.clone()));
        }
    }
    Ok(())
}

/// Issue the request for a single batch.
#[instrument(level = "debug", skip(transport, cfg, query, batch), fields(batch_index = batch.index, fields = batch.codes.len()))]
pub async fn fetch_batch<T: Transport>(
    transport: &T,
    cfg: &FetchConfig,
    query: &Query,
    batch: RequestBatch,
) -> Result<RawBatchTable> {
    let url = data_url(
        &cfg.base_url,
        query.year,
        query.source,
        &batch.codes,
        &query.credential,
    )?;

    let table = transport
        .get_text(&url)
        .await
        .and_then(|body| parse_json_table(&body))
        .map_err(|source| CensusError::BatchFetch {
            batch_index: batch.index,
            codes: batch.codes.clone(),
            source,
        })?;

    info!(
        batch_index = batch.index,
        rows = table.height(),
        columns = table.columns.len(),
        "batch received"
    );
    Ok(RawBatchTable {
        index: batch.index,
        table,
    })
}

/// Fetch every batch of `fields`, yielding tables lazily in batch order.
///
/// Up to `cfg.concurrency` requests are in flight, but results are always
/// yielded in request order, so batch 0 is always the first item. The caller
/// decides what to do with an `Err`; nothing is retried here.
pub fn fetch_all<'a, T: Transport>(
    transport: &'a T,
    cfg: &'a FetchConfig,
    fields: &[FieldDescriptor],
    query: &'a Query,
) -> impl Stream<Item = Result<RawBatchTable>> + 'a {
    let codes: Vec<&str> = fields.iter().map(|f| f.code.as_str()).collect();
    let batches = plan_batches(&codes);
    info!(
        fields = codes.len(),
        batches = batches.len(),
        year = query.year,
        "planned batch fetch"
    );
    stream::iter(batches)
        .map(move |batch| fetch_batch(transport, cfg, query, batch))
        .buffered(cfg.concurrency.max(1))
}

/// A field that could not be fetched on its own.
#[derive(Debug)]
pub struct ProbeFailure {
    pub code: String,
    pub error: CensusError,
}

/// Request each code alone and collect the ones that fail. Used to find the
/// field that makes a whole batch fail.
#[instrument(level = "info", skip(transport, cfg, codes, query), fields(codes = codes.len(), year = query.year))]
pub async fn probe_fields<T: Transport, S: AsRef<str>>(
    transport: &T,
    cfg: &FetchConfig,
    codes: &[S],
    query: &Query,
) -> Vec<ProbeFailure> {
    let mut failures = Vec::new();
    let mut results = stream::iter(codes.iter().enumerate())
        .map(|(index, code)| {
            let batch = RequestBatch {
                index,
                codes: vec![code.as_ref().to_string()],
            };
            fetch_batch(transport, cfg, query, batch)
        })
        .buffered(cfg.concurrency.max(1));

    let mut i = 0;
    while let Some(res) = results.next().await {
        if let Err(error) = res {
            let code = codes[i].as_ref().to_string();
            warn!(%code, %error, "field failed; check the code and that it exists for this geography");
            failures.push(ProbeFailure { code, error });
        }
        i += 1;
    }
    failures
}
