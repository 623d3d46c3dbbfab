// src/fetch/mod.rs

use reqwest::Client;
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use crate::{config::FetchConfig, error::FetchError, logging::redact_key};

pub mod urls;

/// Anything that can turn a URL into a response body.
pub trait Transport: Send + Sync {
    fn get_text(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(cfg: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|source| FetchError::Request {
                url: cfg.base_url.clone(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let shown = redact_key(url.as_str());
        debug!(url = %shown, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: shown.clone(),
                source: source.without_url(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| FetchError::Request {
            url: shown.clone(),
            source: source.without_url(),
        })?;
        if !status.is_success() {
            // the API explains rejected variables in the body
            return Err(FetchError::Status {
                url: shown,
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }
}

/// Retries the inner transport with exponential backoff. Opt-in only: each
/// request is idempotent, but nothing retries unless wrapped.
#[derive(Clone)]
pub struct RetryTransport<T> {
    inner: T,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, max_retries: u32, initial_backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            initial_backoff_ms,
        }
    }

    pub fn from_config(inner: T, cfg: &FetchConfig) -> Self {
        Self::new(inner, cfg.max_retries, cfg.backoff_ms)
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempts = 0;
        loop {
            match self.inner.get_text(url).await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(url = %redact_key(url.as_str()), attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    if self.max_retries > 0 {
                        error!(url = %redact_key(url.as_str()), error = %e, "Exhausted retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// In-memory transport serving fixed bodies by exact URL. Unknown URLs get a
/// 404. Every requested URL is recorded in order.
#[derive(Clone, Default)]
pub struct CannedTransport {
    responses: Arc<Mutex<HashMap<String, Result<String, (u16, String)>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, body: impl Into<String>) -> &Self {
        self.lock_responses().insert(url.into(), Ok(body.into()));
        self
    }

    pub fn fail(&self, url: impl Into<String>, status: u16, body: impl Into<String>) -> &Self {
        self.lock_responses()
            .insert(url.into(), Err((status, body.into())));
        self
    }

    /// URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_responses(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Result<String, (u16, String)>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for CannedTransport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let key = url.as_str().to_string();
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(key.clone());
        match self.lock_responses().get(&key) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err((status, body))) => Err(FetchError::Status {
                url: redact_key(&key),
                status: *status,
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                url: redact_key(&key),
                status: 404,
                body: "no canned response".to_string(),
            }),
        }
    }
}
