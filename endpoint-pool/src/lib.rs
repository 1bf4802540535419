#![warn(missing_docs)]

//! **Rate-Limited Endpoint Pool**
//!
//! Multiplexes many logical RPC requests over a small, heterogeneous set of
//! provider endpoints: respects each endpoint's per-second quota, prefers
//! higher-priority endpoints, temporarily disables endpoints exhibiting
//! sustained failures, and recovers them automatically after a cooldown.
//!
//! Grounded in the same shape as a single-endpoint JSON-RPC transport (one
//! `reqwest::Client`, a `thiserror` error enum, a typed `call` entry
//! point), generalized to select among many.

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use types::{EndpointKind, ProviderEndpoint};

/// After this many consecutive failures, an endpoint is disabled for `COOLDOWN`.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;
/// How long a disabled endpoint stays disabled before becoming re-eligible.
pub const COOLDOWN: Duration = Duration::from_secs(300);
/// Ceiling on the per-endpoint exponential backoff applied below the disable threshold.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Errors surfaced by the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No endpoint of the requested kind is currently eligible. Non-fatal;
    /// callers treat it as a transient miss.
    #[error("no healthy endpoint available")]
    NoHealthyEndpoint,
    /// HTTP transport error, includes status code and underlying error.
    #[error("HTTP error (status {0}): {1}")]
    Http(u16, #[source] reqwest::Error),
    /// The JSON-RPC response contained an error object.
    #[error("RPC error: {0}")]
    Rpc(Value),
    /// Failed to parse the JSON response.
    #[error("invalid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The JSON-RPC response did not include a `result` field.
    #[error("missing result field in response")]
    MissingResult,
}

impl PoolError {
    /// Whether this error class counts toward the disable threshold (§4.1:
    /// "non-retryable application errors do not count toward disable").
    fn counts_toward_disable(&self) -> bool {
        match self {
            PoolError::Http(status, _) => *status == 0 || *status == 429 || *status >= 500,
            PoolError::NoHealthyEndpoint | PoolError::Rpc(_) | PoolError::Serialization(_) | PoolError::MissingResult => false,
        }
    }
}

fn backoff_duration(consecutive_errors: u32) -> Duration {
    let secs = 2u64.saturating_pow(consecutive_errors.min(10)).min(MAX_BACKOFF.as_secs());
    Duration::from_secs(secs)
}

/// The pool: a fixed set of endpoints plus the HTTP client used to reach them.
pub struct EndpointPool {
    endpoints: Mutex<Vec<ProviderEndpoint>>,
    client: Client,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<ProviderEndpoint>) -> Self {
        Self {
            endpoints: Mutex::new(endpoints),
            client: Client::new(),
        }
    }

    /// Number of endpoints currently registered (used by the Watchdog's `/health` snapshot).
    pub fn size(&self) -> usize {
        self.endpoints.lock().expect("endpoint pool mutex poisoned").len()
    }

    /// Select the best eligible endpoint of `kind` and reserve its request
    /// slot. Returns the endpoint's index, stable for the lifetime of the
    /// pool, for use with `report_success`/`report_error`.
    pub fn select(&self, kind: EndpointKind) -> Result<usize, PoolError> {
        let now = Instant::now();
        let mut endpoints = self.endpoints.lock().expect("endpoint pool mutex poisoned");
        let idx = select_locked(&mut endpoints, kind, now).ok_or(PoolError::NoHealthyEndpoint)?;
        endpoints[idx].last_request_at = Some(now);
        Ok(idx)
    }

    /// Reset an endpoint's failure streak after a successful call.
    pub fn report_success(&self, idx: usize) {
        let mut endpoints = self.endpoints.lock().expect("endpoint pool mutex poisoned");
        if let Some(endpoint) = endpoints.get_mut(idx) {
            endpoint.consecutive_errors = 0;
            endpoint.disabled_until = None;
        }
    }

    /// Record a failed call. Non-retryable application errors do not count
    /// toward the disable threshold; everything else applies exponential
    /// backoff and disables the endpoint after `MAX_CONSECUTIVE_ERRORS`.
    pub fn report_error(&self, idx: usize, error: &PoolError) {
        if !error.counts_toward_disable() {
            return;
        }
        let now = Instant::now();
        let mut endpoints = self.endpoints.lock().expect("endpoint pool mutex poisoned");
        if let Some(endpoint) = endpoints.get_mut(idx) {
            endpoint.consecutive_errors += 1;
            endpoint.disabled_until = Some(if endpoint.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                now + COOLDOWN
            } else {
                now + backoff_duration(endpoint.consecutive_errors)
            });
        }
    }

    /// Select an endpoint, issue a JSON-RPC call, and update its counters
    /// based on the outcome.
    pub async fn call<P: Serialize, R: DeserializeOwned>(&self, kind: EndpointKind, method: &str, params: &[P]) -> Result<R, PoolError> {
        let idx = self.select(kind)?;
        let url = self.endpoints.lock().expect("endpoint pool mutex poisoned")[idx].url.clone();
        match send_request(&self.client, &url, method, params).await {
            Ok(value) => {
                self.report_success(idx);
                serde_json::from_value(value).map_err(PoolError::from)
            }
            Err(err) => {
                self.report_error(idx, &err);
                Err(err)
            }
        }
    }
}

async fn send_request<P: Serialize>(client: &Client, url: &str, method: &str, params: &[P]) -> Result<Value, PoolError> {
    let body = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });

    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| to_pool_error(e))?;

    let resp: Value = response.json().await.map_err(|e| to_pool_error(e))?;

    if let Some(err) = resp.get("error") {
        Err(PoolError::Rpc(err.clone()))
    } else if !resp.is_object() || resp.get("result").is_none() {
        Err(PoolError::MissingResult)
    } else {
        Ok(resp["result"].clone())
    }
}

fn to_pool_error(e: reqwest::Error) -> PoolError {
    match e.status() {
        Some(status) => PoolError::Http(status.as_u16(), e),
        None => PoolError::Http(0, e),
    }
}

/// The selection algorithm described in §4.1: among endpoints eligible now
/// (not disabled, past their rate-limit interval), pick the lowest
/// `priority`; break ties with smooth weighted round-robin.
fn select_locked(endpoints: &mut [ProviderEndpoint], kind: EndpointKind, now: Instant) -> Option<usize> {
    let eligible: Vec<usize> = endpoints
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == kind && !e.is_disabled(now) && e.is_rate_eligible(now))
        .map(|(i, _)| i)
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let min_priority = eligible.iter().map(|&i| endpoints[i].priority).min().unwrap();
    let candidates: Vec<usize> = eligible.into_iter().filter(|&i| endpoints[i].priority == min_priority).collect();

    if candidates.len() == 1 {
        return Some(candidates[0]);
    }

    let total_weight: i64 = candidates.iter().map(|&i| endpoints[i].weight).sum();
    for &i in &candidates {
        endpoints[i].current_weight += endpoints[i].weight;
    }
    let winner = *candidates.iter().max_by_key(|&&i| endpoints[i].current_weight).unwrap();
    endpoints[winner].current_weight -= total_weight;
    Some(winner)
}
