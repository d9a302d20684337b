//! Provider interfaces and built-in providers.
//!
//! A provider returns one batch of loosely-typed rows per call. Rows are JSON
//! objects keyed by column name; the ingestion cycle maps columns onto record
//! fields and coerces values to strings.

use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::errors::FetchError;
use crate::types::ProviderId;

/// Built-in provider implementations.
pub mod sources;

pub use sources::command::CommandProvider;
pub use sources::json_file::JsonFileProvider;

/// One provider row, keyed by column name.
pub type RawItem = Map<String, Value>;

/// Upstream news feed.
///
/// An empty batch is a normal outcome. Any `Err` fails the current cycle
/// without touching stored data.
pub trait NewsProvider: Send + Sync {
    /// Stable provider identifier used in logs and errors.
    fn id(&self) -> &str;
    /// Fetch the current batch of rows.
    fn fetch(&self) -> Result<Vec<RawItem>, FetchError>;
}

/// Scripted in-memory provider for tests and demos.
///
/// Each `fetch` pops the next scripted result; once the script is exhausted
/// the fallback batch (empty unless configured) is returned.
pub struct InMemoryProvider {
    id: ProviderId,
    script: Mutex<VecDeque<Result<Vec<RawItem>, FetchError>>>,
    fallback: Vec<RawItem>,
    calls: AtomicUsize,
}

impl InMemoryProvider {
    /// Provider that replays `script` in order.
    pub fn scripted(
        id: impl Into<ProviderId>,
        script: Vec<Result<Vec<RawItem>, FetchError>>,
    ) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(script.into_iter().collect()),
            fallback: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider that returns `batch` on every call.
    pub fn repeating(id: impl Into<ProviderId>, batch: Vec<RawItem>) -> Self {
        Self::scripted(id, Vec::new()).with_fallback(batch)
    }

    /// Batch returned once the script runs out.
    pub fn with_fallback(mut self, batch: Vec<RawItem>) -> Self {
        self.fallback = batch;
        self
    }

    /// Number of `fetch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NewsProvider for InMemoryProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Row from a JSON object literal; any other value yields an empty row.
pub fn raw_item(value: Value) -> RawItem {
    match value {
        Value::Object(map) => map,
        _ => RawItem::new(),
    }
}

/// Parse a provider payload: a JSON array of row objects.
///
/// Blank payloads are an empty batch.
pub(crate) fn parse_rows(provider: &str, payload: &[u8]) -> Result<Vec<RawItem>, FetchError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice::<Vec<RawItem>>(payload).map_err(|err| {
        FetchError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: format!("payload is not a JSON array of row objects: {err}"),
        }
    })
}
