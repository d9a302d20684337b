#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line entry point shared by the `wirefeed` binary.
pub mod app;
/// Day-file byte codec and its decode ladder.
pub mod codec;
/// Fetcher configuration and provider column mapping.
pub mod config;
/// Centralized constants for storage, columns, and defaults.
pub mod constants;
/// Persisted record type and ordering helpers.
pub mod data;
/// Calendar-day keys and day-file naming.
pub mod day;
/// Process-lifetime content-hash index.
pub mod dedup;
/// Fetcher facade over store, index, and provider.
pub mod fetcher;
mod hash;
/// Fetch, filter, and merge cycle.
pub mod ingestion;
/// Day-file normalization pass.
pub mod retention;
/// Fixed-interval cycle driver.
pub mod scheduler;
/// News provider trait and built-in providers.
pub mod source;
/// Per-day record files.
pub mod store;
/// Storage transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Loose-typing helpers.
pub mod utils;

mod errors;

pub use codec::{CodecError, FileCodec, TextEncoding};
pub use config::{FetcherConfig, ProviderColumns};
pub use data::Record;
pub use day::DayKey;
pub use dedup::{DeduplicationIndex, WarmSummary};
pub use errors::FetchError;
pub use fetcher::{NewsFetcher, latest_records};
pub use hash::content_hash;
pub use ingestion::{CycleOutcome, CycleReport, IngestionCycle};
pub use retention::{RetentionScanner, ScanReport};
pub use scheduler::Scheduler;
pub use source::{
    CommandProvider, InMemoryProvider, JsonFileProvider, NewsProvider, RawItem, raw_item,
};
pub use store::{DayFileLoad, LoadStatus, MergeSummary, RecordStore};
pub use types::{ColumnName, ContentHash, ProviderId, RawTimestamp};
