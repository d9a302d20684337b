use std::collections::HashSet;
use tracing::{info, warn};

use crate::day::DayKey;
use crate::store::{LoadStatus, RecordStore};
use crate::types::ContentHash;

/// Process-lifetime set of content hashes already persisted or ingested.
///
/// Rebuilt from recent day files on every start; never written to disk and
/// never shrinks.
#[derive(Debug, Default)]
pub struct DeduplicationIndex {
    hashes: HashSet<ContentHash>,
}

/// Result of [`DeduplicationIndex::warm`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarmSummary {
    /// Days inspected (today backwards).
    pub days_scanned: usize,
    /// Days whose file existed; a quarantined file counts with zero records.
    pub days_loaded: usize,
    /// Hashes newly inserted into the index.
    pub hashes_added: usize,
    /// Days skipped because their file could not be read.
    pub failures: usize,
}

impl DeduplicationIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load hashes from the day files of `today` and the `days - 1` days before it.
    ///
    /// A record's persisted hash is used when present, otherwise its content is
    /// hashed. A day that fails to read is logged and skipped.
    pub fn warm(&mut self, store: &RecordStore, today: DayKey, days: usize) -> WarmSummary {
        let mut summary = WarmSummary::default();
        for day in today.recent(days) {
            summary.days_scanned += 1;
            let load = match store.load(day) {
                Ok(load) => load,
                Err(err) => {
                    summary.failures += 1;
                    warn!(day = %day, error = %err, "skipping day file during hash warm-up");
                    continue;
                }
            };
            if load.status == LoadStatus::Missing {
                continue;
            }
            summary.days_loaded += 1;
            for record in &load.records {
                if self.record(record.identity()) {
                    summary.hashes_added += 1;
                }
            }
        }
        info!(
            days_scanned = summary.days_scanned,
            days_loaded = summary.days_loaded,
            hashes_added = summary.hashes_added,
            total_hashes = self.len(),
            "loaded existing content hashes"
        );
        summary
    }

    /// Whether `hash` has been seen.
    pub fn seen(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Insert `hash`; returns `true` when it was not present before.
    pub fn record(&mut self, hash: ContentHash) -> bool {
        self.hashes.insert(hash)
    }

    /// Number of known hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` when no hash is known.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
