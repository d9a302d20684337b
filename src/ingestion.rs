use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info};

use crate::config::ProviderColumns;
use crate::constants::records::FETCH_TIME_FORMAT;
use crate::data::Record;
use crate::day::DayKey;
use crate::dedup::DeduplicationIndex;
use crate::hash::content_hash;
use crate::source::{NewsProvider, RawItem};
use crate::store::RecordStore;
use crate::types::ContentHash;
use crate::utils::coerce_to_string;

/// How a cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New records were merged into the day file.
    Saved,
    /// The batch held only already-known content.
    NothingNew,
    /// The provider returned no rows.
    EmptyBatch,
    /// The provider call failed; nothing was written.
    ProviderFailed,
    /// The merge-write failed; the index was left untouched.
    StoreFailed,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CycleOutcome::Saved => "saved",
            CycleOutcome::NothingNew => "nothing_new",
            CycleOutcome::EmptyBatch => "empty_batch",
            CycleOutcome::ProviderFailed => "provider_failed",
            CycleOutcome::StoreFailed => "store_failed",
        };
        f.write_str(label)
    }
}

/// Counts and outcome of one fetch-filter-merge cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Day file the batch was destined for.
    pub day: DayKey,
    /// Rows returned by the provider.
    pub total: usize,
    /// Rows whose content was not known before this cycle.
    pub new: usize,
    /// Rows discarded as already seen (in the index or earlier in the batch).
    pub duplicates: usize,
    /// Records persisted by this cycle; `new` on success, else zero.
    pub written: usize,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// Rendered error for failed cycles.
    pub error: Option<String>,
}

impl CycleReport {
    fn empty(day: DayKey, outcome: CycleOutcome) -> Self {
        Self {
            day,
            total: 0,
            new: 0,
            duplicates: 0,
            written: 0,
            outcome,
            error: None,
        }
    }

    /// `false` only when the provider or the store failed.
    pub fn succeeded(&self) -> bool {
        !matches!(
            self.outcome,
            CycleOutcome::ProviderFailed | CycleOutcome::StoreFailed
        )
    }
}

/// One fetch, filter, merge pass. This is the error boundary for provider
/// and store failures: they end up in the report, never as `Err` or panic.
#[derive(Clone, Debug, Default)]
pub struct IngestionCycle {
    columns: ProviderColumns,
}

impl IngestionCycle {
    /// Create a cycle mapping provider rows through `columns`.
    pub fn new(columns: ProviderColumns) -> Self {
        Self { columns }
    }

    /// Column mapping in use.
    pub fn columns(&self) -> &ProviderColumns {
        &self.columns
    }

    /// Run one cycle at wall-clock time `now`.
    ///
    /// New records go to `now`'s day file. Hashes enter `index` only once the
    /// merge-write succeeded.
    pub fn run(
        &self,
        provider: &dyn NewsProvider,
        index: &mut DeduplicationIndex,
        store: &RecordStore,
        now: NaiveDateTime,
    ) -> CycleReport {
        let day = DayKey::new(now.date());
        let rows = match provider.fetch() {
            Ok(rows) => rows,
            Err(err) => {
                error!(provider = provider.id(), error = %err, "provider fetch failed");
                let mut report = CycleReport::empty(day, CycleOutcome::ProviderFailed);
                report.error = Some(err.to_string());
                return report;
            }
        };
        if rows.is_empty() {
            info!(provider = provider.id(), "provider returned no rows");
            return CycleReport::empty(day, CycleOutcome::EmptyBatch);
        }

        let fetch_time = now.format(FETCH_TIME_FORMAT).to_string();
        let total = rows.len();
        let mut pending: HashSet<ContentHash> = HashSet::new();
        let mut batch = Vec::new();
        for row in &rows {
            let record = self.to_record(row, &fetch_time);
            if index.seen(&record.hash) || !pending.insert(record.hash.clone()) {
                continue;
            }
            batch.push(record);
        }

        let mut report = CycleReport::empty(day, CycleOutcome::NothingNew);
        report.total = total;
        report.new = batch.len();
        report.duplicates = total - batch.len();
        debug!(
            provider = provider.id(),
            total,
            new = report.new,
            duplicates = report.duplicates,
            "filtered provider batch"
        );
        if batch.is_empty() {
            info!(total, "no new records in batch");
            return report;
        }

        match store.merge_write(day, batch) {
            Ok(summary) => {
                for hash in pending {
                    index.record(hash);
                }
                report.written = summary.added;
                report.outcome = CycleOutcome::Saved;
                info!(
                    day = %day,
                    total,
                    new = report.new,
                    duplicates = report.duplicates,
                    stored = summary.total,
                    "saved new records"
                );
            }
            Err(err) => {
                error!(day = %day, error = %err, "failed to save new records");
                report.outcome = CycleOutcome::StoreFailed;
                report.error = Some(err.to_string());
            }
        }
        report
    }

    fn to_record(&self, row: &RawItem, fetch_time: &str) -> Record {
        let field = |column: &str| row.get(column).map(coerce_to_string).unwrap_or_default();
        let content = field(&self.columns.content);
        let hash = content_hash(&content);
        Record::with_hash(
            field(&self.columns.title),
            content,
            field(&self.columns.publish_date),
            field(&self.columns.publish_time),
            fetch_time.to_string(),
            hash,
        )
    }
}
