//! Process-wide fetcher facade.
//!
//! A [`NewsFetcher`] owns the store, the warmed dedup index and the provider.
//! It is built once at startup and shared as `Arc<NewsFetcher>` between the
//! scheduler thread and query callers.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::config::FetcherConfig;
use crate::data::{Record, sort_newest_first};
use crate::day::DayKey;
use crate::dedup::DeduplicationIndex;
use crate::errors::FetchError;
use crate::ingestion::{CycleReport, IngestionCycle};
use crate::retention::{RetentionScanner, ScanReport};
use crate::source::NewsProvider;
use crate::store::RecordStore;
use crate::types::ContentHash;

/// Owns the store, the dedup index, and one provider.
///
/// Safe to share across threads; cycles serialize on the index lock.
pub struct NewsFetcher {
    config: FetcherConfig,
    store: RecordStore,
    index: Mutex<DeduplicationIndex>,
    provider: Box<dyn NewsProvider>,
    cycle: IngestionCycle,
    last_fetch: Mutex<Option<NaiveDateTime>>,
}

impl NewsFetcher {
    /// Open the store and warm the dedup index from the local calendar day.
    pub fn open(
        config: FetcherConfig,
        provider: Box<dyn NewsProvider>,
    ) -> Result<Self, FetchError> {
        Self::open_at(config, provider, DayKey::today())
    }

    /// Same as [`NewsFetcher::open`] with an explicit "today".
    pub fn open_at(
        config: FetcherConfig,
        provider: Box<dyn NewsProvider>,
        today: DayKey,
    ) -> Result<Self, FetchError> {
        config.validate()?;
        let store = RecordStore::open(&config.save_dir)?;
        let mut index = DeduplicationIndex::new();
        index.warm(&store, today, config.warm_days);
        info!(
            dir = %store.dir().display(),
            provider = provider.id(),
            known_hashes = index.len(),
            "news fetcher ready"
        );
        Ok(Self {
            cycle: IngestionCycle::new(config.columns.clone()),
            config,
            store,
            index: Mutex::new(index),
            provider,
            last_fetch: Mutex::new(None),
        })
    }

    /// Run one ingestion cycle at the current local time.
    pub fn fetch_and_save(&self) -> CycleReport {
        self.fetch_and_save_at(Local::now().naive_local())
    }

    /// Run one ingestion cycle at `now`.
    pub fn fetch_and_save_at(&self, now: NaiveDateTime) -> CycleReport {
        info!(provider = self.provider.id(), "starting fetch cycle");
        let report = {
            let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
            self.cycle
                .run(self.provider.as_ref(), &mut index, &self.store, now)
        };
        *self.last_fetch.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
        info!(
            outcome = %report.outcome,
            total = report.total,
            written = report.written,
            "fetch cycle finished"
        );
        report
    }

    /// Latest records using the configured day window and cap.
    pub fn latest(&self) -> Vec<Record> {
        self.get_latest(self.config.latest_days, self.config.latest_limit)
    }

    /// Newest-first records of the last `days` days, deduplicated, at most `limit`.
    pub fn get_latest(&self, days: usize, limit: usize) -> Vec<Record> {
        self.get_latest_from(DayKey::today(), days, limit)
    }

    /// [`NewsFetcher::get_latest`] counting days back from `today`.
    pub fn get_latest_from(&self, today: DayKey, days: usize, limit: usize) -> Vec<Record> {
        latest_records(&self.store, today, days, limit)
    }

    /// Normalize or quarantine every day file in the storage directory.
    pub fn scan(&self) -> ScanReport {
        RetentionScanner::new(&self.store).scan()
    }

    /// Underlying day-file store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Configuration the fetcher was opened with.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Number of hashes in the dedup index.
    pub fn known_hashes(&self) -> usize {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wall-clock time of the most recent cycle, if any ran.
    pub fn last_fetch_time(&self) -> Option<NaiveDateTime> {
        *self.last_fetch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Newest-first records of `days` day files ending at `today`, at most `limit`.
///
/// Day files are read today first; the first record seen for a hash wins.
/// Unreadable days are skipped.
pub fn latest_records(
    store: &RecordStore,
    today: DayKey,
    days: usize,
    limit: usize,
) -> Vec<Record> {
    let mut unique: IndexMap<ContentHash, Record> = IndexMap::new();
    let mut loaded = 0usize;
    let mut duplicates = 0usize;
    for day in today.recent(days) {
        let records = match store.read(day) {
            Ok(records) => records,
            Err(err) => {
                warn!(day = %day, error = %err, "skipping unreadable day file");
                continue;
            }
        };
        loaded += records.len();
        for record in records {
            let identity = record.identity();
            if unique.contains_key(&identity) {
                duplicates += 1;
                continue;
            }
            unique.insert(identity, record);
        }
    }

    let mut records: Vec<Record> = unique.into_values().collect();
    let deduplicated = records.len();
    sort_newest_first(&mut records);
    records.truncate(limit);
    info!(
        days,
        loaded,
        deduplicated,
        duplicates,
        returned = records.len(),
        "collected latest records"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemoryProvider, RawItem, raw_item};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn row(content: &str, date: &str, time: &str) -> RawItem {
        raw_item(json!({
            "title": content,
            "content": content,
            "publish_date": date,
            "publish_time": time,
        }))
    }

    #[test]
    fn warm_start_suppresses_previously_saved_content() {
        let temp = tempdir().unwrap();
        let config = FetcherConfig::default().with_save_dir(temp.path());
        let batch = vec![row("c1", "2025-03-01", "10:00:00")];

        let first = NewsFetcher::open_at(
            config.clone(),
            Box::new(InMemoryProvider::repeating("p", batch.clone())),
            DayKey::from_ymd(2025, 3, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(first.fetch_and_save_at(at(1, 10)).written, 1);
        assert_eq!(first.last_fetch_time(), Some(at(1, 10)));

        let restarted = NewsFetcher::open_at(
            config,
            Box::new(InMemoryProvider::repeating("p", batch)),
            DayKey::from_ymd(2025, 3, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(restarted.known_hashes(), 1);
        let report = restarted.fetch_and_save_at(at(2, 10));
        assert_eq!(report.written, 0);
        assert_eq!(report.duplicates, 1);
        assert!(!restarted.store().path_for(report.day).exists());
    }

    #[test]
    fn get_latest_dedups_across_days_first_seen_wins() {
        let temp = tempdir().unwrap();
        let fetcher = NewsFetcher::open_at(
            FetcherConfig::default().with_save_dir(temp.path()),
            Box::new(InMemoryProvider::scripted("p", Vec::new())),
            DayKey::from_ymd(2025, 3, 2).unwrap(),
        )
        .unwrap();
        let yesterday = DayKey::from_ymd(2025, 3, 1).unwrap();
        let today = DayKey::from_ymd(2025, 3, 2).unwrap();
        let repeated_yesterday = Record::from_provider(
            "old copy".into(),
            "same".into(),
            "2025-03-01".into(),
            "08:00:00".into(),
            String::new(),
        );
        let repeated_today = Record::from_provider(
            "new copy".into(),
            "same".into(),
            "2025-03-02".into(),
            "07:00:00".into(),
            String::new(),
        );
        let only_today = Record::from_provider(
            "fresh".into(),
            "fresh".into(),
            "2025-03-02".into(),
            "09:00:00".into(),
            String::new(),
        );
        fetcher
            .store()
            .merge_write(yesterday, vec![repeated_yesterday])
            .unwrap();
        fetcher
            .store()
            .merge_write(today, vec![repeated_today, only_today])
            .unwrap();

        let latest = fetcher.get_latest_from(today, 2, 50);
        let titles: Vec<&str> = latest.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["fresh", "new copy"]);

        assert_eq!(fetcher.get_latest_from(today, 2, 1).len(), 1);
        assert!(fetcher.get_latest_from(today, 0, 50).is_empty());
        assert_eq!(fetcher.get_latest_from(today, 1, 50).len(), 2);
    }

    #[test]
    fn open_rejects_invalid_config() {
        let temp = tempdir().unwrap();
        let config = FetcherConfig::default()
            .with_save_dir(temp.path())
            .with_intervals(std::time::Duration::ZERO, std::time::Duration::ZERO);
        let provider = InMemoryProvider::scripted("p", Vec::new());
        let result = NewsFetcher::open(config, Box::new(provider));
        assert!(matches!(result, Err(FetchError::Configuration(_))));
    }

    #[test]
    fn open_rejects_warm_window_that_skips_today() {
        let temp = tempdir().unwrap();
        let config = FetcherConfig::default()
            .with_save_dir(temp.path())
            .with_warm_days(0);
        let provider = InMemoryProvider::scripted("p", Vec::new());
        let today = DayKey::from_ymd(2025, 3, 2).unwrap();
        let result = NewsFetcher::open_at(config, Box::new(provider), today);
        assert!(matches!(result, Err(FetchError::Configuration(_))));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
