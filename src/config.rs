use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{columns, defaults, env, storage};
use crate::errors::FetchError;
use crate::types::ColumnName;

/// Maps provider columns onto record fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderColumns {
    /// Column holding the item title.
    pub title: ColumnName,
    /// Column holding the item text (identity-bearing).
    pub content: ColumnName,
    /// Column holding the raw publish date.
    pub publish_date: ColumnName,
    /// Column holding the raw publish time.
    pub publish_time: ColumnName,
}

impl Default for ProviderColumns {
    fn default() -> Self {
        Self {
            title: columns::TITLE.to_string(),
            content: columns::CONTENT.to_string(),
            publish_date: columns::PUBLISH_DATE.to_string(),
            publish_time: columns::PUBLISH_TIME.to_string(),
        }
    }
}

impl ProviderColumns {
    /// Column names of the CLS telegraph feed.
    pub fn cls_telegraph() -> Self {
        Self {
            title: columns::CLS_TITLE.to_string(),
            content: columns::CLS_CONTENT.to_string(),
            publish_date: columns::CLS_PUBLISH_DATE.to_string(),
            publish_time: columns::CLS_PUBLISH_TIME.to_string(),
        }
    }
}

/// Top-level fetcher configuration.
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    /// Directory holding the day files; created if absent.
    pub save_dir: PathBuf,
    /// Recent day files loaded into the dedup index at start.
    pub warm_days: usize,
    /// Sleep between two fetch cycles.
    pub fetch_interval: Duration,
    /// Sleep after a cycle escaped its own error boundary.
    pub error_backoff: Duration,
    /// Default day window of the latest-records query.
    pub latest_days: usize,
    /// Default result cap of the latest-records query.
    pub latest_limit: usize,
    /// Provider column mapping.
    pub columns: ProviderColumns,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(storage::DEFAULT_SAVE_DIR),
            warm_days: defaults::WARM_DAYS,
            fetch_interval: Duration::from_secs(defaults::FETCH_INTERVAL_SECS),
            error_backoff: Duration::from_secs(defaults::ERROR_BACKOFF_SECS),
            latest_days: defaults::LATEST_DAYS,
            latest_limit: defaults::LATEST_LIMIT,
            columns: ProviderColumns::default(),
        }
    }
}

impl FetcherConfig {
    /// Override the storage directory.
    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    /// Override the warm-up window.
    pub fn with_warm_days(mut self, warm_days: usize) -> Self {
        self.warm_days = warm_days;
        self
    }

    /// Override the fetch interval and error backoff.
    pub fn with_intervals(mut self, fetch_interval: Duration, error_backoff: Duration) -> Self {
        self.fetch_interval = fetch_interval;
        self.error_backoff = error_backoff;
        self
    }

    /// Override the latest-records query defaults.
    pub fn with_latest(mut self, days: usize, limit: usize) -> Self {
        self.latest_days = days;
        self.latest_limit = limit;
        self
    }

    /// Override the provider column mapping.
    pub fn with_columns(mut self, columns: ProviderColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Apply `WIREFEED_DIR` / `WIREFEED_INTERVAL_SECS` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, FetchError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup` (environment-shaped keys).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, FetchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(env::SAVE_DIR).filter(|value| !value.trim().is_empty()) {
            self.save_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(env::FETCH_INTERVAL_SECS) {
            let secs = parse_positive_secs(env::FETCH_INTERVAL_SECS, &raw)?;
            self.fetch_interval = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Reject settings the fetcher cannot run with.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.fetch_interval.is_zero() {
            return Err(FetchError::Configuration(
                "fetch interval must be greater than zero".to_string(),
            ));
        }
        if self.warm_days == 0 {
            return Err(FetchError::Configuration(
                "warm-up window must cover at least today".to_string(),
            ));
        }
        if self.save_dir.as_os_str().is_empty() {
            return Err(FetchError::Configuration(
                "storage directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_positive_secs(name: &str, raw: &str) -> Result<u64, FetchError> {
    let secs = raw.trim().parse::<u64>().map_err(|_| {
        FetchError::Configuration(format!("{name} must be a whole number of seconds, got '{raw}'"))
    })?;
    if secs == 0 {
        return Err(FetchError::Configuration(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(secs)
}
