/// Constants describing on-disk day-file naming.
pub mod storage {
    /// Default storage directory, relative to the working directory.
    pub const DEFAULT_SAVE_DIR: &str = "data/news";
    /// File-name prefix shared by every day file (`news_20250302.json`).
    pub const DAY_FILE_PREFIX: &str = "news_";
    /// File extension of day files.
    pub const DAY_FILE_EXTENSION: &str = "json";
    /// `chrono` format of the date embedded in a day-file name.
    pub const DAY_KEY_FORMAT: &str = "%Y%m%d";
    /// Number of digits in a day key.
    pub const DAY_KEY_LEN: usize = 8;
    /// Marker inserted between a corrupted artifact name and its timestamp.
    pub const QUARANTINE_MARKER: &str = "corrupted";
    /// Suffix appended to a day-file path while an atomic write is in flight.
    pub const TEMP_SUFFIX: &str = "tmp";
}

/// Constants used when building records.
pub mod records {
    /// `chrono` format of the `fetch_time` field.
    pub const FETCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// Default provider column names.
pub mod columns {
    /// Title column.
    pub const TITLE: &str = "title";
    /// Content column (identity-bearing).
    pub const CONTENT: &str = "content";
    /// Publish-date column.
    pub const PUBLISH_DATE: &str = "publish_date";
    /// Publish-time column.
    pub const PUBLISH_TIME: &str = "publish_time";

    /// CLS telegraph title column.
    pub const CLS_TITLE: &str = "标题";
    /// CLS telegraph content column.
    pub const CLS_CONTENT: &str = "内容";
    /// CLS telegraph publish-date column.
    pub const CLS_PUBLISH_DATE: &str = "发布日期";
    /// CLS telegraph publish-time column.
    pub const CLS_PUBLISH_TIME: &str = "发布时间";
}

/// Defaults for the fetch loop, warm-up, and latest-records query.
pub mod defaults {
    /// Seconds between two fetch cycles.
    pub const FETCH_INTERVAL_SECS: u64 = 600;
    /// Seconds to wait after a cycle escaped its own error boundary.
    pub const ERROR_BACKOFF_SECS: u64 = 60;
    /// Number of recent day files loaded into the dedup index at start.
    pub const WARM_DAYS: usize = 3;
    /// Days covered by the latest-records query when unspecified.
    pub const LATEST_DAYS: usize = 1;
    /// Result cap of the latest-records query when unspecified.
    pub const LATEST_LIMIT: usize = 50;
}

/// Environment variables consulted when the matching CLI flag is absent.
pub mod env {
    /// Storage directory override.
    pub const SAVE_DIR: &str = "WIREFEED_DIR";
    /// Fetch interval override, in seconds.
    pub const FETCH_INTERVAL_SECS: &str = "WIREFEED_INTERVAL_SECS";
}
