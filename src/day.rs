use chrono::{Days, Local, NaiveDate};
use std::fmt;

use crate::constants::storage::{
    DAY_FILE_EXTENSION, DAY_FILE_PREFIX, DAY_KEY_FORMAT, DAY_KEY_LEN,
};

/// Calendar day that names one day file (`YYYYMMDD`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Wrap a calendar date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Build a key from year/month/day, returning `None` for invalid dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Underlying calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Parse an exact 8-digit `YYYYMMDD` key.
    ///
    /// Returns `None` for any other length, non-digit characters, or an
    /// impossible calendar date.
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != DAY_KEY_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(value, DAY_KEY_FORMAT)
            .ok()
            .map(Self)
    }

    /// Parse a day-file name such as `news_20250302.json`.
    ///
    /// Quarantine copies (`news_20250302.json.corrupted.1740900000`) and temp
    /// files do not match.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name
            .strip_prefix(DAY_FILE_PREFIX)?
            .strip_suffix(DAY_FILE_EXTENSION)?
            .strip_suffix('.')?;
        Self::parse(stem)
    }

    /// Day-file name for this key.
    pub fn file_name(&self) -> String {
        format!("{DAY_FILE_PREFIX}{self}.{DAY_FILE_EXTENSION}")
    }

    /// The key `days` calendar days earlier, or `None` before the calendar start.
    pub fn days_before(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(Self)
    }

    /// This day followed by the `count - 1` preceding days, newest first.
    pub fn recent(self, count: usize) -> Vec<Self> {
        (0..count as u64)
            .map_while(|offset| self.days_before(offset))
            .collect()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_day_keys() {
        assert_eq!(DayKey::parse("20250302"), DayKey::from_ymd(2025, 3, 2));
        assert_eq!(DayKey::parse("2025032"), None);
        assert_eq!(DayKey::parse("202503021"), None);
        assert_eq!(DayKey::parse("20251302"), None);
        assert_eq!(DayKey::parse("20250230"), None);
        assert_eq!(DayKey::parse("2025-3-2"), None);
        assert_eq!(DayKey::parse("+2025032"), None);
    }

    #[test]
    fn file_names_round_trip_and_reject_siblings() {
        let day = DayKey::from_ymd(2025, 3, 2).unwrap();
        assert_eq!(day.file_name(), "news_20250302.json");
        assert_eq!(DayKey::from_file_name("news_20250302.json"), Some(day));
        assert_eq!(
            DayKey::from_file_name("news_20250302.json.corrupted.1740900000"),
            None
        );
        assert_eq!(DayKey::from_file_name("news_20250302.json.tmp"), None);
        assert_eq!(DayKey::from_file_name("news_latest.json"), None);
        assert_eq!(DayKey::from_file_name("notes_20250302.json"), None);
        assert_eq!(DayKey::from_file_name("news_20250302json"), None);
    }

    #[test]
    fn recent_walks_backwards_across_month_boundaries() {
        let day = DayKey::from_ymd(2025, 3, 1).unwrap();
        let keys: Vec<String> = day.recent(3).iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["20250301", "20250228", "20250227"]);
        assert!(day.recent(0).is_empty());
    }
}
