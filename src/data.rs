use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::content_hash;
use crate::utils::lenient_string;

pub use crate::types::{ContentHash, RawTimestamp};

/// One persisted news item.
///
/// Field names match the day-file format. Values loaded from disk are coerced
/// to strings (`null` and missing fields become empty), and fields this crate
/// does not know about are carried through rewrites untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Headline; may be empty.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Identity-bearing text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    /// Provider publish date, verbatim.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: RawTimestamp,
    /// Provider publish time, verbatim.
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: RawTimestamp,
    /// `"{date} {time}"`; the only sort key.
    #[serde(default, deserialize_with = "lenient_string")]
    pub datetime: RawTimestamp,
    /// Local wall-clock time the record was ingested.
    #[serde(default, deserialize_with = "lenient_string")]
    pub fetch_time: String,
    /// Persisted content hash; empty when an older artifact never stored one.
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: ContentHash,
    /// Unknown fields, preserved in their original order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Build a record from provider fields, composing `datetime` from the
    /// raw date and time and hashing `content`.
    pub fn from_provider(
        title: String,
        content: String,
        date: RawTimestamp,
        time: RawTimestamp,
        fetch_time: String,
    ) -> Self {
        let hash = content_hash(&content);
        Self::with_hash(title, content, date, time, fetch_time, hash)
    }

    /// Same as [`Record::from_provider`] with an already computed hash.
    pub fn with_hash(
        title: String,
        content: String,
        date: RawTimestamp,
        time: RawTimestamp,
        fetch_time: String,
        hash: ContentHash,
    ) -> Self {
        let datetime = compose_datetime(&date, &time);
        Self {
            title,
            content,
            date,
            time,
            datetime,
            fetch_time,
            hash,
            extra: Map::new(),
        }
    }

    /// Dedup identity: the persisted hash when present, else the hash of `content`.
    pub fn identity(&self) -> ContentHash {
        if self.hash.is_empty() {
            content_hash(&self.content)
        } else {
            self.hash.clone()
        }
    }
}

/// Sort key composition. No validation: malformed provider dates sort as
/// whatever their raw text compares to.
pub fn compose_datetime(date: &str, time: &str) -> RawTimestamp {
    format!("{date} {time}")
}

/// Stable sort, newest first by raw `datetime` text.
///
/// Records with equal keys keep their relative input order.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.datetime.cmp(&a.datetime));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(content: &str, datetime: &str) -> Record {
        Record {
            content: content.to_string(),
            datetime: datetime.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn from_provider_composes_datetime_and_hash() {
        let record = Record::from_provider(
            "标题".into(),
            "hello".into(),
            "2025-03-02".into(),
            "09:31:00".into(),
            "2025-03-02 09:35:12".into(),
        );
        assert_eq!(record.datetime, "2025-03-02 09:31:00");
        assert_eq!(record.hash, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(record.identity(), record.hash);
    }

    #[test]
    fn empty_provider_fields_still_compose() {
        assert_eq!(compose_datetime("", ""), " ");
        assert_eq!(compose_datetime("2025-03-02", ""), "2025-03-02 ");
    }

    #[test]
    fn identity_prefers_persisted_hash() {
        let mut stored = record("hello", "");
        assert_eq!(stored.identity(), "5d41402abc4b2a76b9719d911017c592");
        stored.hash = "persisted".into();
        assert_eq!(stored.identity(), "persisted");
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut records = vec![
            record("a", "2025-03-02 09:00:00"),
            record("b", "2025-03-02 10:00:00"),
            record("c", "2025-03-02 09:00:00"),
            record("d", "2025-03-01 23:59:59"),
        ];
        sort_newest_first(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn deserialize_coerces_loose_values_and_keeps_unknown_fields() {
        let value = json!({
            "title": null,
            "content": 12345,
            "date": "2025-03-02",
            "source": "cls",
        });
        let record: Record = serde_json::from_value(value).unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.content, "12345");
        assert_eq!(record.time, "");
        assert_eq!(record.hash, "");
        assert_eq!(record.extra.get("source"), Some(&json!("cls")));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["source"], json!("cls"));
        assert_eq!(back["content"], json!("12345"));
    }
}
