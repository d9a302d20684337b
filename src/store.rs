//! Per-day record files.
//!
//! Every operation on a day file runs under that day's mutex, so a retention
//! scan quarantining a file cannot interleave with a merge-write of the same
//! day. Different days proceed independently.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use crate::codec::{CodecError, FileCodec, TextEncoding};
use crate::data::{Record, sort_newest_first};
use crate::day::DayKey;
use crate::errors::FetchError;
use crate::transport::fs::{list_files, quarantine_copy, write_atomic};

/// How a day file looked when it was loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// No artifact exists for the day.
    Missing,
    /// Artifact decoded as canonical UTF-8.
    Canonical,
    /// Artifact decoded in a non-canonical encoding; `rewritten` is true once
    /// the file on disk has been replaced by its UTF-8 form.
    Reencoded {
        /// Encoding the artifact was decoded from.
        from: TextEncoding,
        /// Whether the UTF-8 rewrite reached disk.
        rewritten: bool,
    },
    /// Artifact was corrupt, copied to `backup`, and replaced with an empty file.
    Quarantined {
        /// Path of the quarantine copy.
        backup: PathBuf,
    },
}

/// Records of one day plus how they were obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct DayFileLoad {
    /// Day the file belongs to.
    pub day: DayKey,
    /// Records in on-disk order.
    pub records: Vec<Record>,
    /// How the artifact was found.
    pub status: LoadStatus,
}

/// Outcome of [`RecordStore::merge_write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    /// Day that was written.
    pub day: DayKey,
    /// Day file that was replaced.
    pub path: PathBuf,
    /// Records already on disk before the merge.
    pub existing: usize,
    /// Records appended by this merge.
    pub added: usize,
    /// Records in the written artifact (`existing + added`).
    pub total: usize,
}

/// Directory of `news_YYYYMMDD.json` files.
pub struct RecordStore {
    dir: PathBuf,
    codec: FileCodec,
    locks: Mutex<HashMap<DayKey, Arc<Mutex<()>>>>,
}

impl RecordStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self {
            dir,
            codec: FileCodec::default(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the codec (for a custom decode ladder).
    pub fn with_codec(mut self, codec: FileCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for `day`.
    pub fn path_for(&self, day: DayKey) -> PathBuf {
        self.dir.join(day.file_name())
    }

    /// Records stored for `day`; empty when the artifact is missing or corrupt.
    pub fn read(&self, day: DayKey) -> Result<Vec<Record>, FetchError> {
        self.load(day).map(|load| load.records)
    }

    /// Load `day`, normalizing legacy encodings and quarantining corruption.
    pub fn load(&self, day: DayKey) -> Result<DayFileLoad, FetchError> {
        let lock = self.day_lock(day);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_locked(day, true)
    }

    /// Append `new_records` to the day file and rewrite it newest-first.
    ///
    /// Callers pass records whose hashes are absent from the existing file;
    /// no deduplication happens here. The sort is stable, so records with
    /// equal `datetime` keep existing-before-new order.
    pub fn merge_write(
        &self,
        day: DayKey,
        new_records: Vec<Record>,
    ) -> Result<MergeSummary, FetchError> {
        let lock = self.day_lock(day);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        ensure_dir(&self.dir)?;

        // The merged write below is canonical, so skip the separate re-encode.
        let mut merged = self.load_locked(day, false)?.records;
        let existing = merged.len();
        let added = new_records.len();
        merged.extend(new_records);
        sort_newest_first(&mut merged);

        let path = self.path_for(day);
        self.write_records(&path, &merged)?;
        info!(
            day = %day,
            path = %path.display(),
            existing,
            added,
            total = merged.len(),
            "merged records into day file"
        );
        Ok(MergeSummary {
            day,
            path,
            existing,
            added,
            total: merged.len(),
        })
    }

    /// Every day file directly under the storage directory, oldest first.
    ///
    /// Quarantine copies, temp files, and names without a valid date are skipped.
    pub fn list_day_files(&self) -> Vec<(DayKey, PathBuf)> {
        let mut files: Vec<(DayKey, PathBuf)> =
            list_files(&self.dir, |name| DayKey::from_file_name(name).is_some())
                .into_iter()
                .filter_map(|path| {
                    let day = DayKey::from_file_name(path.file_name()?.to_str()?)?;
                    Some((day, path))
                })
                .collect();
        files.sort_by_key(|(day, _)| *day);
        files
    }

    fn day_lock(&self, day: DayKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(day).or_default().clone()
    }

    fn load_locked(&self, day: DayKey, rewrite_legacy: bool) -> Result<DayFileLoad, FetchError> {
        let path = self.path_for(day);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(day = %day, path = %path.display(), "day file does not exist");
                return Ok(DayFileLoad {
                    day,
                    records: Vec::new(),
                    status: LoadStatus::Missing,
                });
            }
            Err(err) => {
                return Err(FetchError::Storage {
                    path,
                    reason: format!("failed reading day file: {err}"),
                });
            }
        };

        match self.codec.decode(&bytes) {
            Ok(decoded) if decoded.encoding.is_canonical() => {
                debug!(
                    day = %day,
                    records = decoded.records.len(),
                    "loaded day file"
                );
                Ok(DayFileLoad {
                    day,
                    records: decoded.records,
                    status: LoadStatus::Canonical,
                })
            }
            Ok(decoded) => {
                info!(
                    day = %day,
                    path = %path.display(),
                    encoding = %decoded.encoding,
                    records = decoded.records.len(),
                    "loaded day file in legacy encoding"
                );
                let rewritten = rewrite_legacy && self.rewrite_canonical(&path, &decoded.records);
                Ok(DayFileLoad {
                    day,
                    records: decoded.records,
                    status: LoadStatus::Reencoded {
                        from: decoded.encoding,
                        rewritten,
                    },
                })
            }
            Err(err) => self.quarantine(day, &path, &err),
        }
    }

    /// Best-effort canonical rewrite; failures are logged and reported as `false`.
    fn rewrite_canonical(&self, path: &Path, records: &[Record]) -> bool {
        match self.write_records(path, records) {
            Ok(()) => {
                info!(path = %path.display(), "rewrote day file as utf-8");
                true
            }
            Err(err) => {
                error!(
                    path = %path.display(),
                    error = %err,
                    "failed to rewrite day file as utf-8"
                );
                false
            }
        }
    }

    fn quarantine(
        &self,
        day: DayKey,
        path: &Path,
        cause: &CodecError,
    ) -> Result<DayFileLoad, FetchError> {
        warn!(
            day = %day,
            path = %path.display(),
            error = %cause,
            "day file is corrupted, quarantining"
        );
        // Without a backup the bytes must stay where they are.
        let backup = quarantine_copy(path).map_err(|copy_err| FetchError::Corrupted {
            path: path.to_path_buf(),
            reason: format!("{cause}; quarantine copy failed: {copy_err}"),
        })?;
        info!(backup = %backup.display(), "created quarantine copy of corrupted day file");

        match self.write_records(path, &[]) {
            Ok(()) => info!(path = %path.display(), "replaced corrupted day file with empty file"),
            Err(err) => error!(
                path = %path.display(),
                error = %err,
                "failed to replace corrupted day file"
            ),
        }
        Ok(DayFileLoad {
            day,
            records: Vec::new(),
            status: LoadStatus::Quarantined { backup },
        })
    }

    fn write_records(&self, path: &Path, records: &[Record]) -> Result<(), FetchError> {
        let bytes = self.codec.encode(records)?;
        write_atomic(path, &bytes).map_err(|err| FetchError::Storage {
            path: path.to_path_buf(),
            reason: format!("failed writing day file: {err}"),
        })
    }
}

fn ensure_dir(dir: &Path) -> Result<(), FetchError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|err| FetchError::Storage {
        path: dir.to_path_buf(),
        reason: format!("failed creating storage directory: {err}"),
    })?;
    info!(dir = %dir.display(), "created storage directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;
    use tempfile::tempdir;

    fn day() -> DayKey {
        DayKey::from_ymd(2025, 3, 2).unwrap()
    }

    fn record(content: &str, datetime: &str) -> Record {
        let (date, time) = datetime.split_once(' ').unwrap_or((datetime, ""));
        Record::from_provider(
            format!("title {content}"),
            content.to_string(),
            date.to_string(),
            time.to_string(),
            "2025-03-02 12:00:00".to_string(),
        )
    }

    fn contents(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.content.as_str()).collect()
    }

    fn quarantine_files(dir: &Path) -> Vec<PathBuf> {
        list_files(dir, |name| name.contains(".corrupted."))
    }

    #[test]
    fn open_creates_directory_and_missing_day_reads_empty() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("data").join("news");
        let store = RecordStore::open(&dir).unwrap();
        assert!(dir.is_dir());

        let load = store.load(day()).unwrap();
        assert_eq!(load.status, LoadStatus::Missing);
        assert!(load.records.is_empty());
        assert!(!store.path_for(day()).exists());
    }

    #[test]
    fn merge_write_appends_and_sorts_newest_first() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();

        store
            .merge_write(
                day(),
                vec![
                    record("a", "2025-03-02 09:00:00"),
                    record("b", "2025-03-02 11:00:00"),
                ],
            )
            .unwrap();
        let summary = store
            .merge_write(
                day(),
                vec![
                    record("c", "2025-03-02 10:00:00"),
                    record("d", "2025-03-02 09:00:00"),
                ],
            )
            .unwrap();

        assert_eq!(summary.existing, 2);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.total, 4);
        let stored = store.read(day()).unwrap();
        assert_eq!(contents(&stored), vec!["b", "c", "a", "d"]);
        assert!(
            stored
                .windows(2)
                .all(|pair| pair[0].datetime >= pair[1].datetime)
        );
    }

    #[test]
    fn legacy_encoding_is_rewritten_as_canonical_utf8() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let text = "[{\"title\": \"快讯\", \"content\": \"沪指高开\", \"datetime\": \"2025-03-02 09:31:00\"}]";
        let (gbk, _, _) = GBK.encode(text);
        fs::write(store.path_for(day()), &gbk).unwrap();

        let load = store.load(day()).unwrap();
        assert_eq!(
            load.status,
            LoadStatus::Reencoded {
                from: TextEncoding::Gbk,
                rewritten: true
            }
        );
        assert_eq!(load.records[0].content, "沪指高开");

        let bytes = fs::read(store.path_for(day())).unwrap();
        let on_disk = std::str::from_utf8(&bytes).unwrap();
        assert!(on_disk.contains("沪指高开"));
        assert_eq!(store.load(day()).unwrap().status, LoadStatus::Canonical);
    }

    #[test]
    fn corrupted_file_is_quarantined_once_and_replaced_with_empty_array() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let original = b"[{\"title\": \"cut off".to_vec();
        fs::write(store.path_for(day()), &original).unwrap();

        let load = store.load(day()).unwrap();
        assert!(load.records.is_empty());
        let LoadStatus::Quarantined { backup } = load.status else {
            panic!("expected quarantine, got {:?}", load.status);
        };
        assert_eq!(fs::read(&backup).unwrap(), original);
        assert_eq!(fs::read(store.path_for(day())).unwrap(), b"[]");

        assert!(store.read(day()).unwrap().is_empty());
        assert_eq!(quarantine_files(temp.path()), vec![backup]);
    }

    #[test]
    fn merge_over_corrupted_file_keeps_only_new_records() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        fs::write(store.path_for(day()), b"not json at all").unwrap();

        let summary = store
            .merge_write(day(), vec![record("fresh", "2025-03-02 09:00:00")])
            .unwrap();

        assert_eq!(summary.existing, 0);
        assert_eq!(contents(&store.read(day()).unwrap()), vec!["fresh"]);
        assert_eq!(quarantine_files(temp.path()).len(), 1);
    }

    #[test]
    fn list_day_files_ignores_quarantine_and_foreign_names() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let later = DayKey::from_ymd(2025, 3, 3).unwrap();
        for name in [
            "news_20250303.json",
            "news_20250302.json",
            "news_20250302.json.corrupted.1740900000",
            "news_20250302.json.tmp",
            "news_backup.json",
            "readme.md",
        ] {
            fs::write(temp.path().join(name), b"[]").unwrap();
        }

        let days: Vec<DayKey> = store
            .list_day_files()
            .into_iter()
            .map(|(day, _)| day)
            .collect();
        assert_eq!(days, vec![day(), later]);
    }

    #[test]
    fn unknown_fields_survive_a_merge() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        fs::write(
            store.path_for(day()),
            "[{\"content\": \"old\", \"datetime\": \"2025-03-02 08:00:00\", \"source\": \"cls\"}]",
        )
        .unwrap();

        store
            .merge_write(day(), vec![record("new", "2025-03-02 09:00:00")])
            .unwrap();

        let stored = store.read(day()).unwrap();
        assert_eq!(contents(&stored), vec!["new", "old"]);
        assert_eq!(
            stored[1].extra.get("source"),
            Some(&serde_json::Value::String("cls".into()))
        );
    }
}
