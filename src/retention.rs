use std::path::PathBuf;
use tracing::{error, info};

use crate::store::{LoadStatus, RecordStore};

/// Tally of one pass over every day file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Day files found in the storage directory.
    pub files: usize,
    /// Files that decoded as canonical UTF-8.
    pub healthy: usize,
    /// Files decoded in a legacy encoding (rewritten when possible).
    pub reencoded: usize,
    /// Files found corrupt, backed up and emptied.
    pub quarantined: usize,
    /// Files that could not be inspected at all.
    pub failed: usize,
    /// Backup copies created by this pass.
    pub quarantine_paths: Vec<PathBuf>,
}

/// Walks the storage directory and normalizes every day file through
/// [`RecordStore::load`].
pub struct RetentionScanner<'a> {
    store: &'a RecordStore,
}

impl<'a> RetentionScanner<'a> {
    /// Scanner over every day file in `store`.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Inspect every listed day file. A file that vanished between listing
    /// and loading counts as healthy.
    pub fn scan(&self) -> ScanReport {
        let files = self.store.list_day_files();
        info!(
            dir = %self.store.dir().display(),
            files = files.len(),
            "scanning day files"
        );
        let mut report = ScanReport {
            files: files.len(),
            ..ScanReport::default()
        };
        for (day, path) in files {
            match self.store.load(day) {
                Ok(load) => match load.status {
                    LoadStatus::Missing | LoadStatus::Canonical => report.healthy += 1,
                    LoadStatus::Reencoded { .. } => report.reencoded += 1,
                    LoadStatus::Quarantined { backup } => {
                        report.quarantined += 1;
                        report.quarantine_paths.push(backup);
                    }
                },
                Err(err) => {
                    report.failed += 1;
                    error!(path = %path.display(), error = %err, "failed to inspect day file");
                }
            }
        }
        info!(
            files = report.files,
            healthy = report.healthy,
            reencoded = report.reencoded,
            quarantined = report.quarantined,
            failed = report.failed,
            "day file scan finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_tallies_each_kind_of_file() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        fs::write(temp.path().join("news_20250301.json"), "[]").unwrap();
        let (gbk, _, _) = GBK.encode("[{\"content\": \"快讯\"}]");
        fs::write(temp.path().join("news_20250302.json"), &gbk).unwrap();
        fs::write(temp.path().join("news_20250303.json"), "[{\"content\"").unwrap();
        fs::write(temp.path().join("notes.json"), "garbage").unwrap();

        let report = RetentionScanner::new(&store).scan();
        assert_eq!(report.files, 3);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.reencoded, 1);
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.failed, 0);
        assert!(report.quarantine_paths[0].exists());

        let again = RetentionScanner::new(&store).scan();
        assert_eq!(again.healthy, 3);
        assert!(again.quarantine_paths.is_empty());
    }

    #[test]
    fn scan_of_empty_directory_is_empty() {
        let temp = tempdir().unwrap();
        let store = RecordStore::open(temp.path().join("fresh")).unwrap();
        assert_eq!(RetentionScanner::new(&store).scan(), ScanReport::default());
    }
}
