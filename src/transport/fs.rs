use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::constants::storage::{QUARANTINE_MARKER, TEMP_SUFFIX};

/// Replace `path` with `bytes` so readers never observe a partial file.
///
/// Writes a sibling temp file, fsyncs it, renames it over `path`, then
/// best-effort fsyncs the parent directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = sibling_with_suffix(path, TEMP_SUFFIX);
    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return result;
    }
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
        && let Err(sync_err) = dir.sync_all()
    {
        warn!(
            dir = %parent.display(),
            error = %sync_err,
            "directory fsync failed after atomic replace"
        );
    }
    Ok(())
}

/// Copy `path` aside as `{path}.corrupted.{unix_seconds}` and return the copy's path.
///
/// A numeric suffix is appended when a copy for the same second already exists,
/// so an earlier quarantine copy is never overwritten.
pub fn quarantine_copy(path: &Path) -> io::Result<PathBuf> {
    let base = sibling_with_suffix(path, &format!("{QUARANTINE_MARKER}.{}", unix_timestamp_secs()));
    let mut target = base.clone();
    let mut attempt = 1u32;
    while target.exists() {
        target = sibling_with_suffix(&base, &attempt.to_string());
        attempt += 1;
    }
    fs::copy(path, &target)?;
    Ok(target)
}

/// Regular files directly under `root` accepted by `keep`, sorted by path.
///
/// A missing or unreadable root yields an empty list.
pub fn list_files<F>(root: &Path, mut keep: F) -> Vec<PathBuf>
where
    F: FnMut(&str) -> bool,
{
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(&mut keep))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Seconds since the Unix epoch.
pub fn unix_timestamp_secs() -> i64 {
    Utc::now().timestamp()
}

/// `{path}.{suffix}` without touching the existing extension.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
