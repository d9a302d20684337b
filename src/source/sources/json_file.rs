use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::errors::FetchError;
use crate::source::{NewsProvider, RawItem, parse_rows};
use crate::types::ProviderId;

/// Reads a JSON array of rows from a file that an external job refreshes.
///
/// A missing file is an empty batch; unreadable or malformed content fails
/// the cycle.
pub struct JsonFileProvider {
    id: ProviderId,
    path: PathBuf,
}

impl JsonFileProvider {
    /// Create a provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: "json_file".to_string(),
            path: path.into(),
        }
    }

    /// Override the provider id.
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl NewsProvider for JsonFileProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        let payload = match fs::read(&self.path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "provider file does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(FetchError::ProviderUnavailable {
                    provider: self.id.clone(),
                    reason: format!("failed reading {}: {err}", self.path.display()),
                });
            }
        };
        parse_rows(&self.id, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn reads_rows_and_treats_missing_file_as_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rows.json");
        let provider = JsonFileProvider::new(&path).with_id("drop_box");
        assert_eq!(provider.id(), "drop_box");
        assert!(provider.fetch().unwrap().is_empty());

        fs::write(
            &path,
            "[{\"title\": \"t\", \"content\": \"c\", \"publish_date\": \"2025-03-02\"}]",
        )
        .unwrap();
        let rows = provider.fetch().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["publish_date"], json!("2025-03-02"));
    }

    #[test]
    fn malformed_file_is_a_provider_failure() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rows.json");
        fs::write(&path, "[{\"title\": ").unwrap();
        let err = JsonFileProvider::new(&path).fetch().unwrap_err();
        assert!(matches!(err, FetchError::ProviderUnavailable { .. }));
    }
}
