use std::process::Command;
use tracing::debug;

use crate::errors::FetchError;
use crate::source::{NewsProvider, RawItem, parse_rows};
use crate::types::ProviderId;

/// Runs an external command whose stdout is a JSON array of rows.
///
/// A nonzero exit status or unparsable stdout fails the cycle. The command
/// runs to completion; bounding its runtime is left to the command itself.
pub struct CommandProvider {
    id: ProviderId,
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    /// Create a provider running `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            id: "command".to_string(),
            program: program.into(),
            args,
        }
    }

    /// Override the provider id.
    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }
}

impl NewsProvider for CommandProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        debug!(program = %self.program, args = ?self.args, "running provider command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| FetchError::ProviderUnavailable {
                provider: self.id.clone(),
                reason: format!("failed to run '{}': {err}", self.program),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::ProviderUnavailable {
                provider: self.id.clone(),
                reason: format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }
        parse_rows(&self.id, &output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandProvider {
        CommandProvider::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn parses_stdout_rows() {
        let rows = sh("printf '[{\"content\": \"c1\"}, {\"content\": \"c2\"}]'")
            .fetch()
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_stdout_is_an_empty_batch() {
        assert!(sh("true").fetch().unwrap().is_empty());
    }

    #[test]
    fn nonzero_exit_is_a_provider_failure_with_stderr() {
        let err = sh("echo upstream timeout >&2; exit 3")
            .with_id("cls")
            .fetch()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("provider 'cls' is unavailable"));
        assert!(message.contains("upstream timeout"));
    }

    #[test]
    fn missing_program_is_a_provider_failure() {
        let err = CommandProvider::new("/nonexistent/wirefeed-provider", Vec::new())
            .fetch()
            .unwrap_err();
        assert!(matches!(err, FetchError::ProviderUnavailable { .. }));
    }
}
