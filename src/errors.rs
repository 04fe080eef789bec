// Error types for the model-server boundary
//
// Everything else in the crate uses anyhow; model calls get a typed error so
// callers can tell a timeout from an unreachable server when they pick the
// placeholder to substitute.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Connection refused / DNS failure / server not running
    #[error("model server unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The call did not finish within the caller-supplied timeout
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Server answered with a non-success status
    #[error("model server returned {code}: {body}")]
    Status { code: u16, body: String },

    /// Reply body was not the JSON shape we expected
    #[error("could not decode model reply: {0}")]
    Decode(String),

    /// The `ollama` CLI failed to start or exited non-zero
    #[error("ollama process failed: {0}")]
    Process(String),
}

impl ModelError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout { .. })
    }

    /// Short reason string used in degraded placeholder records
    pub fn reason(&self) -> &'static str {
        match self {
            ModelError::Unreachable { .. } => "unreachable",
            ModelError::Timeout { .. } => "timeout",
            ModelError::Status { .. } => "bad_status",
            ModelError::Decode(_) => "bad_reply",
            ModelError::Process(_) => "process_error",
        }
    }
}

/// Message shown when a config file exists but cannot be parsed
pub fn config_parse_error(path: &str, detail: &str) -> String {
    format!(
        "Failed to parse configuration file {}:\n  {}\n\n\
         Fix the TOML syntax or delete the file to fall back to defaults.",
        path, detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(ModelError::Timeout { secs: 5 }.reason(), "timeout");
        assert!(ModelError::Timeout { secs: 5 }.is_timeout());
        assert!(!ModelError::Decode("x".into()).is_timeout());
        assert_eq!(
            ModelError::Status {
                code: 500,
                body: String::new()
            }
            .reason(),
            "bad_status"
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ModelError::Unreachable {
            url: "http://localhost:11434".into(),
            reason: "connection refused".into(),
        };
        let text = err.to_string();
        assert!(text.contains("localhost:11434"));
        assert!(text.contains("connection refused"));
    }
}
