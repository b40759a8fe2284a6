//! Error types for devlog.
//!
//! Library crates use [`DevlogError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all devlog operations.
#[derive(Debug, thiserror::Error)]
pub enum DevlogError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the repository host.
    #[error("network error: {0}")]
    Network(String),

    /// Text generation backend error.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Structured input (commit log, API payload) did not match its schema.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Tag store or artifact persistence error.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing template variables, invalid keys, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DevlogError>;

impl DevlogError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a persistence error from any displayable message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single call to the text generation backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Backend unreachable, connection reset, or a 5xx response.
    #[error("backend unreachable: {0}")]
    Network(String),

    /// The request exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Backend throttled the request (HTTP 429).
    #[error("rate limited{}", retry_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Success status but the payload had no usable content field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Backend refused the request (4xx other than 429).
    #[error("request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

fn retry_suffix(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(" (retry after {s}s)"))
        .unwrap_or_default()
}

impl GenerationError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DevlogError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = DevlogError::validation("missing variables: readme");
        assert!(err.to_string().contains("readme"));
    }

    #[test]
    fn generation_error_wraps_into_devlog_error() {
        let err: DevlogError = GenerationError::Timeout("60s".into()).into();
        assert_eq!(err.to_string(), "generation error: request timed out: 60s");
    }

    #[test]
    fn rate_limited_display_includes_retry_after() {
        let err = GenerationError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited (retry after 30s)");

        let err = GenerationError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn only_rejections_are_final() {
        assert!(GenerationError::Network("reset".into()).is_retryable());
        assert!(GenerationError::Timeout("60s".into()).is_retryable());
        assert!(GenerationError::MalformedResponse("no choices".into()).is_retryable());
        assert!(
            GenerationError::RateLimited {
                retry_after_secs: None
            }
            .is_retryable()
        );
        assert!(
            !GenerationError::Rejected {
                status: 401,
                body: "bad key".into()
            }
            .is_retryable()
        );
    }
}
