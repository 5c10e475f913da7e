//! Error types for currichef.
//!
//! Library crates use [`ChefError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all currichef operations.
#[derive(Debug, thiserror::Error)]
pub enum ChefError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transient network error (connection reset, timeout). Retried with
    /// fixed backoff; the single affected item is abandoned afterwards.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status. Logged and the item is skipped, no retry.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A registered menu entry was never linked to a section.
    /// Fatal for the current collection only.
    #[error("menu entry '{entry}' is not linked to a section")]
    IncompleteMenu { entry: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Archive (zip) writing error.
    #[error("archive error: {0}")]
    Archive(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChefError>;

impl ChefError {
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

    /// True for errors worth retrying with a fixed backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ChefError::config("missing base URL");
        assert_eq!(err.to_string(), "config error: missing base URL");

        let err = ChefError::IncompleteMenu {
            entry: "background".into(),
        };
        assert!(err.to_string().contains("background"));

        let err = ChefError::Http {
            url: "https://example.com/x".into(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn transient_classification() {
        assert!(ChefError::Network("reset".into()).is_transient());
        assert!(
            !ChefError::Http {
                url: "u".into(),
                status: 500
            }
            .is_transient()
        );
    }
}
