//! Error types for registry operations.

use thiserror::Error;

/// Result type alias using [`RegistryError`] as the error type.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while talking to the registry or the credential vault.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed or missing required input.
    #[error("Invalid input: {message}")]
    Validation {
        /// Error message.
        message: String,
    },

    /// No stored credentials, or the stored secret does not match.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message.
        message: String,
    },

    /// The credential store is unreachable or a query failed.
    #[error("Credential store error: {message}")]
    Persistence {
        /// Error message.
        message: String,
    },

    /// Encryption or decryption failed.
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message.
        message: String,
    },

    /// The remote API failed, returned a non-2xx status, or sent a malformed body.
    #[error("{}", upstream_display(.status, .message))]
    Upstream {
        /// HTTP status code, when one was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Missing or malformed configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },
}

fn upstream_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Upstream error from registry: {status} - {message}"),
        None => format!("Upstream error from registry: {message}"),
    }
}

impl RegistryError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates a crypto error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Creates an upstream error.
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns the upstream HTTP status, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else if err.is_decode() {
            format!("malformed response body: {err}")
        } else {
            err.to_string()
        };
        Self::Upstream { status, message }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Upstream {
            status: None,
            message: format!("malformed JSON: {err}"),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for RegistryError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Persistence {
            message: format!("database task failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_upstream_with_status() {
        let err = RegistryError::upstream(Some(404), "object not found");
        assert_eq!(
            err.to_string(),
            "Upstream error from registry: 404 - object not found"
        );
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_error_display_upstream_without_status() {
        let err = RegistryError::upstream(None, "connection reset");
        assert_eq!(
            err.to_string(),
            "Upstream error from registry: connection reset"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = RegistryError::authentication("invalid token");
        assert_eq!(err.to_string(), "Authentication failed: invalid token");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_json_error_is_upstream() {
        let err: RegistryError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RegistryError::Upstream { status: None, .. }));
    }

    #[test]
    fn test_sqlite_error_is_persistence() {
        let err: RegistryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RegistryError::Persistence { .. }));
    }
}
