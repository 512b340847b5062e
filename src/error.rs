//! The public error type.
//!
//! Internally the crate works with `anyhow` and attaches context as errors bubble up. At the public
//! boundary, i.e. the command handlers, errors are converted into an [`Error`] that carries the
//! kind of failure so the caller can tell a login problem apart from a failed query.

use serde::{Deserialize, Serialize};

/// The result type used internally. Errors carry context but no classification.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The result type returned by public functions.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure. Used with [`IntoResult::pub_result`] to classify an internal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Bad credentials, a malformed token, or no session at all.
    Auth,
    /// The GraphQL request failed or returned something unusable.
    Query,
    /// Local failures: the home directory, the config file or the session store.
    Local,
}

serde_plain::derive_display_from_serialize!(ErrorType);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sign-in was rejected or the platform handed back something that is not a token. The reason
    /// is kept for diagnostics but never shown in place of the user-facing message.
    #[error("invalid credentials")]
    Auth { reason: String },

    /// A command needed a session and none was stored.
    #[error("not logged in, run `kood login` first")]
    NotLoggedIn,

    #[error("query failed: {0:#}")]
    Query(anyhow::Error),

    #[error("{0:#}")]
    Local(anyhow::Error),
}

impl Error {
    /// Creates an `Auth` error with a diagnostic `reason`.
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// The kind of failure this error represents.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Auth { .. } | Error::NotLoggedIn => ErrorType::Auth,
            Error::Query(_) => ErrorType::Query,
            Error::Local(_) => ErrorType::Local,
        }
    }

    /// Wraps an internal error as the given kind.
    pub fn new(error_type: ErrorType, e: anyhow::Error) -> Self {
        match error_type {
            ErrorType::Auth => Error::Auth {
                reason: format!("{e:#}"),
            },
            ErrorType::Query => Error::Query(e),
            ErrorType::Local => Error::Local(e),
        }
    }
}

/// Converts internal results into public ones at the command boundary.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn auth_error_hides_reason() {
        let e = Error::auth("token has 2 segments");
        assert_eq!(e.to_string(), "invalid credentials");
        assert_eq!(e.error_type(), ErrorType::Auth);
        match e {
            Error::Auth { reason } => assert!(reason.contains("2 segments")),
            _ => panic!("expected an auth error"),
        }
    }

    #[test]
    fn pub_result_classifies() {
        let r: Res<()> = Err(anyhow!("connection refused")).map_err(|e| e.context("fetching xp"));
        let e = r.pub_result(ErrorType::Query).unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Query);
        let message = e.to_string();
        assert!(message.starts_with("query failed"), "{message}");
        assert!(message.contains("connection refused"), "{message}");
    }

    #[test]
    fn not_logged_in_is_auth() {
        assert_eq!(Error::NotLoggedIn.error_type(), ErrorType::Auth);
        assert_eq!(ErrorType::Local.to_string(), "local");
    }
}
