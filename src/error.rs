use std::path::PathBuf;

/// Top-level error for bootstrapping the relay.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Login failures against the panel.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The login page did not embed the arithmetic challenge.
    #[error("Login challenge not found on login page")]
    ChallengeNotFound,

    /// Credentials were submitted but the panel did not show the member area.
    #[error("Login rejected by panel")]
    AuthFailed,

    #[error("HTTP error during login: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the authenticated data query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The panel no longer accepts the session cookies.
    #[error("Session expired")]
    SessionExpired,

    #[error("Unexpected status {0} from data endpoint")]
    Unexpected(u16),

    #[error("Malformed data response: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Delivery failures of a [`Notifier`](crate::notify::Notifier).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NotifyError {
    /// The destination did not answer within the client timeout.
    #[error("Notification timed out")]
    Timeout,

    #[error("Notification rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// Ledger load/persist failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("Ledger I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
