use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use time::OffsetDateTime;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Authenticated browsing state against the panel.
///
/// Wraps a cookie-storing HTTP client: a successful login updates the
/// stored cookies in place and every later request through the same
/// session carries them. Expiry is never predicted, only detected from
/// responses via [`Session::is_auth_failure`].
#[derive(Debug, Clone)]
pub struct Session {
    http: reqwest::Client,
    last_login: Option<OffsetDateTime>,
}

impl Session {
    /// Build a fresh, unauthenticated session.
    ///
    /// Every request made through the session is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            last_login: None,
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Time of the last successful login, if any.
    #[must_use]
    pub fn last_login(&self) -> Option<OffsetDateTime> {
        self.last_login
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.last_login.is_some()
    }

    /// Record a successful login and return how long the replaced
    /// session had been alive.
    pub(crate) fn mark_authenticated(&mut self) -> Option<time::Duration> {
        let now = OffsetDateTime::now_utc();
        self.last_login.replace(now).map(|previous| now - previous)
    }

    /// Whether a panel response means the session is no longer accepted.
    ///
    /// The panel answers expired sessions either with `403` or by serving
    /// (or redirecting to) its login surface.
    #[must_use]
    pub fn is_auth_failure(status: StatusCode, landed_on_login: bool, body: &str) -> bool {
        status == StatusCode::FORBIDDEN
            || landed_on_login
            || body.to_ascii_lowercase().contains("login")
    }
}
