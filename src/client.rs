use std::future::Future;
use std::time::Duration;

use time::PrimitiveDateTime;
use time::macros::datetime;
use url::Url;

use crate::error::{AuthError, FetchError};
use crate::session::Session;
use crate::types::{Credentials, Record};

/// Panel operations consumed by the poll loop.
///
/// [`PanelClient`] is the HTTP implementation; tests substitute scripted
/// fakes.
pub trait Panel: Send {
    /// Authenticate, refreshing the session in place on success.
    fn login(&mut self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Fetch the current snapshot of SMS records.
    fn fetch_records(&mut self) -> impl Future<Output = Result<Vec<Record>, FetchError>> + Send;
}

/// Date range selected by every data query.
///
/// The window is wide and fixed: each poll reads the newest rows inside it,
/// it is not advanced between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: PrimitiveDateTime,
    pub to: PrimitiveDateTime,
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self {
            from: datetime!(2025-04-25 00:00:00),
            to: datetime!(2099-12-31 23:59:59),
        }
    }
}

/// Panel endpoint and session configuration.
///
/// Credentials are the only required input; everything else has defaults
/// that match the panel's fixed layout.
///
/// ```rust,ignore
/// use sms_otp_relay::{Credentials, PanelConfig};
///
/// let config = PanelConfig::new(Credentials::new("agent", "secret"))
///     .with_base_url("http://panel.example.com".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PanelConfig {
    pub(crate) credentials: Credentials,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) window: FetchWindow,
    pub(crate) page_size: u32,
}

impl PanelConfig {
    pub const LOGIN_PAGE_PATH: &'static str = "/ints/login";
    pub const SIGN_IN_PATH: &'static str = "/ints/signin";
    pub const DATA_PATH: &'static str = "/ints/client/res/data_smscdr.php";

    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: "http://109.236.84.81"
                .parse()
                .expect("valid default URL"),
            timeout: Duration::from_secs(10),
            window: FetchWindow::default(),
            page_size: 25,
        }
    }

    /// Override the panel origin.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    /// Override the per-request timeout (default: 10 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the fixed query date range.
    #[must_use]
    pub fn with_window(mut self, window: FetchWindow) -> Self {
        self.window = window;
        self
    }

    /// Override the number of rows requested per poll (default: 25).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn window(&self) -> FetchWindow {
        self.window
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn login_page_url(&self) -> Url {
        self.endpoint(Self::LOGIN_PAGE_PATH)
    }

    #[must_use]
    pub fn sign_in_url(&self) -> Url {
        self.endpoint(Self::SIGN_IN_PATH)
    }

    #[must_use]
    pub fn data_url(&self) -> Url {
        self.endpoint(Self::DATA_PATH)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }
}

/// HTTP client for the SMS panel.
///
/// Owns the [`Session`]; login lives in [`crate::auth`], the data query in
/// [`crate::fetch`].
#[derive(Debug)]
pub struct PanelClient {
    pub(crate) config: PanelConfig,
    pub(crate) session: Session,
}

impl PanelClient {
    /// Create a client with a fresh, unauthenticated session.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(config: PanelConfig) -> Result<Self, reqwest::Error> {
        let session = Session::new(config.timeout)?;
        Ok(Self { config, session })
    }

    #[must_use]
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Panel for PanelClient {
    fn login(&mut self) -> impl Future<Output = Result<(), AuthError>> + Send {
        PanelClient::login(self)
    }

    fn fetch_records(&mut self) -> impl Future<Output = Result<Vec<Record>, FetchError>> + Send {
        PanelClient::fetch_records(self)
    }
}
