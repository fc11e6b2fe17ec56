use std::path::PathBuf;
use std::time::Duration;

use time::PrimitiveDateTime;
use url::Url;

use crate::client::{FetchWindow, PanelConfig};
use crate::error::Error;
use crate::fetch::PANEL_DATE_FORMAT;
use crate::notify::ActionLink;
use crate::poller::{DeliveryOrdering, PollSettings};
use crate::types::Credentials;

/// Complete relay configuration.
///
/// Use [`from_env()`](RelayConfig::from_env) in the binary; tests build it
/// through [`from_lookup()`](RelayConfig::from_lookup).
#[derive(Clone)]
#[non_exhaustive]
pub struct RelayConfig {
    pub panel: PanelConfig,
    pub bot_token: String,
    pub telegram_api_url: Option<Url>,
    pub ledger_path: PathBuf,
    pub poll: PollSettings,
}

impl RelayConfig {
    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `PANEL_USERNAME`, `PANEL_PASSWORD`: panel credentials
    /// - `TELEGRAM_BOT_TOKEN`: bot token used for delivery
    /// - `TELEGRAM_CHAT_ID`: destination chat
    ///
    /// # Optional env vars
    /// - `PANEL_BASE_URL`: panel origin
    /// - `PANEL_FETCH_FROM`, `PANEL_FETCH_TO`: query window, `YYYY-MM-DD HH:MM:SS`
    /// - `HTTP_TIMEOUT_SECS`: per-request timeout for panel and Telegram (default 10)
    /// - `POLL_INTERVAL_SECS`: seconds between poll cycles (default 3)
    /// - `LEDGER_PATH`: delivered-OTP ledger file (default `already_sent.json`)
    /// - `MESSAGE_FOOTER`: HTML appended to every notification
    /// - `ACTION_LINKS`: comma-separated `label=url` buttons
    /// - `PERSIST_BEFORE_SEND`: `"1"` or `"true"` to flush the ledger before sending
    /// - `TELEGRAM_API_URL`: Bot API origin override
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or empty,
    /// or an optional one cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env()`](RelayConfig::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is required")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = Credentials::new(required("PANEL_USERNAME")?, required("PANEL_PASSWORD")?);
        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let chat_id = required("TELEGRAM_CHAT_ID")?;

        let mut panel = PanelConfig::new(credentials);
        if let Some(url) = optional("PANEL_BASE_URL") {
            panel = panel.with_base_url(parse_url("PANEL_BASE_URL", &url)?);
        }

        let mut window = FetchWindow::default();
        if let Some(from) = optional("PANEL_FETCH_FROM") {
            window.from = parse_datetime("PANEL_FETCH_FROM", &from)?;
        }
        if let Some(to) = optional("PANEL_FETCH_TO") {
            window.to = parse_datetime("PANEL_FETCH_TO", &to)?;
        }
        if window.from >= window.to {
            return Err(Error::Config(
                "PANEL_FETCH_FROM must be earlier than PANEL_FETCH_TO".into(),
            ));
        }
        panel = panel.with_window(window);

        if let Some(secs) = optional("HTTP_TIMEOUT_SECS") {
            panel = panel.with_timeout(parse_secs("HTTP_TIMEOUT_SECS", &secs)?);
        }

        let telegram_api_url = optional("TELEGRAM_API_URL")
            .map(|url| parse_url("TELEGRAM_API_URL", &url))
            .transpose()?;

        let mut poll = PollSettings::new(chat_id);
        if let Some(secs) = optional("POLL_INTERVAL_SECS") {
            poll = poll.with_interval(parse_secs("POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(footer) = optional("MESSAGE_FOOTER") {
            poll = poll.with_footer(footer);
        }
        if let Some(links) = optional("ACTION_LINKS") {
            poll = poll.with_links(parse_action_links(&links)?);
        }
        if matches!(optional("PERSIST_BEFORE_SEND").as_deref(), Some("1" | "true")) {
            poll = poll.with_ordering(DeliveryOrdering::PersistBeforeSend);
        }

        let ledger_path = optional("LEDGER_PATH")
            .map_or_else(|| PathBuf::from("already_sent.json"), PathBuf::from);

        Ok(Self {
            panel,
            bot_token,
            telegram_api_url,
            ledger_path,
            poll,
        })
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("panel", &self.panel)
            .field("bot_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("ledger_path", &self.ledger_path)
            .field("poll", &self.poll)
            .finish()
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}

fn parse_datetime(key: &str, value: &str) -> Result<PrimitiveDateTime, Error> {
    PrimitiveDateTime::parse(value.trim(), PANEL_DATE_FORMAT)
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, Error> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}

/// Parse `label=url,label=url` into action links.
fn parse_action_links(value: &str) -> Result<Vec<ActionLink>, Error> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (label, url) = item
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("ACTION_LINKS: expected label=url, got {item:?}")))?;
            let url = parse_url("ACTION_LINKS", url.trim())?;
            Ok(ActionLink::new(label.trim(), url.as_str()))
        })
        .collect()
}
