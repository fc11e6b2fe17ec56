//! Telegram Bot API notifier.
//!
//! Sends HTML-formatted messages through `sendMessage`, with action links
//! rendered as an inline keyboard (one button per row).

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use url::Url;

use crate::error::NotifyError;
use crate::notify::{ActionLink, Notifier};

/// Telegram notifier bound to one bot token.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: Url,
    bot_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    /// Create a notifier for `bot_token` whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: "https://api.telegram.org"
                .parse()
                .expect("valid default URL"),
            bot_token: bot_token.into(),
        })
    }

    /// Override the Bot API origin (self-hosted Bot API server or tests).
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    fn send_message_url(&self) -> Url {
        let mut url = self.api_url.clone();
        url.set_path(&format!("/bot{}/sendMessage", self.bot_token));
        url
    }

    /// JSON body for `sendMessage`.
    #[must_use]
    pub fn message_body(recipient: &str, text: &str, links: &[ActionLink]) -> JsonValue {
        let mut body = json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        if !links.is_empty() {
            let keyboard: Vec<JsonValue> = links
                .iter()
                .map(|link| json!([{ "text": link.label, "url": link.url }]))
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": keyboard });
        }
        body
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url.as_str())
            .field("bot_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        links: &[ActionLink],
    ) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.send_message_url())
            .json(&Self::message_body(recipient, text, links))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiReply>(&body)
            .ok()
            .and_then(|reply| reply.description)
            .unwrap_or(body);
        Err(NotifyError::Rejected {
            status,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_html_and_disables_previews() {
        let body = TelegramNotifier::message_body("-100123", "<b>hi</b>", &[]);
        assert_eq!(body["chat_id"], "-100123");
        assert_eq!(body["text"], "<b>hi</b>");
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["disable_web_page_preview"], true);
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn links_become_one_button_per_row() {
        let links = [
            ActionLink::new("Owner", "https://t.me/owner"),
            ActionLink::new("Backup", "https://t.me/backup"),
        ];
        let body = TelegramNotifier::message_body("1", "x", &links);
        let keyboard = body["reply_markup"]["inline_keyboard"].as_array().unwrap();

        assert_eq!(keyboard.len(), 2);
        assert_eq!(keyboard[0][0]["text"], "Owner");
        assert_eq!(keyboard[1][0]["url"], "https://t.me/backup");
    }

    #[test]
    fn send_message_url_embeds_token() {
        let notifier = TelegramNotifier::new("123:abc", Duration::from_secs(1)).unwrap();
        assert_eq!(
            notifier.send_message_url().as_str(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let notifier = TelegramNotifier::new("123:secret", Duration::from_secs(1)).unwrap();
        assert!(!format!("{notifier:?}").contains("secret"));
    }
}
