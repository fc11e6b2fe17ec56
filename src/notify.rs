use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Labelled URL rendered as a button under a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    pub label: String,
    pub url: String,
}

impl ActionLink {
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Outbound delivery of formatted OTP messages.
///
/// `text` uses HTML markup. A delivery timeout must be reported as
/// [`NotifyError::Timeout`] rather than escalated.
///
/// # Example
///
/// ```rust,ignore
/// impl Notifier for StdoutNotifier {
///     async fn send(
///         &self,
///         recipient: &str,
///         text: &str,
///         links: &[ActionLink],
///     ) -> Result<(), NotifyError> {
///         println!("to {recipient}: {text} ({} links)", links.len());
///         Ok(())
///     }
/// }
/// ```
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        recipient: &str,
        text: &str,
        links: &[ActionLink],
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
