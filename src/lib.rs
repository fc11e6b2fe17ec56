#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod config;
pub mod country;
pub mod error;
pub mod fetch;
pub mod format;
pub mod ledger;
pub mod notify;
pub mod otp;
pub mod poller;
pub mod session;
#[cfg(feature = "telegram")]
pub mod telegram;
pub mod types;

// Re-exports for convenient access
pub use client::{FetchWindow, Panel, PanelClient, PanelConfig};
pub use config::RelayConfig;
pub use country::country_label;
pub use error::{AuthError, Error, FetchError, LedgerError, NotifyError};
pub use ledger::Ledger;
pub use notify::{ActionLink, Notifier};
pub use otp::extract_otp;
pub use poller::{CycleReport, DeliveryOrdering, LoopState, PollSettings, Poller};
pub use session::Session;
#[cfg(feature = "telegram")]
pub use telegram::TelegramNotifier;
pub use types::{Credentials, DedupKey, Record};
