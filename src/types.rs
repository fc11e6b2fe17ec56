use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// One SMS row returned by the panel's data endpoint.
///
/// Immutable once fetched. Records are never persisted; only the
/// [`DedupKey`] derived from them is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: String,
    pub source_number: String,
    pub service: String,
    pub message_body: String,
}

impl Record {
    /// Key identifying this record's number together with an extracted code.
    #[must_use]
    pub fn dedup_key(&self, code: &str) -> DedupKey {
        DedupKey::new(&self.source_number, code)
    }
}

/// `"<number>|<code>"` pair recorded in the ledger once delivered.
///
/// A key committed to the ledger is never notified again for the lifetime
/// of the ledger file.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    #[must_use]
    pub fn new(source_number: &str, code: &str) -> Self {
        Self(format!("{source_number}|{code}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Panel login credentials.
///
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
