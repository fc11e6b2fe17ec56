use std::sync::LazyLock;

use regex::Regex;

// Alternation order is the priority: at any position a `123-456` token wins
// over a bare digit run.
static OTP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{3}-\d{3}|\d{4,6}").expect("valid OTP pattern"));

/// Extracts the one-time passcode from an SMS body.
///
/// The leftmost match in the body wins. Returns `None` when the body
/// carries nothing OTP-shaped.
#[must_use]
pub fn extract_otp(message_body: &str) -> Option<&str> {
    OTP_PATTERN.find(message_body).map(|m| m.as_str())
}
