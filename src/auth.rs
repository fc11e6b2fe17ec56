use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::REFERER;

use crate::client::PanelClient;
use crate::error::AuthError;

static CHALLENGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"What is (\d+) \+ (\d+)").expect("valid challenge pattern"));

/// Substrings (lowercase) that only appear once the member area is served.
const AUTHENTICATED_MARKERS: [&str; 2] = ["dashboard", "logout"];

/// Solves the arithmetic captcha embedded in the panel login page.
///
/// # Errors
///
/// Returns [`AuthError::ChallengeNotFound`] if the page has no
/// `What is <a> + <b>` phrase or the operands do not fit in a `u64` sum.
pub fn parse_challenge(page: &str) -> Result<u64, AuthError> {
    let caps = CHALLENGE_PATTERN
        .captures(page)
        .ok_or(AuthError::ChallengeNotFound)?;
    let a: u64 = caps[1].parse().map_err(|_| AuthError::ChallengeNotFound)?;
    let b: u64 = caps[2].parse().map_err(|_| AuthError::ChallengeNotFound)?;
    a.checked_add(b).ok_or(AuthError::ChallengeNotFound)
}

/// Whether a sign-in response shows the authenticated area.
#[must_use]
pub fn is_authenticated_page(body: &str) -> bool {
    let body = body.to_lowercase();
    AUTHENTICATED_MARKERS.iter().any(|marker| body.contains(marker))
}

impl PanelClient {
    /// Log in to the panel.
    ///
    /// Fetches the login page, solves its challenge and posts the
    /// credentials. On success the session cookies are updated in place.
    /// Nothing is retried here.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ChallengeNotFound`] without submitting anything
    /// if the login page has no challenge, [`AuthError::AuthFailed`] if the
    /// panel rejects the submission, or [`AuthError::Http`] on network
    /// failure.
    pub async fn login(&mut self) -> Result<(), AuthError> {
        let login_page_url = self.config.login_page_url();

        let page = self
            .session
            .http()
            .get(login_page_url.clone())
            .send()
            .await?
            .text()
            .await?;

        let answer = parse_challenge(&page).inspect_err(|_| {
            tracing::error!(url = %login_page_url, "Login challenge not found");
        })?;

        let answer = answer.to_string();
        let credentials = &self.config.credentials;
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("capt", answer.as_str()),
        ];

        let body = self
            .session
            .http()
            .post(self.config.sign_in_url())
            .header(REFERER, login_page_url.as_str())
            .form(&form)
            .send()
            .await?
            .text()
            .await?;

        if !is_authenticated_page(&body) {
            tracing::error!(username = %credentials.username, "Login failed");
            return Err(AuthError::AuthFailed);
        }

        match self.session.mark_authenticated() {
            Some(age) => tracing::info!(
                username = %credentials.username,
                session_age_secs = age.whole_seconds(),
                "Re-login successful"
            ),
            None => tracing::info!(username = %credentials.username, "Login successful"),
        }
        Ok(())
    }
}
