use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::client::Panel;
use crate::country::country_label;
use crate::error::{AuthError, FetchError, NotifyError};
use crate::format::render_otp_message;
use crate::ledger::Ledger;
use crate::notify::{ActionLink, Notifier};
use crate::otp::extract_otp;
use crate::types::Record;

/// When the ledger is flushed relative to the notification.
///
/// Either way the key is committed in memory before sending and is never
/// rolled back, so a failed send is not retried within the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryOrdering {
    /// Flush only after a successful send. A crash between send and flush
    /// re-delivers the OTP after restart.
    #[default]
    PersistAfterSend,
    /// Flush before sending. A failed send is then never retried, even
    /// after restart.
    PersistBeforeSend,
}

/// Poll loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Unauthenticated,
    Polling,
    /// Reached only when the initial login fails.
    Terminated,
}

/// Destination and pacing settings of the poll loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    recipient: String,
    interval: Duration,
    footer: Option<String>,
    links: Vec<ActionLink>,
    ordering: DeliveryOrdering,
}

impl PollSettings {
    /// Settings delivering to `recipient`, polling every 3 seconds.
    #[must_use]
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            interval: Duration::from_secs(3),
            footer: None,
            links: Vec::new(),
            ordering: DeliveryOrdering::default(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    #[must_use]
    pub fn with_links(mut self, links: Vec<ActionLink>) -> Self {
        self.links = links;
        self
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: DeliveryOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    #[must_use]
    pub fn links(&self) -> &[ActionLink] {
        &self.links
    }

    #[must_use]
    pub fn ordering(&self) -> DeliveryOrdering {
        self.ordering
    }
}

/// Outcome counters of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub without_otp: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub failed: usize,
    pub reauthenticated: bool,
}

/// Single-task orchestrator: login, then fetch → extract → dedup → notify.
///
/// Owns the panel session, the notifier and the ledger; nothing is shared,
/// so no locking is involved.
pub struct Poller<P, N> {
    panel: P,
    notifier: N,
    ledger: Ledger,
    settings: PollSettings,
    state: LoopState,
}

impl<P: Panel, N: Notifier> Poller<P, N> {
    #[must_use]
    pub fn new(panel: P, notifier: N, ledger: Ledger, settings: PollSettings) -> Self {
        Self {
            panel,
            notifier,
            ledger,
            settings,
            state: LoopState::Unauthenticated,
        }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn panel(&self) -> &P {
        &self.panel
    }

    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Perform the initial login.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the failed login; the poller is then
    /// [`LoopState::Terminated`] and must not be polled.
    pub async fn start(&mut self) -> Result<(), AuthError> {
        match self.panel.login().await {
            Ok(()) => {
                self.state = LoopState::Polling;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Initial login failed");
                self.state = LoopState::Terminated;
                Err(e)
            }
        }
    }

    /// Run one fetch-extract-dedup-notify pass. Never fails: every error is
    /// logged and turned into "nothing more to do this cycle".
    ///
    /// Does nothing unless the poller is [`LoopState::Polling`].
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        if self.state != LoopState::Polling {
            tracing::warn!(state = ?self.state, "Poll cycle skipped, poller is not polling");
            return report;
        }
        let records = self.fetch_with_reauth(&mut report).await;
        report.fetched = records.len();

        for record in &records {
            self.process_record(record, &mut report).await;
        }

        if report.delivered > 0 || report.failed > 0 {
            tracing::info!(
                fetched = report.fetched,
                delivered = report.delivered,
                failed = report.failed,
                duplicates = report.duplicates,
                "Poll cycle complete"
            );
        } else {
            tracing::debug!(fetched = report.fetched, duplicates = report.duplicates, "Poll cycle complete");
        }
        report
    }

    /// Log in, then poll at a fixed rate until `shutdown` resolves.
    ///
    /// Cycles start every [`PollSettings::interval`] regardless of how long
    /// the previous one took; a cycle overrunning the interval delays the
    /// next tick instead of bursting.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] if the initial login fails. After that the
    /// loop only ends through `shutdown`.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), AuthError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Checking for messages");
                    self.run_cycle().await;
                }
                () = &mut shutdown => {
                    tracing::info!(entries = self.ledger.len(), "Shutting down poll loop");
                    break;
                }
            }
        }

        if let Err(e) = self.ledger.persist() {
            tracing::error!(error = %e, "Final ledger flush failed");
        }
        Ok(())
    }

    /// Fetch once; on session expiry log in again and retry the fetch once.
    async fn fetch_with_reauth(&mut self, report: &mut CycleReport) -> Vec<Record> {
        match self.panel.fetch_records().await {
            Ok(records) => return records,
            Err(FetchError::SessionExpired) => {
                tracing::warn!("Session expired, logging in again");
            }
            Err(e) => {
                tracing::error!(error = %e, "Fetch failed");
                return Vec::new();
            }
        }

        if let Err(e) = self.panel.login().await {
            tracing::error!(error = %e, "Re-login failed, skipping cycle");
            return Vec::new();
        }
        report.reauthenticated = true;

        match self.panel.fetch_records().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Fetch failed after re-login");
                Vec::new()
            }
        }
    }

    async fn process_record(&mut self, record: &Record, report: &mut CycleReport) {
        let Some(otp) = extract_otp(&record.message_body) else {
            tracing::info!(message = %record.message_body, "No OTP found");
            report.without_otp += 1;
            return;
        };

        let key = record.dedup_key(otp);
        if self.ledger.contains(&key) {
            report.duplicates += 1;
            return;
        }
        self.ledger.commit(key);

        if self.settings.ordering == DeliveryOrdering::PersistBeforeSend {
            self.persist_ledger();
        }

        let text = render_otp_message(
            record,
            otp,
            country_label(&record.source_number),
            self.settings.footer(),
        );

        match self
            .notifier
            .send(&self.settings.recipient, &text, &self.settings.links)
            .await
        {
            Ok(()) => {
                if self.settings.ordering == DeliveryOrdering::PersistAfterSend {
                    self.persist_ledger();
                }
                tracing::info!(otp = %otp, number = %record.source_number, "Sent OTP");
                report.delivered += 1;
            }
            Err(NotifyError::Timeout) => {
                tracing::error!(otp = %otp, number = %record.source_number, "Notification timed out");
                report.failed += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, otp = %otp, number = %record.source_number, "Notification failed");
                report.failed += 1;
            }
        }
    }

    fn persist_ledger(&self) {
        if let Err(e) = self.ledger.persist() {
            tracing::error!(error = %e, "Ledger persist failed, keeping in-memory copy");
        }
    }
}
