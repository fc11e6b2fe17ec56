use std::process::ExitCode;

use sms_otp_relay::{Error, Ledger, PanelClient, Poller, RelayConfig, TelegramNotifier};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sms_otp_relay=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), Error> {
    let config = RelayConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let ledger = Ledger::load(&config.ledger_path)?;

    let mut notifier = TelegramNotifier::new(&config.bot_token, config.panel.timeout())?;
    if let Some(url) = config.telegram_api_url.clone() {
        notifier = notifier.with_api_url(url);
    }

    let panel = PanelClient::new(config.panel)?;
    let mut poller = Poller::new(panel, notifier, ledger, config.poll);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    poller.run(shutdown).await?;
    Ok(())
}
