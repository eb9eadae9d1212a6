mod alert;
mod config;
mod detect;
mod platform;
mod watcher;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::alert::AlertSinks;
use crate::config::Config;
use crate::detect::{Detector, KeywordSet};
use crate::platform::discord::DiscordClient;
use crate::watcher::Watcher;

/// Exit status for `--once` when a captcha is present
const EXIT_CAPTCHA: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,captcha_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut once = false;
    let mut config_path = PathBuf::from("config.toml");
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            _ => config_path = PathBuf::from(arg),
        }
    }

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let detector = Detector::new(KeywordSet::with_extra(&config.alert.extra_keywords));
    let alerts = AlertSinks::detect(&config.alert);

    info!("Configuration loaded successfully");
    info!("  Channel: {}", config.discord.channel_id);
    info!("  Keywords: {:?}", detector.keywords().phrases());
    info!("  Alert sinks: {}", alerts.names().join(", "));

    let source = DiscordClient::new(&config.discord)?;
    let watcher = Watcher::new(source, detector, alerts, config.watch.clone());

    if once {
        return match watcher.check().await? {
            Some(verdict) => {
                watcher.raise_alert(&verdict).await;
                Ok(ExitCode::from(EXIT_CAPTCHA))
            }
            None => {
                info!("No captcha in the latest messages");
                Ok(ExitCode::SUCCESS)
            }
        };
    }

    watcher
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(ExitCode::SUCCESS)
}
