pub mod console;
pub mod desktop;
pub mod sound;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::future::join_all;
use tracing::{error, info};

use crate::config::AlertConfig;
use crate::detect::Verdict;

pub use console::ConsoleAlert;
pub use desktop::DesktopAlert;
pub use sound::SoundAlert;

pub const ALERT_TITLE: &str = "CAPTCHA DETECTED";
pub const ALERT_BODY: &str = "OwO Bot requires captcha verification!\nPlease check Discord.";

/// What the sinks are told about a detection
#[derive(Debug, Clone)]
pub struct CaptchaAlert {
    pub detected_at: DateTime<Local>,
    pub matched: String,
    pub excerpt: String,
}

impl CaptchaAlert {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            detected_at: Local::now(),
            matched: verdict.matched.clone().unwrap_or_default(),
            excerpt: verdict.raw_text.clone(),
        }
    }
}

/// A way of getting the user's attention
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;
    async fn fire(&self, alert: &CaptchaAlert) -> Result<()>;
}

/// Every sink applicable on this machine; all of them fire on each alert
pub struct AlertSinks {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertSinks {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    /// Pick sinks based on config and what the platform supports. The
    /// console sink is always present.
    pub fn detect(config: &AlertConfig) -> Self {
        let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();

        if config.sound {
            match SoundAlert::detect(config.beep_count) {
                Some(sink) => sinks.push(Box::new(sink)),
                None => info!("Sound alerts unavailable: stdout is not a terminal"),
            }
        }

        if config.desktop {
            match DesktopAlert::detect() {
                Some(sink) => sinks.push(Box::new(sink)),
                None => info!("Desktop notifications unavailable: no notifier found on PATH"),
            }
        }

        sinks.push(Box::new(ConsoleAlert));
        Self { sinks }
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Fire all sinks concurrently. Returns how many succeeded.
    pub async fn fire_all(&self, alert: &CaptchaAlert) -> usize {
        let results = join_all(self.sinks.iter().map(|sink| async move {
            let result = sink.fire(alert).await;
            (sink.name(), result)
        }))
        .await;

        let mut delivered = 0;
        for (name, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => error!("Alert sink '{}' failed: {:#}", name, e),
            }
        }
        delivered
    }
}
