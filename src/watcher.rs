use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::alert::{AlertSinks, CaptchaAlert};
use crate::config::WatchConfig;
use crate::detect::{Detector, Verdict};
use crate::platform::MessageSource;

/// How a wait for captcha resolution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The channel no longer shows a captcha
    Resolved { waited: Duration },
    /// Gave up after the maximum wait; the captcha may still be pending
    TimedOut { waited: Duration },
}

fn minutes_seconds(d: Duration) -> (u64, u64) {
    (d.as_secs() / 60, d.as_secs() % 60)
}

/// Polls the channel, alerts on captchas and waits for them to clear
pub struct Watcher<S> {
    source: S,
    detector: Detector,
    alerts: AlertSinks,
    config: WatchConfig,
}

impl<S: MessageSource> Watcher<S> {
    pub fn new(source: S, detector: Detector, alerts: AlertSinks, config: WatchConfig) -> Self {
        Self {
            source,
            detector,
            alerts,
            config,
        }
    }

    /// Fetch the latest messages and look for a captcha
    pub async fn check(&self) -> Result<Option<Verdict>> {
        let messages = self.source.fetch_recent().await?;
        let verdict = self.detector.find(&messages);
        if let Some(v) = &verdict {
            debug!("Captcha message detected: {}", v.raw_text);
        }
        Ok(verdict)
    }

    /// Re-check every `check_interval` until the captcha is gone or
    /// `max_wait` has elapsed. A failed check counts as still pending.
    pub async fn wait_for_resolution(&self) -> Resolution {
        let start = Instant::now();
        let max_wait = self.config.max_wait();

        info!("PAUSED: Waiting for captcha to be resolved...");
        info!(
            "Will resume automatically in {} minutes if not resolved.",
            self.config.max_wait_minutes
        );
        info!("Complete the captcha in Discord to resume immediately.");

        loop {
            let pending = match self.check().await {
                Ok(verdict) => verdict.is_some(),
                Err(e) => {
                    warn!("Captcha check failed, assuming still pending: {:#}", e);
                    true
                }
            };
            let elapsed = start.elapsed();

            if !pending {
                let (m, s) = minutes_seconds(elapsed);
                info!("CAPTCHA RESOLVED! (waited {}m {}s) Resuming...", m, s);
                return Resolution::Resolved { waited: elapsed };
            }

            if elapsed >= max_wait {
                warn!(
                    "TIMEOUT: {} minutes reached. Resuming anyway (the captcha may still need completing)",
                    self.config.max_wait_minutes
                );
                return Resolution::TimedOut { waited: elapsed };
            }

            let remaining = max_wait - elapsed;
            debug!(
                "Captcha still active... ({}m remaining)",
                remaining.as_secs() / 60
            );
            tokio::time::sleep(self.config.check_interval().min(remaining)).await;
        }
    }

    /// One poll: on a captcha, fire every alert and block until it clears.
    /// Returns `None` when there was nothing to wait for. Fetch errors are
    /// logged and treated as "no captcha".
    pub async fn poll_once(&self) -> Option<Resolution> {
        let verdict = match self.check().await {
            Ok(Some(verdict)) => verdict,
            Ok(None) => return None,
            Err(e) => {
                warn!("Captcha check failed: {:#}", e);
                return None;
            }
        };

        self.raise_alert(&verdict).await;
        Some(self.wait_for_resolution().await)
    }

    /// Fire every alert sink for `verdict`
    pub async fn raise_alert(&self, verdict: &Verdict) {
        warn!(
            "Captcha detected (matched \"{}\")",
            verdict.matched.as_deref().unwrap_or_default()
        );
        let delivered = self
            .alerts
            .fire_all(&CaptchaAlert::from_verdict(verdict))
            .await;
        debug!("Alert delivered through {} sink(s)", delivered);
    }

    /// Poll every `poll_interval` until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Watching channel every {}s (sinks: {})",
            self.config.poll_interval_secs,
            self.alerts.names().join(", ")
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down watcher");
                    return;
                }
                _ = async {
                    match self.poll_once().await {
                        Some(Resolution::Resolved { waited }) => {
                            debug!("Back to polling after {}s", waited.as_secs())
                        }
                        Some(Resolution::TimedOut { waited }) => {
                            debug!("Back to polling after timeout ({}s)", waited.as_secs())
                        }
                        None => {}
                    }
                    tokio::time::sleep(self.config.poll_interval()).await;
                } => {}
            }
        }
    }
}
