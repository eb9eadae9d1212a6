use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::{AlertSink, CaptchaAlert, ALERT_TITLE};

/// Banner on stdout plus a warning log line. Works everywhere.
pub struct ConsoleAlert;

pub(crate) fn banner(alert: &CaptchaAlert) -> String {
    let rule = "=".repeat(50);
    format!(
        "\n{rule}\n{title}\n  at {time}  (matched \"{matched}\")\n{rule}\n",
        rule = rule,
        title = format!("!! {} !!", ALERT_TITLE).repeat(3),
        time = alert.detected_at.format("%Y-%m-%d %H:%M:%S"),
        matched = alert.matched,
    )
}

#[async_trait]
impl AlertSink for ConsoleAlert {
    fn name(&self) -> &str {
        "console"
    }

    async fn fire(&self, alert: &CaptchaAlert) -> Result<()> {
        warn!("Captcha message detected: {}", alert.excerpt);
        println!("{}", banner(alert));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_banner_contents() {
        let alert = CaptchaAlert {
            detected_at: Local.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            matched: "owobot.com/captcha".to_string(),
            excerpt: String::new(),
        };
        let text = banner(&alert);
        assert!(text.contains("CAPTCHA DETECTED"));
        assert!(text.contains("2026-03-01 12:30:00"));
        assert!(text.contains("\"owobot.com/captcha\""));
        assert_eq!(text.matches(&"=".repeat(50)).count(), 2);
    }
}
