use std::io::{IsTerminal, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{AlertSink, CaptchaAlert};

const BEEP_GAP: Duration = Duration::from_millis(300);

/// Rings the terminal bell a few times
pub struct SoundAlert {
    beeps: u32,
}

impl SoundAlert {
    pub fn new(beeps: u32) -> Self {
        Self { beeps }
    }

    /// Only available when stdout is attached to a terminal that can ring
    pub fn detect(beeps: u32) -> Option<Self> {
        (beeps > 0 && std::io::stdout().is_terminal()).then(|| Self::new(beeps))
    }

    async fn ring<W: Write + Send>(&self, out: &mut W) -> Result<()> {
        for i in 0..self.beeps {
            out.write_all(b"\x07").context("Failed to write bell")?;
            out.flush().context("Failed to flush bell")?;
            if i + 1 < self.beeps {
                tokio::time::sleep(BEEP_GAP).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for SoundAlert {
    fn name(&self) -> &str {
        "sound"
    }

    async fn fire(&self, _alert: &CaptchaAlert) -> Result<()> {
        self.ring(&mut std::io::stdout()).await
    }
}
