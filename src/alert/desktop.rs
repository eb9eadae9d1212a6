use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{AlertSink, CaptchaAlert, ALERT_BODY, ALERT_TITLE};

const APP_NAME: &str = "OwO Bot";
const EXPIRE_MS: u32 = 10_000;

/// Which helper program delivers notifications on this platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notifier {
    /// freedesktop `notify-send`
    NotifySend,
    /// macOS `osascript`
    OsaScript,
    /// Windows PowerShell balloon tip
    PowerShell,
}

impl Notifier {
    fn program(self) -> &'static str {
        match self {
            Notifier::NotifySend => "notify-send",
            Notifier::OsaScript => "osascript",
            Notifier::PowerShell => "powershell",
        }
    }

    /// Candidates in preference order for the current OS
    fn candidates() -> &'static [Notifier] {
        if cfg!(target_os = "macos") {
            &[Notifier::OsaScript]
        } else if cfg!(windows) {
            &[Notifier::PowerShell]
        } else {
            &[Notifier::NotifySend]
        }
    }

    /// Program and arguments for one notification
    pub fn command_line(self, title: &str, body: &str) -> (&'static str, Vec<String>) {
        let args = match self {
            Notifier::NotifySend => vec![
                "--app-name".to_string(),
                APP_NAME.to_string(),
                "--urgency".to_string(),
                "critical".to_string(),
                "--expire-time".to_string(),
                EXPIRE_MS.to_string(),
                title.to_string(),
                body.to_string(),
            ],
            Notifier::OsaScript => vec![
                "-e".to_string(),
                format!(
                    "display notification {} with title {} sound name \"Glass\"",
                    applescript_quote(&body.replace('\n', " ")),
                    applescript_quote(title)
                ),
            ],
            Notifier::PowerShell => vec![
                "-NoProfile".to_string(),
                "-Command".to_string(),
                format!(
                    "Add-Type -AssemblyName System.Windows.Forms; \
                     $n = New-Object System.Windows.Forms.NotifyIcon; \
                     $n.Icon = [System.Drawing.SystemIcons]::Warning; \
                     $n.Visible = $true; \
                     $n.ShowBalloonTip({}, {}, {}, 'Warning'); \
                     Start-Sleep -Milliseconds {}; $n.Dispose()",
                    EXPIRE_MS,
                    powershell_quote(title),
                    powershell_quote(body),
                    EXPIRE_MS
                ),
            ],
        };
        (self.program(), args)
    }
}

fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Desktop notification through the platform's notifier program
pub struct DesktopAlert {
    notifier: Notifier,
    program: PathBuf,
}

impl DesktopAlert {
    pub fn detect() -> Option<Self> {
        Self::detect_with(|program| which::which(program).ok())
    }

    /// First candidate notifier that `resolve` can locate as a runnable program
    fn detect_with<F>(resolve: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        Notifier::candidates().iter().find_map(|&notifier| {
            resolve(notifier.program()).map(|program| Self { notifier, program })
        })
    }
}

#[async_trait]
impl AlertSink for DesktopAlert {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn fire(&self, _alert: &CaptchaAlert) -> Result<()> {
        let title = format!("\u{26A0}\u{FE0F} {}", ALERT_TITLE);
        let (_, args) = self.notifier.command_line(&title, ALERT_BODY);

        // The PowerShell balloon blocks until it expires, so don't wait on it
        if self.notifier == Notifier::PowerShell {
            Command::new(&self.program)
                .args(&args)
                .spawn()
                .with_context(|| format!("Failed to launch {}", self.program.display()))?;
            return Ok(());
        }

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !status.success() {
            anyhow::bail!("{} exited with {}", self.program.display(), status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_send_args() {
        let (program, args) = Notifier::NotifySend.command_line("Title", "Body");
        assert_eq!(program, "notify-send");
        assert_eq!(args[args.len() - 2], "Title");
        assert_eq!(args[args.len() - 1], "Body");
        assert!(args.contains(&"critical".to_string()));
    }

    #[test]
    fn test_osascript_escapes_quotes() {
        let (_, args) = Notifier::OsaScript.command_line("Say \"hi\"", "line one\nline two");
        assert_eq!(args[0], "-e");
        assert!(args[1].contains(r#"with title "Say \"hi\"""#));
        assert!(args[1].contains(r#""line one line two""#));
    }

    #[test]
    fn test_powershell_escapes_quotes() {
        let (_, args) = Notifier::PowerShell.command_line("It's", "Body");
        assert!(args[2].contains("'It''s'"));
    }

    #[cfg(unix)]
    /// Resolve `program` against `dir` only, the way `detect` does against PATH
    fn resolve_in(dir: &std::path::Path, program: &str) -> Option<PathBuf> {
        which::which_in(program, Some(dir), dir).ok()
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_non_executable_notifier() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify-send");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(resolve_in(dir.path(), "notify-send"), None);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(resolve_in(dir.path(), "notify-send"), Some(path));
    }

    #[test]
    fn test_detect_with_missing_notifier() {
        assert!(DesktopAlert::detect_with(|_| None).is_none());
    }

    #[test]
    fn test_detect_with_resolved_notifier() {
        let alert =
            DesktopAlert::detect_with(|program| Some(PathBuf::from("/opt/bin").join(program)))
                .unwrap();
        assert_eq!(alert.notifier, Notifier::candidates()[0]);
        assert!(alert.program.ends_with(alert.notifier.program()));
    }
}
