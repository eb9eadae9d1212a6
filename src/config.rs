use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// User token sent verbatim in the `Authorization` header
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel_id: String,
    /// Sent as `Referer`; derived from `channel_id` when empty
    #[serde(default)]
    pub channel_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            channel_url: String::new(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl DiscordConfig {
    /// Returns the effective channel URL: the configured one, or the
    /// canonical web URL for the channel.
    pub fn effective_channel_url(&self) -> String {
        if !self.channel_url.is_empty() {
            return self.channel_url.clone();
        }
        format!("https://discord.com/channels/@me/{}", self.channel_id)
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/channels/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.channel_id
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Delay between regular polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Delay between re-checks while a captcha is pending
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Give up waiting for resolution after this long and resume anyway
    #[serde(default = "default_max_wait_minutes")]
    pub max_wait_minutes: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            check_interval_secs: default_check_interval_secs(),
            max_wait_minutes: default_max_wait_minutes(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub desktop: bool,
    #[serde(default = "default_beep_count")]
    pub beep_count: u32,
    /// Phrases appended to the built-in keyword list
    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound: true,
            desktop: true,
            beep_count: default_beep_count(),
            extra_keywords: Vec::new(),
        }
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/119.0.6045.105 Safari/537.36"
        .to_string()
}

fn default_fetch_limit() -> u32 {
    1
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_check_interval_secs() -> u64 {
    30
}

/// One year
const MAX_WAIT_MINUTES_LIMIT: u64 = 60 * 24 * 365;

fn default_max_wait_minutes() -> u64 {
    60 * 24
}

fn default_beep_count() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// A missing file is not an error: everything required can come from
    /// `DISCORD_TOKEN`, `CHANNEL_ID` and `CHANNEL_URL`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading overrides through `lookup`
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment values win over file values; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(channel_id) = get("CHANNEL_ID") {
            self.discord.channel_id = channel_id;
        }
        if let Some(channel_url) = get("CHANNEL_URL") {
            self.discord.channel_url = channel_url;
        }

        self.discord.token = self.discord.token.trim().to_string();
        self.discord.channel_id = self.discord.channel_id.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord.token.is_empty() {
            anyhow::bail!(
                "Discord token not found: set DISCORD_TOKEN or add `token` under [discord]"
            );
        }
        if self.discord.channel_id.is_empty() {
            anyhow::bail!(
                "Channel not configured: set CHANNEL_ID or add `channel_id` under [discord]"
            );
        }
        if self.discord.fetch_limit == 0 || self.discord.fetch_limit > 100 {
            anyhow::bail!(
                "fetch_limit must be between 1 and 100, got {}",
                self.discord.fetch_limit
            );
        }
        if self.watch.check_interval_secs == 0 || self.watch.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs and check_interval_secs must be non-zero");
        }
        if self.watch.max_wait_minutes > MAX_WAIT_MINUTES_LIMIT {
            anyhow::bail!(
                "max_wait_minutes must be at most {} (one year), got {}",
                MAX_WAIT_MINUTES_LIMIT,
                self.watch.max_wait_minutes
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.discord.api_base, "https://discord.com/api/v9");
        assert_eq!(config.discord.fetch_limit, 1);
        assert_eq!(config.watch.check_interval_secs, 30);
        assert_eq!(config.watch.max_wait_minutes, 1440);
        assert!(config.alert.sound);
        assert!(config.alert.desktop);
        assert_eq!(config.alert.beep_count, 3);
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
            [discord]
            token = "abc"
            channel_id = "123"
            fetch_limit = 5

            [watch]
            poll_interval_secs = 10
            max_wait_minutes = 2

            [alert]
            desktop = false
            extra_keywords = ["Solve the puzzle"]
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.fetch_limit, 5);
        assert_eq!(config.watch.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.watch.max_wait(), Duration::from_secs(120));
        assert!(!config.alert.desktop);
        assert_eq!(config.alert.extra_keywords, vec!["Solve the puzzle"]);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse(
            r#"
            [discord]
            token = "from-file"
            channel_id = "1"
            "#,
        )
        .unwrap();

        let vars = env(&[("DISCORD_TOKEN", "  from-env \n"), ("CHANNEL_ID", "2")]);
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.discord.token, "from-env");
        assert_eq!(config.discord.channel_id, "2");
    }

    #[test]
    fn test_empty_env_does_not_override() {
        let mut config = Config::parse("[discord]\ntoken = \"keep\"").unwrap();
        let vars = env(&[("DISCORD_TOKEN", "   ")]);
        config.apply_overrides(|k| vars.get(k).cloned());
        assert_eq!(config.discord.token, "keep");
    }

    #[test]
    fn test_validate_requires_token_and_channel() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("DISCORD_TOKEN"));

        config.discord.token = "t".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("CHANNEL_ID"));

        config.discord.channel_id = "42".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_limit() {
        let mut config = Config::default();
        config.discord.token = "t".to_string();
        config.discord.channel_id = "42".to_string();
        config.discord.fetch_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_urls() {
        let discord = DiscordConfig {
            channel_id: "42".to_string(),
            api_base: "https://discord.com/api/v9/".to_string(),
            ..DiscordConfig::default()
        };
        assert_eq!(
            discord.messages_url(),
            "https://discord.com/api/v9/channels/42/messages"
        );
        assert_eq!(
            discord.effective_channel_url(),
            "https://discord.com/channels/@me/42"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[discord]\ntoken = \"t\"\nchannel_id = \"7\"").unwrap();

        let config = Config::load_with(file.path(), |_| None).unwrap();
        assert_eq!(config.discord.channel_id, "7");
        assert_eq!(config.discord.token, "t");
    }

    #[test]
    fn test_load_missing_file_uses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let vars = env(&[("DISCORD_TOKEN", "env-token"), ("CHANNEL_ID", "8")]);

        let config =
            Config::load_with(&dir.path().join("absent.toml"), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.discord.token, "env-token");
        assert_eq!(config.discord.channel_id, "8");
    }

    #[test]
    fn test_huge_max_wait_does_not_overflow() {
        let config = Config::parse("[watch]\nmax_wait_minutes = 9223372036854775807").unwrap();
        assert_eq!(config.watch.max_wait(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_validate_rejects_huge_max_wait() {
        let mut config = Config::parse(
            r#"
            [discord]
            token = "t"
            channel_id = "1"

            [watch]
            max_wait_minutes = 9223372036854775807
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_wait_minutes"));

        config.watch.max_wait_minutes = MAX_WAIT_MINUTES_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[discord\ntoken = ").unwrap();

        let err = Config::load_with(file.path(), |_| None).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}
