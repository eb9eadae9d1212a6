use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, REFERER, USER_AGENT};
use tracing::debug;

use super::{Message, MessageSource};
use crate::config::DiscordConfig;

/// Reads recent messages from one channel over the Discord REST API
pub struct DiscordClient {
    client: reqwest::Client,
    messages_url: String,
    limit: u32,
}

/// Build the request headers for the Discord API
fn build_headers(config: &DiscordConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
    );
    let mut auth = HeaderValue::from_str(&config.token).context("Invalid Discord token")?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(
        REFERER,
        HeaderValue::from_str(&config.effective_channel_url()).context("Invalid channel URL")?,
    );
    Ok(headers)
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(build_headers(config)?)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            messages_url: config.messages_url(),
            limit: config.fetch_limit,
        })
    }
}

#[async_trait]
impl MessageSource for DiscordClient {
    async fn fetch_recent(&self) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(&self.messages_url)
            .query(&[("limit", self.limit)])
            .send()
            .await
            .context("Failed to send request to Discord")?;

        let status = response.status();
        debug!("Captcha check status={}", status);
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord API error ({}): {}", status, error_body);
        }

        let messages: Vec<Message> = response
            .json()
            .await
            .context("Failed to parse Discord messages response")?;

        debug!("Captcha check messages={}", messages.len());
        Ok(messages)
    }
}
