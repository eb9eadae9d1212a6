pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// A channel message as returned by the chat API.
///
/// Every text surface is optional: `null`, missing keys and values of the
/// wrong type all deserialize to `None`, so a partially populated embed
/// never fails the whole batch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub embeds: Vec<Embed>,
}

/// Rich content attached to a message
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Embed {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub fields: Vec<EmbedField>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<EmbedAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EmbedField {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EmbedAuthor {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Deserialize an optional value, mapping anything that doesn't fit to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserialize a list, dropping it entirely if it isn't an array and
/// skipping individual entries that don't fit.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Supplies the most recent messages of the watched channel, in the order
/// the API returned them.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_recent(&self) -> Result<Vec<Message>>;
}
