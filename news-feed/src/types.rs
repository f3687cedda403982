use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;

/// Lookback windows the scrape endpoint accepts; anything else falls back to 24h.
pub const ALLOWED_HOURS: [u32; 5] = [6, 12, 24, 48, 72];
pub const DEFAULT_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub embeds: Vec<Embed>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Parse the ISO-8601 timestamp into an absolute point in time.
    ///
    /// Offsets are honoured; timestamps without one are taken as UTC.
    pub fn published_at(&self) -> Result<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Ok(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(self.timestamp.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| FeedError::InvalidTimestamp {
                id: self.id.clone(),
                value: self.timestamp.clone(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<EmbedImage>,
    pub author: Option<EmbedAuthor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn source_field(&self) -> Option<&EmbedField> {
        self.fields.iter().find(|field| field.is_source())
    }

    /// Fields shown to the reader; the "source" field is rendered as the link instead.
    pub fn display_fields(&self) -> impl Iterator<Item = &EmbedField> {
        self.fields.iter().filter(|field| !field.is_source())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: Option<String>,
    pub proxy_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: Option<String>,
    pub icon_url: Option<String>,
    pub proxy_icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EmbedField {
    pub fn is_source(&self) -> bool {
        self.name.eq_ignore_ascii_case("source")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Other,
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => AttachmentKind::Image,
            Some(ct) if ct.starts_with("video/") => AttachmentKind::Video,
            _ => AttachmentKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub channel_name: String,
}

impl Summary {
    pub fn new(text: String, channel_name: String) -> Self {
        Self {
            text,
            timestamp: Utc::now(),
            channel_name,
        }
    }
}

/// One unit delivered by the scrape transport.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Batch(Vec<Message>),
    /// A delivery that could not be decoded; later events are still processed.
    Malformed(String),
    Complete,
    Failed(String),
}

pub fn normalize_hours(hours: u32) -> u32 {
    if ALLOWED_HOURS.contains(&hours) {
        hours
    } else {
        DEFAULT_HOURS
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub connect_timeout_seconds: u64,
    /// Applies to the channel list and summarize calls; streams are not time-limited.
    pub request_timeout_seconds: u64,
    pub window_size: usize,
    pub default_hours: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            user_agent: "NewsNow/1.0".to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 120,
            window_size: 100,
            default_hours: DEFAULT_HOURS,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `NEWSNOW_API_URL`, `NEWSNOW_WINDOW_SIZE` and `NEWSNOW_HOURS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(api_url) = env::var("NEWSNOW_API_URL") {
            config.api_url = api_url;
        }

        if let Ok(value) = env::var("NEWSNOW_WINDOW_SIZE") {
            config.window_size = value
                .parse()
                .map_err(|_| FeedError::Config(format!("invalid NEWSNOW_WINDOW_SIZE: {}", value)))?;
        }

        if let Ok(value) = env::var("NEWSNOW_HOURS") {
            let hours: u32 = value
                .parse()
                .map_err(|_| FeedError::Config(format!("invalid NEWSNOW_HOURS: {}", value)))?;
            config.default_hours = normalize_hours(hours);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(FeedError::Config("window size must be at least 1".to_string()));
        }
        url::Url::parse(&self.api_url)?;
        Ok(())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Invalid timestamp '{value}' on message {id}")]
    InvalidTimestamp { id: String, value: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No channel selected")]
    NoChannelSelected,

    #[error("Channel not found: {query}")]
    ChannelNotFound { query: String },

    #[error("No visible messages to summarize")]
    NothingToSummarize,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
