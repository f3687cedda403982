//! Heuristics that pull a link, platform and username out of a message.

use crate::types::Message;

/// Path segments on X/Twitter links that are never a username.
const NON_USERNAME_SEGMENTS: &[&str] = &[
    "",
    "https:",
    "http:",
    "twitter.com",
    "x.com",
    "www.twitter.com",
    "www.x.com",
    "mobile.twitter.com",
    "status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Telegram,
    X,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Telegram => "Telegram",
            Platform::X => "X",
        }
    }
}

/// Link metadata shown in a message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub url: String,
    pub platform: Option<Platform>,
    pub username: Option<String>,
}

impl SourceInfo {
    pub fn from_message(message: &Message) -> Option<Self> {
        let url = extract_url(message_source(message)?)?;
        Some(Self {
            url: url.to_string(),
            platform: platform_for(url),
            username: extract_username(url),
        })
    }
}

/// The first embed's "source" field, else the message text.
pub fn message_source(message: &Message) -> Option<&str> {
    message
        .embeds
        .first()
        .and_then(|embed| embed.source_field())
        .map(|field| field.value.as_str())
        .filter(|value| !value.is_empty())
        .or_else(|| Some(message.content.as_str()))
        .filter(|value| !value.is_empty())
}

/// First URL-like substring: from `http` up to a space, newline, `)` or the end.
pub fn extract_url(text: &str) -> Option<&str> {
    let start = text.find("http")?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| matches!(c, ' ' | '\n' | ')'))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

pub fn platform_for(url: &str) -> Option<Platform> {
    let url = url.to_lowercase();
    if url.contains("t.me") {
        Some(Platform::Telegram)
    } else if url.contains("twitter.com") || url.contains("x.com") {
        Some(Platform::X)
    } else {
        None
    }
}

pub fn extract_username(url: &str) -> Option<String> {
    let username = if let Some((_, after)) = url.split_once("t.me/") {
        after.split('/').next()
    } else if url.contains("twitter.com/") || url.contains("x.com/") {
        url.split('/')
            .find(|segment| !NON_USERNAME_SEGMENTS.contains(segment))
    } else {
        None
    };

    username
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Avatar for the message header: the embed author's icon, else its thumbnail.
/// Proxied URLs are preferred.
pub fn profile_image(message: &Message) -> Option<&str> {
    let embed = message.embeds.first()?;
    let author_icon = embed
        .author
        .as_ref()
        .and_then(|author| author.proxy_icon_url.as_deref().or(author.icon_url.as_deref()));
    let thumbnail = embed
        .thumbnail
        .as_ref()
        .and_then(|thumb| thumb.proxy_url.as_deref().or(thumb.url.as_deref()));
    author_icon.or(thumbnail)
}
