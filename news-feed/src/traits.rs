use crate::aggregator::FeedItem;
use crate::session::ScrapeStream;
use crate::types::{Channel, Message, Result};
use async_trait::async_trait;

/// Backend that lists channels, scrapes their messages and summarizes them.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Channels available for scraping, in server order
    async fn channels(&self) -> Result<Vec<Channel>>;

    /// Fetch every message in the lookback window as one batch.
    /// Any undecodable delivery fails the whole request.
    async fn scrape(&self, channel_id: &str, hours: u32) -> Result<Vec<Message>>;

    /// Open a push connection delivering batches until a terminal event
    fn stream(&self, channel_id: &str, hours: u32) -> ScrapeStream;

    /// Ask the backend for a summary of the given messages
    async fn summarize(&self, messages: &[Message]) -> Result<String>;
}

/// Receives the visible window whenever the feed changes.
pub trait FeedRenderer {
    fn render(&mut self, visible: &[FeedItem], total: usize) -> Result<()>;

    /// Informational notices such as an empty result.
    fn notice(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}
