use crate::channels::{find_matching_channel, sort_channels};
use crate::digest::{SidebarWidth, SummaryHistory};
use crate::session::{FeedOutcome, FeedSession};
use crate::traits::{FeedRenderer, MessageSource};
use crate::types::{normalize_hours, Channel, ClientConfig, FeedError, Result, Summary};
use tracing::{error, info, warn};

/// Everything the dashboard shows, owned in one place and changed only
/// through the methods below.
pub struct Dashboard<S: MessageSource> {
    source: S,
    default_hours: u32,
    channels: Vec<Channel>,
    selected: Option<Channel>,
    session: FeedSession,
    summary: Option<Summary>,
    history: SummaryHistory,
    sidebar: SidebarWidth,
}

impl<S: MessageSource> Dashboard<S> {
    pub fn new(source: S, config: &ClientConfig) -> Self {
        Self {
            source,
            default_hours: normalize_hours(config.default_hours),
            channels: Vec::new(),
            selected: None,
            session: FeedSession::new(config.window_size),
            summary: None,
            history: SummaryHistory::new(),
            sidebar: SidebarWidth::default(),
        }
    }

    /// Fetch the channel list once and keep it in display order.
    pub async fn load_channels(&mut self) -> Result<&[Channel]> {
        let mut channels = self.source.channels().await.map_err(|e| {
            error!("Failed to fetch channels: {}", e);
            e
        })?;
        sort_channels(&mut channels);
        info!("Loaded {} channels", channels.len());
        self.channels = channels;
        Ok(&self.channels)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Select by id or by a fragment of the name.
    pub fn select_channel(&mut self, query: &str) -> Result<&Channel> {
        let channel = find_matching_channel(&self.channels, query)
            .cloned()
            .ok_or_else(|| FeedError::ChannelNotFound {
                query: query.to_string(),
            })?;
        info!("Selected channel {} ({})", channel.name, channel.id);
        Ok(self.selected.insert(channel))
    }

    pub fn selected_channel(&self) -> Option<&Channel> {
        self.selected.as_ref()
    }

    fn selected_id(&self) -> Result<String> {
        self.selected
            .as_ref()
            .map(|channel| channel.id.clone())
            .ok_or(FeedError::NoChannelSelected)
    }

    /// Stream the selected channel into the feed, rendering as batches arrive.
    pub async fn load_news(&mut self, hours: Option<u32>, renderer: &mut dyn FeedRenderer) -> Result<FeedOutcome> {
        let channel_id = self.selected_id()?;
        let hours = normalize_hours(hours.unwrap_or(self.default_hours));

        let mut stream = self.source.stream(&channel_id, hours);
        let outcome = self.session.run(&mut stream, renderer).await;
        log_outcome(&channel_id, &outcome);
        Ok(outcome)
    }

    /// Fetch the selected channel in one request.
    pub async fn load_news_batch(&mut self, hours: Option<u32>, renderer: &mut dyn FeedRenderer) -> Result<FeedOutcome> {
        let channel_id = self.selected_id()?;
        let hours = normalize_hours(hours.unwrap_or(self.default_hours));

        self.session.begin();
        let messages = match self.source.scrape(&channel_id, hours).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Scrape of channel {} failed: {}", channel_id, e);
                self.session.fail(e.to_string());
                return Err(e);
            }
        };

        let outcome = self.session.ingest_all(messages, renderer)?;
        log_outcome(&channel_id, &outcome);
        Ok(outcome)
    }

    pub fn load_more(&mut self, renderer: &mut dyn FeedRenderer) -> usize {
        self.session.load_more(renderer)
    }

    /// Summarize the visible window and record it in the history.
    pub async fn summarize(&mut self) -> Result<&Summary> {
        let messages = self.session.aggregator().visible_messages();
        if messages.is_empty() {
            return Err(FeedError::NothingToSummarize);
        }

        let text = self.source.summarize(&messages).await.map_err(|e| {
            warn!("Summary request failed: {}", e);
            e
        })?;

        let channel_name = self
            .selected
            .as_ref()
            .map(|channel| channel.name.clone())
            .unwrap_or_default();
        let summary = Summary::new(text, channel_name);
        self.history.record(summary.clone());
        Ok(self.summary.insert(summary))
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn history(&self) -> &SummaryHistory {
        &self.history
    }

    /// Show a past summary again.
    pub fn select_summary(&mut self, index: usize) -> Option<&Summary> {
        let summary = self.history.get(index)?.clone();
        Some(self.summary.insert(summary))
    }

    pub fn resize_sidebar(&mut self, position: u32) -> bool {
        self.sidebar.resize_to(position)
    }

    pub fn sidebar(&self) -> SidebarWidth {
        self.sidebar
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }
}

fn log_outcome(channel_id: &str, outcome: &FeedOutcome) {
    match outcome {
        FeedOutcome::Completed { total } => info!("Channel {}: {} messages", channel_id, total),
        FeedOutcome::Empty => info!("Channel {}: no messages in timeframe", channel_id),
        FeedOutcome::Failed { error, total } => {
            warn!("Channel {}: failed after {} messages: {}", channel_id, total, error)
        }
        FeedOutcome::Stopped { total } => info!("Channel {}: stopped after {} messages", channel_id, total),
    }
}
