use crate::parser::{classify, EventStreamParser, SseEvent};
use crate::session::ScrapeStream;
use crate::traits::MessageSource;
use crate::types::{normalize_hours, Channel, ClientConfig, FeedError, FeedEvent, Message, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// HTTP client for the scrape/summarize backend.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: ClientConfig,
    base: Url,
}

impl Fetcher {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.api_url)?;
        if base.cannot_be_a_base() {
            return Err(FeedError::Config(format!("API URL cannot be a base: {}", base)));
        }

        // No overall timeout on the client: scrape streams stay open until the
        // server completes them. Short calls get a per-request timeout instead.
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config, base })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn scrape_request(&self, channel_id: &str, hours: u32) -> RequestBuilder {
        let hours = normalize_hours(hours);
        let mut url = self.endpoint(&["api", "scrape", channel_id]);
        url.query_pairs_mut().append_pair("hours", &hours.to_string());
        self.client.get(url)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_seconds)
    }

    pub async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        let start_time = Instant::now();
        let url = self.endpoint(&["api", "channels"]);
        debug!("Fetching channels from {}", url);

        let response = self.client.get(url).timeout(self.request_timeout()).send().await?;
        let response = check_status(response).await?;
        let channels: Vec<Channel> = serde_json::from_str(&response.text().await?)?;

        info!("Fetched {} channels in {}ms", channels.len(), start_time.elapsed().as_millis());
        Ok(channels)
    }

    /// Fetch the whole lookback window in one request.
    ///
    /// Accepts either a plain JSON array or a complete event stream; in the
    /// latter case every batch is concatenated and any malformed or error
    /// event fails the request.
    pub async fn scrape_batch(&self, channel_id: &str, hours: u32) -> Result<Vec<Message>> {
        let start_time = Instant::now();
        info!("Scraping channel {} ({}h, batch mode)", channel_id, normalize_hours(hours));

        let response = self.scrape_request(channel_id, hours).send().await?;
        let response = check_status(response).await?;
        let streamed = is_event_stream(&response);
        let body = response.text().await?;

        let messages = if streamed {
            collect_event_stream(body.as_bytes())?
        } else {
            serde_json::from_str(&body)?
        };

        info!(
            "Scraped {} messages from channel {} in {}ms",
            messages.len(),
            channel_id,
            start_time.elapsed().as_millis()
        );
        Ok(messages)
    }

    /// Open the push connection on a background task.
    pub fn stream_scrape(&self, channel_id: &str, hours: u32) -> ScrapeStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let request = self.scrape_request(channel_id, hours);
        let channel_id = channel_id.to_string();

        info!("Streaming channel {} ({}h)", channel_id, normalize_hours(hours));
        let task = tokio::spawn(async move {
            if let Err(e) = pump_events(request, &sender).await {
                error!("Scrape stream for channel {} failed: {}", channel_id, e);
                let _ = sender.send(FeedEvent::Failed(e.to_string()));
            }
        });

        ScrapeStream::new(receiver, Some(task))
    }

    pub async fn summarize(&self, messages: &[Message]) -> Result<String> {
        let start_time = Instant::now();
        let url = self.endpoint(&["api", "summarize"]);
        info!("Requesting summary of {} messages", messages.len());

        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout())
            .json(messages)
            .send()
            .await?;
        let response = check_status(response).await?;
        let payload: SummarizeResponse = serde_json::from_str(&response.text().await?)?;

        info!("Summary ready in {}ms ({} chars)", start_time.elapsed().as_millis(), payload.summary.len());
        Ok(payload.summary)
    }
}

#[async_trait]
impl MessageSource for Fetcher {
    async fn channels(&self) -> Result<Vec<Channel>> {
        self.fetch_channels().await
    }

    async fn scrape(&self, channel_id: &str, hours: u32) -> Result<Vec<Message>> {
        self.scrape_batch(channel_id, hours).await
    }

    fn stream(&self, channel_id: &str, hours: u32) -> ScrapeStream {
        self.stream_scrape(channel_id, hours)
    }

    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        Fetcher::summarize(self, messages).await
    }
}

/// Forward decoded events until a terminal one. A receiver that has gone
/// away ends the loop quietly.
async fn pump_events(request: RequestBuilder, sender: &UnboundedSender<FeedEvent>) -> Result<()> {
    let response = request.header("Accept", "text/event-stream").send().await?;
    let response = check_status(response).await?;

    let mut parser = EventStreamParser::new();
    let mut byte_stream = response.bytes_stream();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk?;
        for event in parser.push(&chunk) {
            if forward(event, sender) {
                return Ok(());
            }
        }
    }

    if let Some(event) = parser.finish() {
        if forward(event, sender) {
            return Ok(());
        }
    }

    Err(FeedError::Stream("connection closed before completion".to_string()))
}

/// Returns true when the stream should stop: terminal event sent or receiver gone.
fn forward(event: SseEvent, sender: &UnboundedSender<FeedEvent>) -> bool {
    let Some(event) = classify(event) else {
        return false;
    };
    let terminal = matches!(event, FeedEvent::Complete | FeedEvent::Failed(_));
    if sender.send(event).is_err() {
        debug!("Feed receiver dropped; closing stream");
        return true;
    }
    terminal
}

fn collect_event_stream(body: &[u8]) -> Result<Vec<Message>> {
    let mut parser = EventStreamParser::new();
    let mut events = parser.push(body);
    events.extend(parser.finish());

    let mut messages = Vec::new();
    for event in events {
        match classify(event) {
            Some(FeedEvent::Batch(batch)) => messages.extend(batch),
            Some(FeedEvent::Malformed(reason)) => return Err(FeedError::Malformed(reason)),
            Some(FeedEvent::Failed(reason)) => return Err(FeedError::Stream(reason)),
            Some(FeedEvent::Complete) => return Ok(messages),
            None => {}
        }
    }

    warn!("Event stream ended without a completion event");
    Ok(messages)
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|base| base.trim() == "text/event-stream")
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned HTTP {}: {}", status, body);
    Err(FeedError::Api {
        status: status.as_u16(),
        body,
    })
}
