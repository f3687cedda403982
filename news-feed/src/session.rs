use crate::aggregator::FeedAggregator;
use crate::traits::FeedRenderer;
use crate::types::{FeedEvent, Message, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receiving end of a scrape transport plus the task feeding it.
pub struct ScrapeStream {
    receiver: UnboundedReceiver<FeedEvent>,
    task: Option<JoinHandle<()>>,
}

impl ScrapeStream {
    pub fn new(receiver: UnboundedReceiver<FeedEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { receiver, task }
    }

    /// A stream whose sender side is driven by the caller.
    pub fn channel() -> (UnboundedSender<FeedEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self::new(receiver, None))
    }

    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.receiver.recv().await
    }

    /// Stop the transport; already queued events are discarded.
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver.close();
    }
}

impl Drop for ScrapeStream {
    fn drop(&mut self) {
        self.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Completed,
    Failed,
    Stopped,
}

/// How a fetch ended. Messages ingested before a failure or stop are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Completed { total: usize },
    /// Completed with nothing to show.
    Empty,
    Failed { error: String, total: usize },
    Stopped { total: usize },
}

pub const EMPTY_NOTICE: &str = "No messages found in the selected timeframe.";

/// Drives a [`FeedAggregator`] from transport events, one event at a time.
pub struct FeedSession {
    aggregator: FeedAggregator,
    state: SessionState,
    errors: Vec<String>,
}

impl FeedSession {
    pub fn new(window_size: usize) -> Self {
        Self {
            aggregator: FeedAggregator::new(window_size),
            state: SessionState::Idle,
            errors: Vec::new(),
        }
    }

    pub fn begin(&mut self) {
        self.aggregator.reset();
        self.errors.clear();
        self.state = SessionState::Loading;
    }

    /// Apply one event. Returns `false` once the session accepts no more events.
    pub fn handle(&mut self, event: FeedEvent, renderer: &mut dyn FeedRenderer) -> bool {
        if self.state != SessionState::Loading {
            debug!("Session finished; dropping {:?}", event);
            return false;
        }

        match event {
            FeedEvent::Batch(batch) => {
                let size = batch.len();
                match self.aggregator.ingest(batch) {
                    Ok(snapshot) => {
                        debug!("Batch of {} messages, {} new", size, snapshot.accepted);
                        self.render(renderer);
                    }
                    Err(e) => {
                        warn!("Skipping batch of {} messages: {}", size, e);
                        self.errors.push(e.to_string());
                    }
                }
                true
            }
            FeedEvent::Malformed(reason) => {
                warn!("Skipping malformed delivery: {}", reason);
                self.errors.push(reason);
                true
            }
            FeedEvent::Complete => {
                self.state = SessionState::Completed;
                info!("Feed complete with {} messages", self.aggregator.total());
                false
            }
            FeedEvent::Failed(reason) => {
                warn!("Feed failed after {} messages: {}", self.aggregator.total(), reason);
                self.errors.push(reason);
                self.state = SessionState::Failed;
                false
            }
        }
    }

    /// Consume a stream until its terminal event, or until it closes.
    pub async fn run(&mut self, stream: &mut ScrapeStream, renderer: &mut dyn FeedRenderer) -> FeedOutcome {
        self.begin();

        while let Some(event) = stream.recv().await {
            if !self.handle(event, renderer) {
                break;
            }
        }

        stream.abort();
        self.stop();
        self.finish(renderer)
    }

    /// Single-shot fetch: the whole result is one batch and fails as a unit.
    pub fn ingest_all(&mut self, messages: Vec<Message>, renderer: &mut dyn FeedRenderer) -> Result<FeedOutcome> {
        self.begin();
        if let Err(e) = self.aggregator.ingest(messages) {
            self.fail(e.to_string());
            return Err(e);
        }
        self.render(renderer);
        self.state = SessionState::Completed;
        Ok(self.finish(renderer))
    }

    pub fn fail(&mut self, reason: String) {
        self.errors.push(reason);
        self.state = SessionState::Failed;
    }

    /// Mark an in-flight session as stopped by the caller.
    pub fn stop(&mut self) {
        if self.state == SessionState::Loading {
            info!("Feed stopped with {} messages", self.aggregator.total());
            self.state = SessionState::Stopped;
        }
    }

    pub fn load_more(&mut self, renderer: &mut dyn FeedRenderer) -> usize {
        let added = self.aggregator.load_more();
        if added > 0 {
            self.render(renderer);
        }
        added
    }

    pub fn outcome(&self) -> Option<FeedOutcome> {
        let total = self.aggregator.total();
        match self.state {
            SessionState::Idle | SessionState::Loading => None,
            SessionState::Completed if total == 0 => Some(FeedOutcome::Empty),
            SessionState::Completed => Some(FeedOutcome::Completed { total }),
            SessionState::Failed => Some(FeedOutcome::Failed {
                error: self.errors.last().cloned().unwrap_or_default(),
                total,
            }),
            SessionState::Stopped => Some(FeedOutcome::Stopped { total }),
        }
    }

    pub fn aggregator(&self) -> &FeedAggregator {
        &self.aggregator
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    /// Problems reported during the current fetch, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn render(&self, renderer: &mut dyn FeedRenderer) {
        if let Err(e) = renderer.render(self.aggregator.visible(), self.aggregator.total()) {
            warn!("Renderer failed: {}", e);
        }
    }

    fn finish(&self, renderer: &mut dyn FeedRenderer) -> FeedOutcome {
        let outcome = self.outcome().unwrap_or(FeedOutcome::Stopped {
            total: self.aggregator.total(),
        });
        if outcome == FeedOutcome::Empty {
            if let Err(e) = renderer.notice(EMPTY_NOTICE) {
                warn!("Renderer failed: {}", e);
            }
        }
        outcome
    }
}
