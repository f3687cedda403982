use crate::types::{FeedEvent, Message};
use serde::Deserialize;
use tracing::{debug, warn};

/// One dispatched `text/event-stream` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Incremental decoder for server-sent events.
///
/// Bytes are buffered until a blank line closes an event, so multi-byte
/// characters split across network chunks decode correctly. `\r\n`, `\r`
/// and `\n` all end a line.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    /// Last byte seen was `\r`; a `\n` right after it belongs to the same terminator.
    after_cr: bool,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        for &byte in chunk {
            let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');
            match byte {
                b'\n' if after_cr => {}
                b'\r' => self.buffer.push(b'\n'),
                _ => self.buffer.push(byte),
            }
        }

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|pair| pair == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block[..pos])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an event left unterminated when the stream closed.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.after_cr = false;
        let block = std::mem::take(&mut self.buffer);
        parse_block(&String::from_utf8_lossy(&block))
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Option<String> = None;

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event = Some(value.to_string()),
            "data" => match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            _ => debug!("Ignoring SSE field '{}'", field),
        }
    }

    // an unnamed event with an empty data buffer is not dispatched
    if event.is_none() && data.as_deref().map_or(true, str::is_empty) {
        return None;
    }

    Some(SseEvent {
        event,
        data: data.unwrap_or_default(),
    })
}

/// Map a raw event onto the feed protocol: unnamed events carry a JSON
/// array of messages, `complete` ends the stream, `error` carries
/// `{"error": "..."}`. Unknown event names yield `None`.
pub fn classify(event: SseEvent) -> Option<FeedEvent> {
    match event.event.as_deref() {
        None | Some("message") => match serde_json::from_str::<Vec<Message>>(&event.data) {
            Ok(batch) => Some(FeedEvent::Batch(batch)),
            Err(e) => {
                warn!("Undecodable batch ({} bytes): {}", event.data.len(), e);
                Some(FeedEvent::Malformed(e.to_string()))
            }
        },
        Some("complete") => Some(FeedEvent::Complete),
        Some("error") => {
            let reason = serde_json::from_str::<ErrorPayload>(&event.data)
                .map(|payload| payload.error)
                .unwrap_or(event.data);
            Some(FeedEvent::Failed(reason))
        }
        Some(other) => {
            debug!("Ignoring unknown SSE event '{}'", other);
            None
        }
    }
}
