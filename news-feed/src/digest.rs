use crate::types::Summary;
use crate::utils::text::preview;
use tracing::debug;

pub const DEFAULT_SIDEBAR_WIDTH: u32 = 320;
pub const MIN_SIDEBAR_WIDTH: u32 = 200;
pub const MAX_SIDEBAR_WIDTH: u32 = 600;

/// Summaries generated during this session, newest first. Not persisted.
#[derive(Debug, Default)]
pub struct SummaryHistory {
    entries: Vec<Summary>,
}

impl SummaryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, summary: Summary) {
        debug!("Recording summary for {} ({} chars)", summary.channel_name, summary.text.len());
        self.entries.insert(0, summary);
    }

    pub fn entries(&self) -> &[Summary] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&Summary> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&Summary> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sidebar listing: channel name and a clamped preview of each entry.
    pub fn previews(&self, max_lines: usize) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|summary| (summary.channel_name.clone(), preview(&summary.text, max_lines)))
            .collect()
    }
}

/// Width of the history sidebar in pixels, changed by dragging its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarWidth {
    width: u32,
    min: u32,
    max: u32,
}

impl SidebarWidth {
    pub fn new(width: u32, min: u32, max: u32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            width: width.clamp(min, max),
            min,
            max,
        }
    }

    /// Follow a drag to `position`. Positions outside `[min, max]` are ignored,
    /// so the width stays where it last fit.
    pub fn resize_to(&mut self, position: u32) -> bool {
        if position < self.min || position > self.max {
            return false;
        }
        self.width = position;
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min, self.max)
    }
}

impl Default for SidebarWidth {
    fn default() -> Self {
        Self::new(DEFAULT_SIDEBAR_WIDTH, MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH)
    }
}
