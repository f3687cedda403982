/// Text processing utilities
pub mod text {
    /// First `max_lines` non-blank lines, with an ellipsis when more follow.
    pub fn preview(text: &str, max_lines: usize) -> String {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let shown: Vec<&str> = lines.by_ref().take(max_lines).collect();
        let mut preview = shown.join("\n");
        if lines.next().is_some() {
            preview.push_str(" …");
        }
        preview
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, Local, Utc};

    /// Timestamp in the reader's local zone.
    pub fn display_timestamp(timestamp: &DateTime<Utc>) -> String {
        timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}
