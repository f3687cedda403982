use crate::aggregator::FeedItem;
use crate::source::{profile_image, SourceInfo};
use crate::traits::FeedRenderer;
use crate::types::{AttachmentKind, Result};
use crate::utils::time::display_timestamp;
use std::io::Write;

/// Plain-text rendering of one message: header, embeds, then attachments.
pub fn render_message(item: &FeedItem) -> String {
    let message = &item.message;
    let mut lines = Vec::new();

    let mut header = display_timestamp(&item.published_at);
    if let Some(source) = SourceInfo::from_message(message) {
        if let Some(platform) = source.platform {
            header.push_str(&format!(" [{}]", platform.name()));
        }
        if let Some(username) = &source.username {
            header.push_str(&format!(" @{}", username));
        }
        header.push_str(&format!(" {}", source.url));
    }
    lines.push(header);

    if let Some(avatar) = profile_image(message) {
        lines.push(format!("  avatar: {}", avatar));
    }

    if message.embeds.is_empty() && !message.content.trim().is_empty() {
        lines.extend(message.content.lines().map(|line| format!("  {}", line)));
    }

    for embed in &message.embeds {
        if let Some(title) = &embed.title {
            lines.push(format!("  ## {}", title));
        }
        if let Some(description) = &embed.description {
            lines.extend(description.lines().map(|line| format!("  {}", line)));
        }
        for field in embed.display_fields() {
            lines.push(format!("  {}: {}", field.name, field.value));
        }
    }

    for attachment in &message.attachments {
        let label = match attachment.kind() {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Other => "file",
        };
        lines.push(format!("  [{}] {} <{}>", label, attachment.filename, attachment.url));
    }

    lines.join("\n")
}

/// Writes the feed as text. `render` prints the whole window, except when
/// the window merely grew over the same feed; `append` prints only items
/// after those already shown.
pub struct TextRenderer<W: Write> {
    out: W,
    shown: usize,
    last_total: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: 0, last_total: 0 }
    }

    pub fn append(&mut self, visible: &[FeedItem], total: usize) -> Result<()> {
        let start = self.shown.min(visible.len());
        for item in &visible[start..] {
            writeln!(self.out, "{}\n", render_message(item))?;
        }
        self.shown = visible.len();
        if total > visible.len() {
            writeln!(self.out, "({} of {} shown)", visible.len(), total)?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn summary(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "AI Summary\n==========\n{}\n", text)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeedRenderer for TextRenderer<W> {
    fn render(&mut self, visible: &[FeedItem], total: usize) -> Result<()> {
        if self.shown > 0 && total == self.last_total && visible.len() > self.shown {
            return self.append(visible, total);
        }
        writeln!(self.out, "Updates ({})\n", total)?;
        self.shown = 0;
        self.last_total = total;
        self.append(visible, total)
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }
}

/// Reports loading progress on a single line while a stream is open.
pub struct ProgressRenderer<W: Write> {
    out: W,
}

impl<W: Write> ProgressRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> FeedRenderer for ProgressRenderer<W> {
    fn render(&mut self, visible: &[FeedItem], total: usize) -> Result<()> {
        write!(self.out, "\rLoading... {} messages ({} visible)", total, visible.len())?;
        self.out.flush()?;
        Ok(())
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "\n{}", text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attachment, Embed, EmbedField, Message};

    fn item(id: &str, content: &str, embeds: Vec<Embed>, attachments: Vec<Attachment>) -> FeedItem {
        FeedItem::new(Message {
            id: id.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            content: content.to_string(),
            embeds,
            attachments,
        })
        .unwrap()
    }

    #[test]
    fn renders_source_embeds_and_attachments() {
        let embed = Embed {
            title: Some("Breaking".to_string()),
            description: Some("Something happened".to_string()),
            fields: vec![
                EmbedField { name: "Source".to_string(), value: "https://t.me/wire/42".to_string() },
                EmbedField { name: "Region".to_string(), value: "EU".to_string() },
            ],
            ..Embed::default()
        };
        let attachments = vec![
            Attachment { url: "https://cdn/a.jpg".to_string(), filename: "a.jpg".to_string(), content_type: Some("image/jpeg".to_string()) },
            Attachment { url: "https://cdn/b.mp4".to_string(), filename: "b.mp4".to_string(), content_type: Some("video/mp4".to_string()) },
        ];

        let text = render_message(&item("1", "", vec![embed], attachments));
        assert!(text.contains("[Telegram] @wire https://t.me/wire/42"));
        assert!(text.contains("## Breaking"));
        assert!(text.contains("Region: EU"));
        assert!(!text.contains("Source:"));
        assert!(text.contains("[image] a.jpg <https://cdn/a.jpg>"));
        assert!(text.contains("[video] b.mp4 <https://cdn/b.mp4>"));
    }

    #[test]
    fn plain_content_shown_without_embeds() {
        let text = render_message(&item("1", "hello\nworld", Vec::new(), Vec::new()));
        assert!(text.ends_with("  hello\n  world"));
    }

    #[test]
    fn append_writes_only_new_items() {
        let items = vec![item("1", "first", Vec::new(), Vec::new()), item("2", "second", Vec::new(), Vec::new())];
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&items[..1], 2).unwrap();
        renderer.append(&items, 2).unwrap();

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(output.matches("first").count(), 1);
        assert_eq!(output.matches("second").count(), 1);
        assert!(output.starts_with("Updates (2)"));
        assert!(output.contains("(1 of 2 shown)"));
    }

    #[test]
    fn growing_window_is_appended_not_reprinted() {
        let items = vec![item("1", "first", Vec::new(), Vec::new()), item("2", "second", Vec::new(), Vec::new())];
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&items[..1], 2).unwrap();
        renderer.render(&items, 2).unwrap();

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(output.matches("Updates (2)").count(), 1);
        assert_eq!(output.matches("first").count(), 1);
        assert_eq!(output.matches("second").count(), 1);
    }
}
