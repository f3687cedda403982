use crate::types::Channel;
use std::cmp::Ordering;

/// Display priority derived from the emoji a channel name starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelTier {
    Monochrome,
    Red,
    Orange,
    Yellow,
    Unranked,
}

pub fn channel_tier(name: &str) -> ChannelTier {
    // A trailing U+FE0F variation selector does not change the tier,
    // so only the leading code point matters.
    match name.chars().next() {
        Some('⚫' | '⚪' | '⬛' | '⬜' | '▪' | '▫') => ChannelTier::Monochrome,
        Some('🔴' | '❤' | '🟥' | '🏮') => ChannelTier::Red,
        Some('🟧' | '🟠' | '🔸') => ChannelTier::Orange,
        Some('💛' | '🟡' | '🟨' | '⭐') => ChannelTier::Yellow,
        _ => ChannelTier::Unranked,
    }
}

pub fn compare_channel_names(a: &str, b: &str) -> Ordering {
    channel_tier(a)
        .cmp(&channel_tier(b))
        .then_with(|| a.cmp(b))
}

pub fn sort_channels(channels: &mut [Channel]) {
    channels.sort_by(|a, b| compare_channel_names(&a.name, &b.name));
}

/// Look a channel up by exact id, falling back to the first name containing
/// `query` case-insensitively.
pub fn find_matching_channel<'a>(channels: &'a [Channel], query: &str) -> Option<&'a Channel> {
    if let Some(channel) = channels.iter().find(|channel| channel.id == query) {
        return Some(channel);
    }

    let query = query.to_lowercase();
    channels
        .iter()
        .find(|channel| channel.name.to_lowercase().contains(&query))
}
