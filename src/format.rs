//! Text helpers for chat embeds.
use std::time::Duration;

use lavalink_rs::model::track::TrackInfo;

/// Embed field values are capped by Discord; stay well under it.
pub const FIELD_LIMIT: usize = 900;

/// `m:ss`, minutes are not wrapped into hours.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Track length as shown to users; streams have none.
pub fn format_length(info: &TrackInfo) -> String {
    if info.is_stream {
        "LIVE".to_string()
    } else {
        format_duration(info.length)
    }
}

/// Milliseconds a track adds to the queue. Lavalink reports streams as
/// `i64::MAX` long, so they count as nothing.
pub fn playable_length(info: &TrackInfo) -> u64 {
    if info.is_stream {
        0
    } else {
        info.length
    }
}

pub fn total_length<'a>(tracks: impl IntoIterator<Item = &'a TrackInfo>) -> u64 {
    tracks
        .into_iter()
        .map(playable_length)
        .fold(0, u64::saturating_add)
}

/// How long is left of a track played up to `position_ms`.
pub fn time_left(info: &TrackInfo, position_ms: u64) -> Duration {
    Duration::from_millis(playable_length(info).saturating_sub(position_ms))
}

pub fn format_track_title(title: &str, uri: Option<&str>) -> String {
    match uri {
        Some(uri) => format!("[{title}]({uri})"),
        None => title.to_string(),
    }
}

pub fn track_title(info: &TrackInfo) -> String {
    format_track_title(&info.title, info.uri.as_deref())
}

/// `**n.** [title](uri) (m:ss)`
pub fn numbered_line(n: usize, info: &TrackInfo) -> String {
    format!(
        "**{n}.** {} ({})",
        track_title(info),
        format_length(info)
    )
}

/// Groups lines into chunks of at most `limit` characters each. A single
/// line longer than the limit gets a chunk of its own.
pub fn paginate<I, S>(lines: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pages = Vec::new();
    let mut page = String::new();

    for line in lines {
        let line = line.as_ref();
        if !page.is_empty() && page.len() + line.len() + 1 > limit {
            pages.push(std::mem::take(&mut page));
        }
        page.push_str(line);
        page.push('\n');
    }

    if !page.is_empty() {
        pages.push(page);
    }

    pages
}
