use once_cell::sync::Lazy;
use regex::Regex;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://|www\d{0,3}\.|[a-z0-9.\-]+\.[a-z]{2,4}/)\S+$")
        .expect("URL regex is valid")
});

static LIST_PARAM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&list=\S*").expect("list regex is valid"));

pub fn is_url(query: &str) -> bool {
    URL_REGEX.is_match(query)
}

/// Turns what the user typed into something the Lavalink node can load.
///
/// Plain text becomes a search using `search_prefix`. For links, a playlist
/// parameter trailing a video id is dropped so only that video is queued;
/// links that are a playlist on their own are kept.
pub fn build_query(raw: &str, search_prefix: &str) -> String {
    let query = raw.trim().trim_start_matches('<').trim_end_matches('>').trim();

    if is_url(query) {
        LIST_PARAM_REGEX.replace_all(query, "").into_owned()
    } else {
        format!("{search_prefix}:{query}")
    }
}

/// YouTube "mix" playlist seeded from a video, used for autoplay.
pub fn youtube_mix_url(identifier: &str) -> String {
    format!("https://www.youtube.com/watch?v={identifier}&list=RD{identifier}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_becomes_search() {
        assert_eq!(
            build_query("  never gonna give you up ", "ytsearch"),
            "ytsearch:never gonna give you up"
        );
        assert_eq!(build_query("daft punk", "scsearch"), "scsearch:daft punk");
    }

    #[test]
    fn angle_brackets_are_stripped() {
        assert_eq!(
            build_query("<https://youtu.be/dQw4w9WgXcQ>", "ytsearch"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn playlist_context_dropped_from_video_links() {
        assert_eq!(
            build_query(
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123&index=2",
                "ytsearch"
            ),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn bare_playlists_are_kept() {
        let url = "https://www.youtube.com/playlist?list=PL123";
        assert_eq!(build_query(url, "ytsearch"), url);
    }

    #[test]
    fn recognises_urls() {
        assert!(is_url("https://open.spotify.com/track/abc"));
        assert!(is_url("www.youtube.com/watch?v=abc"));
        assert!(is_url("soundcloud.com/artist/song"));
        assert!(!is_url("some song name"));
        assert!(!is_url("ytsearch:some song"));
    }

    #[test]
    fn mix_url() {
        assert_eq!(
            youtube_mix_url("abc"),
            "https://www.youtube.com/watch?v=abc&list=RDabc"
        );
    }
}
