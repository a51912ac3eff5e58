use std::sync::OnceLock;

use regex::Regex;

/// Optional scheme and subdomain
macro_rules! host_prefix {
    () => {
        r#"(?:https?://)?(?:(?:www|m|music)\.)?"#
    };
}
/// The long form paths: `/watch?...v=`, `/shorts/`, `/embed/`, `/live/`
macro_rules! long_path {
    () => {
        r#"youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|embed/|live/)"#
    };
}
/// The short form host
macro_rules! short_path {
    () => {
        r#"youtu\.be/"#
    };
}
/// The 11 characters video ID
macro_rules! video_id {
    () => {
        r#"(?P<id>[A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)"#
    };
}

/// Example: "https://www.youtube.com/watch?v=dQw4w9WgXcQ" or "youtu.be/dQw4w9WgXcQ?t=4"
const PATTERN: &str = concat!(
    "^",
    host_prefix!(),
    "(?:",
    long_path!(),
    "|",
    short_path!(),
    ")",
    video_id!()
);

static VIDEO_URL_RE: OnceLock<Regex> = OnceLock::new();

fn video_url_re() -> &'static Regex {
    VIDEO_URL_RE.get_or_init(|| Regex::new(PATTERN).expect("video URL pattern is valid"))
}

/// Extract the video ID of a video URL.
/// Return None if the URL is not recognized.
pub fn video_id(url: &str) -> Option<&str> {
    video_url_re()
        .captures(url.trim())
        .and_then(|cap| cap.name("id"))
        .map(|id| id.as_str())
}
