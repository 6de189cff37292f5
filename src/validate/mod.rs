use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::{Result, TranscriptError};

/// Length of every YouTube video id
pub const VIDEO_ID_LEN: usize = 11;

/// Hosts a video URL may point at, with or without a scheme
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// A validated 11-character YouTube video id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare id or extract one from a YouTube URL.
    ///
    /// For URLs the `v` query parameter wins; otherwise the last non-empty
    /// path segment is used (`youtu.be/<id>`, `/embed/<id>`, `/shorts/<id>`).
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if is_valid_video_id(input) {
            return Ok(Self(input.to_string()));
        }

        extract_from_url(input)
            .filter(|candidate| is_valid_video_id(candidate))
            .map(Self)
            .ok_or_else(|| TranscriptError::InvalidVideoId(truncate_for_message(input)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL handed to yt-dlp
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

/// Check if a string is a valid YouTube video id
pub fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn extract_from_url(input: &str) -> Option<String> {
    let parsed = match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(_) => return None,
        // "youtube.com/watch?v=..." without a scheme
        Err(_) => Url::parse(&format!("https://{}", input)).ok()?,
    };

    let host = parsed.host_str()?.to_ascii_lowercase();
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return None;
    }

    if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
        return Some(v.trim().to_string());
    }

    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}

fn truncate_for_message(input: &str) -> String {
    const MAX: usize = 64;
    if input.chars().count() <= MAX {
        input.to_string()
    } else {
        format!("{}...", input.chars().take(MAX).collect::<String>())
    }
}

impl FromStr for VideoId {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for VideoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(VideoId::parse("  a-b_c1234XY ").unwrap().as_str(), "a-b_c1234XY");
    }

    #[test]
    fn test_url_variants() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "http://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ/",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ",
            "HTTPS://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
        ];
        for case in cases {
            let id = VideoId::parse(case).unwrap_or_else(|e| panic!("{case}: {e}"));
            assert_eq!(id.as_str(), "dQw4w9WgXcQ", "{case}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        let cases = [
            "",
            "short",
            "dQw4w9WgXcQQ",
            "dQw4w9WgXc!",
            "dQw4w9 WgXc",
            "dQw4w9WgXcé",
            "https://www.youtube.com/watch?v=tooshort",
            "https://www.youtube.com/watch",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "not a url at all",
            "example.com/dQw4w9WgXcQ",
            "https://example.com/dQw4w9WgXcQ",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com.evil.test/watch?v=dQw4w9WgXcQ",
        ];
        for case in cases {
            match VideoId::parse(case) {
                Err(TranscriptError::InvalidVideoId(_)) => {}
                other => panic!("{case:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_v_parameter_takes_priority() {
        let id = VideoId::parse("https://www.youtube.com/watch/zzzzzzzzzzz?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url_and_display() {
        let id: VideoId = "dQw4w9WgXcQ".parse().unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dQw4w9WgXcQ\"");
    }

    #[test]
    fn test_long_input_is_truncated_in_message() {
        let input = "x".repeat(500);
        let err = VideoId::parse(&input).unwrap_err();
        assert!(err.to_string().len() < 200);
    }
}
