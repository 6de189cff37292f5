//! YouTube Transcript API - fetch YouTube captions through yt-dlp and return plain text
//!
//! The core pipeline validates a video id, runs yt-dlp into a scoped temporary
//! directory, picks the preferred subtitle language and reduces the WebVTT file
//! to deduplicated text. The HTTP server, CLI and configuration are thin layers
//! around [`TranscriptService`].

pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod server;
pub mod transcript;
pub mod utils;
pub mod validate;
pub mod vtt;

pub use captions::{CaptionSet, CaptionSource, CaptionTrack, SubtitleFile};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use transcript::{TranscriptResult, TranscriptSegments, TranscriptService};
pub use validate::VideoId;

/// Result type used by the transcript pipeline
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Why yt-dlp reported a failure, classified from its diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Private, removed or otherwise unavailable video
    VideoUnavailable,
    /// YouTube throttled or blocked the request
    RateLimited,
    Other,
}

/// Terminal errors of the transcript pipeline
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid YouTube URL or video ID: {0}")]
    InvalidVideoId(String),

    #[error("Caption fetch timed out after {:.1}s", .0.as_secs_f64())]
    FetchTimeout(std::time::Duration),

    #[error("Caption fetch failed: {message}")]
    FetchFailed {
        reason: FailureReason,
        message: String,
    },

    #[error("No captions available for video {0}")]
    NoCaptionsAvailable(String),

    #[error("Subtitle parsing failed: {0}")]
    ParseError(String),
}

impl TranscriptError {
    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::InvalidVideoId(_) => "invalid_video_id",
            TranscriptError::FetchTimeout(_) => "fetch_timeout",
            TranscriptError::FetchFailed { .. } => "fetch_failed",
            TranscriptError::NoCaptionsAvailable(_) => "no_captions_available",
            TranscriptError::ParseError(_) => "parse_error",
        }
    }

    pub(crate) fn fetch_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        TranscriptError::FetchFailed {
            reason: FailureReason::classify(&message),
            message,
        }
    }
}

impl FailureReason {
    /// Classify yt-dlp stderr output
    pub fn classify(diagnostic: &str) -> Self {
        let lower = diagnostic.to_lowercase();
        if lower.contains("http error 429")
            || lower.contains("too many requests")
            || lower.contains("sign in to confirm")
        {
            FailureReason::RateLimited
        } else if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("has been removed")
            || lower.contains("is not available")
            || lower.contains("does not exist")
        {
            FailureReason::VideoUnavailable
        } else {
            FailureReason::Other
        }
    }
}
