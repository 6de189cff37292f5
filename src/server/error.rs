//! Mapping of pipeline errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{FailureReason, TranscriptError};

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            error: error.into(),
            kind: None,
            hint: None,
            video_id: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach the video id, except for ids that failed validation
    pub fn with_video_id(mut self, video_id: &str) -> Self {
        if self.kind != Some("invalid_video_id") {
            self.video_id = Some(video_id.to_string());
        }
        self
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        let kind = err.kind();
        let api_error = match &err {
            TranscriptError::InvalidVideoId(_) => {
                ApiError::bad_request("Invalid YouTube URL or video ID")
            }
            TranscriptError::NoCaptionsAvailable(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "No transcript found for this video")
                    .with_hint("The video may not have captions available")
            }
            TranscriptError::FetchFailed { reason, message } => match reason {
                FailureReason::VideoUnavailable => {
                    ApiError::new(StatusCode::NOT_FOUND, "Video is unavailable or does not exist")
                }
                FailureReason::RateLimited => {
                    ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Request blocked by YouTube")
                        .with_hint("YouTube may be rate-limiting. Please try again later.")
                }
                FailureReason::Other => ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "An error occurred while fetching the transcript",
                )
                .with_hint(message.clone()),
            },
            TranscriptError::FetchTimeout(_) => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Timed out fetching the transcript")
                    .with_hint(err.to_string())
            }
            TranscriptError::ParseError(message) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Could not parse the transcript")
                    .with_hint(message.clone())
            }
        };

        Self {
            kind: Some(kind),
            ..api_error
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
