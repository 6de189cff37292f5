use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::AppState;
use crate::validate::VideoId;

/// Longest timeout a caller may ask for, in seconds
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Query parameters for transcript endpoints
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptQuery {
    /// `true` returns timed segments instead of plain text
    pub timestamps: Option<String>,

    /// Per-request timeout override in seconds
    pub timeout: Option<u64>,
}

impl TranscriptQuery {
    fn wants_timestamps(&self) -> bool {
        self.timestamps
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
            .map(|secs| Duration::from_secs(secs.clamp(1, MAX_REQUEST_TIMEOUT_SECS)))
    }
}

/// Body of `POST /transcript`
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: Option<String>,
}

/// API info endpoint
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "YouTube Transcript API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/health": "Health check",
            "/transcript/{video_id}": "Get transcript by video ID",
            "/transcript (POST)": "Get transcript by URL",
            "/debug/{video_id}": "List available transcripts",
        }
    }))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /transcript/{video_id}
pub async fn transcript_by_id(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    query: Result<Query<TranscriptQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };
    transcript_response(&state, &video_id, &query).await
}

/// POST /transcript
pub async fn transcript_by_url(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TranscriptQuery>, QueryRejection>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };
    let url = match body {
        Ok(Json(UrlRequest { url: Some(url) })) if !url.trim().is_empty() => url,
        Ok(_) => return ApiError::bad_request("Missing \"url\" in request body").into_response(),
        Err(rejection) => {
            tracing::debug!("Rejected transcript request body: {}", rejection);
            return ApiError::bad_request("Missing \"url\" in request body").into_response();
        }
    };

    transcript_response(&state, &url, &query).await
}

fn query_error(rejection: QueryRejection) -> Response {
    ApiError::bad_request("Invalid query parameters")
        .with_hint(rejection.body_text())
        .into_response()
}

/// The id to report in error bodies: the extracted id when the input parses
fn reported_id(input: &str) -> String {
    VideoId::parse(input)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| input.to_string())
}

async fn transcript_response(state: &AppState, input: &str, query: &TranscriptQuery) -> Response {
    if query.wants_timestamps() {
        match state.service.get_segments(input, query.timeout()).await {
            Ok(timed) => {
                tracing::info!("Successfully fetched transcript ({} segments)", timed.segments.len());
                Json(json!({
                    "success": true,
                    "video_id": timed.video_id,
                    "segments": timed.segments,
                    "language": timed.language,
                }))
                .into_response()
            }
            Err(e) => ApiError::from(e).with_video_id(&reported_id(input)).into_response(),
        }
    } else {
        match state.service.get_transcript(input, query.timeout()).await {
            Ok(result) => {
                tracing::info!("Successfully fetched transcript ({} chars)", result.text.len());
                Json(json!({
                    "success": true,
                    "video_id": result.video_id,
                    "transcript": result.text,
                    "language": result.language,
                    "word_count": result.word_count(),
                    "fetched_at": result.fetched_at,
                }))
                .into_response()
            }
            Err(e) => ApiError::from(e).with_video_id(&reported_id(input)).into_response(),
        }
    }
}

/// GET /debug/{video_id}
pub async fn debug_tracks(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Response {
    match state.service.list_tracks(&video_id, None).await {
        Ok(tracks) => Json(json!({
            "success": true,
            "video_id": video_id,
            "count": tracks.len(),
            "available_transcripts": tracks,
        }))
        .into_response(),
        Err(e) => ApiError::from(e).with_video_id(&reported_id(&video_id)).into_response(),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}
