use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::captions::{CaptionSource, CaptionTrack, YtDlpFetcher};
use crate::config::CaptionConfig;
use crate::validate::VideoId;
use crate::vtt::{self, Segment};
use crate::{Result, TranscriptError};

/// Plain-text transcript of one video
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResult {
    pub video_id: VideoId,

    /// Deduplicated caption text
    pub text: String,

    /// Language tag of the subtitle file that was used
    pub language: String,

    /// When the transcript was produced
    pub fetched_at: DateTime<Utc>,
}

impl TranscriptResult {
    pub fn word_count(&self) -> usize {
        crate::utils::word_count(&self.text)
    }
}

/// Transcript with cue timings
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptSegments {
    pub video_id: VideoId,
    pub language: String,
    pub segments: Vec<Segment>,
}

/// Orchestrates validation, caption fetching and parsing.
///
/// Every call is a single attempt: it either completes or fails with one
/// [`TranscriptError`], and nothing is retried.
pub struct TranscriptService {
    source: Arc<dyn CaptionSource>,
    config: CaptionConfig,
}

impl TranscriptService {
    /// Service backed by yt-dlp
    pub fn new(config: CaptionConfig) -> Self {
        let source = Arc::new(YtDlpFetcher::new(&config));
        Self::with_source(config, source)
    }

    /// Service backed by any caption source
    pub fn with_source(config: CaptionConfig, source: Arc<dyn CaptionSource>) -> Self {
        Self { source, config }
    }

    /// Fetch the transcript of a video id or URL as plain text
    pub async fn get_transcript(&self, input: &str, timeout: Option<Duration>) -> Result<TranscriptResult> {
        let started = Instant::now();
        let video_id = VideoId::parse(input)?;
        tracing::info!("Fetching transcript for video: {}", video_id);

        let captions = self.source.fetch(&video_id, self.timeout(timeout)).await?;
        let file = captions
            .select(&self.config.languages)
            .ok_or_else(|| TranscriptError::NoCaptionsAvailable(video_id.to_string()))?;
        tracing::debug!("Using {} subtitles for {}", file.language, video_id);

        let text = vtt::parse_file(&file.path)?;
        if text.is_empty() {
            tracing::warn!("Subtitles for {} contained no text", video_id);
            return Err(TranscriptError::NoCaptionsAvailable(video_id.to_string()));
        }

        let result = TranscriptResult {
            language: file.language.clone(),
            video_id,
            text,
            fetched_at: Utc::now(),
        };
        tracing::info!(
            "Fetched transcript for {} ({} chars, {}) in {:?}",
            result.video_id,
            result.text.len(),
            result.language,
            started.elapsed()
        );

        Ok(result)
    }

    /// Fetch the transcript of a video id or URL with cue timings
    pub async fn get_segments(&self, input: &str, timeout: Option<Duration>) -> Result<TranscriptSegments> {
        let video_id = VideoId::parse(input)?;
        tracing::info!("Fetching timed transcript for video: {}", video_id);

        let captions = self.source.fetch(&video_id, self.timeout(timeout)).await?;
        let file = captions
            .select(&self.config.languages)
            .ok_or_else(|| TranscriptError::NoCaptionsAvailable(video_id.to_string()))?;

        let segments = vtt::parse_file_segments(&file.path)?;
        if segments.is_empty() {
            return Err(TranscriptError::NoCaptionsAvailable(video_id.to_string()));
        }
        tracing::info!("Fetched {} segments for {}", segments.len(), video_id);

        Ok(TranscriptSegments {
            language: file.language.clone(),
            video_id,
            segments,
        })
    }

    /// List the caption tracks a video offers
    pub async fn list_tracks(&self, input: &str, timeout: Option<Duration>) -> Result<Vec<CaptionTrack>> {
        let video_id = VideoId::parse(input)?;
        tracing::info!("Listing caption tracks for {} via {}", video_id, self.source.tool_name());
        self.source.list_tracks(&video_id, self.timeout(timeout)).await
    }

    fn timeout(&self, requested: Option<Duration>) -> Duration {
        requested
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| self.config.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionSet, MockCaptionSource};

    const ID: &str = "dQw4w9WgXcQ";

    /// A caption set holding one file per (language, content) pair
    fn caption_set(files: &[(&str, &str)]) -> CaptionSet {
        let dir = tempfile::Builder::new().prefix("captions-").tempdir().unwrap();
        for (language, content) in files {
            std::fs::write(dir.path().join(format!("{}.{}.vtt", ID, language)), content).unwrap();
        }
        CaptionSet::collect(dir, &VideoId::parse(ID).unwrap()).unwrap()
    }

    fn service(source: MockCaptionSource) -> TranscriptService {
        TranscriptService::with_source(CaptionConfig::default(), Arc::new(source))
    }

    #[tokio::test]
    async fn test_invalid_id_never_reaches_source() {
        let mut source = MockCaptionSource::new();
        source.expect_fetch().times(0);
        source.expect_list_tracks().times(0);
        let service = service(source);

        for input in ["", "tooshort", "dQw4w9WgXcQ!", "https://example.com/watch?v=abc"] {
            let err = service.get_transcript(input, None).await.unwrap_err();
            assert!(matches!(err, TranscriptError::InvalidVideoId(_)), "{input}");
        }
        assert!(service.list_tracks("nope", None).await.is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_dedupes_lines() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nNever gonna give you up\n\n00:00:02.000 --> 00:00:03.000\nNever gonna give you up\n";
        let mut source = MockCaptionSource::new();
        source
            .expect_fetch()
            .withf(|id, timeout| id.as_str() == ID && *timeout == Duration::from_secs(30))
            .times(1)
            .returning(move |_, _| Ok(caption_set(&[("en", vtt)])));

        let result = service(source).get_transcript(ID, None).await.unwrap();
        assert_eq!(result.text, "Never gonna give you up");
        assert_eq!(result.language, "en");
        assert_eq!(result.video_id.as_str(), ID);
        assert_eq!(result.word_count(), 5);
    }

    #[tokio::test]
    async fn test_url_input_and_language_preference() {
        let mut source = MockCaptionSource::new();
        source.expect_fetch().times(1).returning(|_, _| {
            Ok(caption_set(&[
                ("fr", "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nbonjour\n"),
                ("en-GB", "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\n"),
            ]))
        });

        let result = service(source)
            .get_transcript("https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap();
        assert_eq!(result.language, "en-GB");
        assert_eq!(result.text, "hello");
    }

    #[tokio::test]
    async fn test_requested_timeout_is_forwarded() {
        let mut source = MockCaptionSource::new();
        source
            .expect_fetch()
            .withf(|_, timeout| *timeout == Duration::from_secs(5))
            .times(1)
            .returning(|_, timeout| Err(TranscriptError::FetchTimeout(timeout)));

        let err = service(source)
            .get_transcript(ID, Some(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::FetchTimeout(_)));
    }

    #[tokio::test]
    async fn test_empty_text_is_no_captions() {
        let mut source = MockCaptionSource::new();
        source
            .expect_fetch()
            .returning(|_, _| Ok(caption_set(&[("en", "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n[Music]\n")])));

        let err = service(source).get_transcript(ID, None).await.unwrap_err();
        assert!(matches!(err, TranscriptError::NoCaptionsAvailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_errors_pass_through() {
        let mut source = MockCaptionSource::new();
        source
            .expect_fetch()
            .returning(|_, _| Err(TranscriptError::fetch_failed("ERROR: HTTP Error 429: Too Many Requests")));

        match service(source).get_transcript(ID, None).await {
            Err(TranscriptError::FetchFailed { reason, .. }) => {
                assert_eq!(reason, crate::FailureReason::RateLimited)
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_segments() {
        let mut source = MockCaptionSource::new();
        source.expect_fetch().returning(|_, _| {
            Ok(caption_set(&[(
                "en",
                "WEBVTT\n\n00:00:01.000 --> 00:00:02.500\nfirst\n\n00:00:02.500 --> 00:00:04.000\nfirst\nsecond\n",
            )]))
        });

        let timed = service(source).get_segments(ID, None).await.unwrap();
        assert_eq!(timed.language, "en");
        assert_eq!(timed.segments.len(), 2);
        assert_eq!(timed.segments[1].text, "second");
        assert_eq!(timed.segments[1].start, 2.5);
        assert_eq!(timed.segments[1].duration, 1.5);
    }

    #[tokio::test]
    async fn test_list_tracks_delegates() {
        let mut source = MockCaptionSource::new();
        source.expect_tool_name().return_const("stub");
        source.expect_list_tracks().times(1).returning(|_, _| {
            Ok(vec![CaptionTrack {
                language_code: "en".to_string(),
                language: Some("English".to_string()),
                is_generated: false,
            }])
        });

        let tracks = service(source).list_tracks(ID, None).await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
    }

    #[test]
    fn test_parsing_same_file_twice_is_identical() {
        let mut source = MockCaptionSource::new();
        source
            .expect_fetch()
            .times(2)
            .returning(|_, _| Ok(caption_set(&[("en", "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n<c>same</c> text\n")])));
        let service = service(source);

        let first = tokio_test::block_on(service.get_transcript(ID, None)).unwrap();
        let second = tokio_test::block_on(service.get_transcript(ID, None)).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.text, "same text");
    }
}
