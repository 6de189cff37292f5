use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{CaptionSet, CaptionSource, CaptionTrack};
use crate::config::CaptionConfig;
use crate::utils::{redact_path, summarize_diagnostic};
use crate::validate::VideoId;
use crate::{Result, TranscriptError};

/// Caption fetcher backed by the yt-dlp executable
pub struct YtDlpFetcher {
    yt_dlp_path: String,
    languages: Vec<String>,
    any_language_fallback: bool,
    temp_root: Option<PathBuf>,
}

/// What a finished yt-dlp run left behind
struct ToolOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: String,
}

impl YtDlpFetcher {
    pub fn new(config: &CaptionConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            languages: config.languages.clone(),
            any_language_fallback: config.any_language_fallback,
            temp_root: config.temp_dir.clone(),
        }
    }

    /// `--sub-langs` value for the preferred languages
    fn sub_langs(&self) -> String {
        self.languages
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Fresh directory for one fetch, never shared between requests
    fn scoped_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("captions-");

        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };

        dir.map_err(|e| {
            TranscriptError::fetch_failed(format!(
                "could not create temporary directory: {}",
                e.kind()
            ))
        })
    }

    fn subtitle_args(video_id: &VideoId, dir: &Path, sub_langs: &str) -> Vec<String> {
        vec![
            // Subtitles only, no media
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--sub-langs".to_string(),
            sub_langs.to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--paths".to_string(),
            dir.to_string_lossy().into_owned(),
            "--output".to_string(),
            "%(id)s.%(ext)s".to_string(),
            video_id.watch_url(),
        ]
    }

    /// One subtitle run into `dir`.
    ///
    /// Files that were written are kept even when yt-dlp exits non-zero.
    async fn download(
        &self,
        video_id: &VideoId,
        dir: TempDir,
        sub_langs: &str,
        timeout: Duration,
    ) -> Result<CaptionSet> {
        let args = Self::subtitle_args(video_id, dir.path(), sub_langs);
        let output = self.run(&args, Some(dir.path()), timeout).await?;
        let set = CaptionSet::collect(dir, video_id)?;

        if !output.status.success() {
            let diagnostic = redact_path(&summarize_diagnostic(&output.stderr), set.dir());
            if set.is_empty() {
                tracing::warn!("{} exited with {}: {}", self.yt_dlp_path, output.status, diagnostic);
                return Err(TranscriptError::fetch_failed(diagnostic));
            }
            tracing::warn!(
                "{} exited with {} after writing {}: {}",
                self.yt_dlp_path,
                output.status,
                set.languages().join(", "),
                diagnostic
            );
        }

        Ok(set)
    }

    fn info_args(video_id: &VideoId) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            video_id.watch_url(),
        ]
    }

    /// Run yt-dlp once with a hard deadline; the child is killed when it expires
    async fn run(&self, args: &[String], workdir: Option<&Path>, timeout: Duration) -> Result<ToolOutput> {
        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            TranscriptError::fetch_failed(format!("failed to launch yt-dlp: {}", e.kind()))
        })?;

        let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));
        let stdout_abort = stdout_task.abort_handle();
        let stderr_abort = stderr_task.abort_handle();

        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            (status, stdout, stderr)
        })
        .await;

        match finished {
            Ok((status, stdout, stderr)) => {
                let status = status.map_err(|e| {
                    TranscriptError::fetch_failed(format!("failed waiting for yt-dlp: {}", e.kind()))
                })?;
                Ok(ToolOutput {
                    status,
                    stdout,
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            }
            Err(_) => {
                tracing::warn!("{} timed out after {:?}, killing", self.yt_dlp_path, timeout);
                // kill() also reaps the child
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill {}: {}", self.yt_dlp_path, e);
                }
                stdout_abort.abort();
                stderr_abort.abort();
                Err(TranscriptError::FetchTimeout(timeout))
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!("Error reading tool output: {}", e);
        }
    }
    buf
}

/// Track to fetch when no preferred language exists: the first manual track,
/// else the auto-generated track in the video's original language.
/// Auto-translated tracks are never picked.
fn fallback_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|track| !track.is_generated)
        .or_else(|| {
            tracks
                .iter()
                .find(|track| track.is_generated && track.language_code.ends_with("-orig"))
        })
}

/// Time left before `deadline`, or the timeout error for the whole fetch
fn time_left(deadline: Instant, total: Duration) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        Err(TranscriptError::FetchTimeout(total))
    } else {
        Ok(left)
    }
}

/// Report a timeout of a later run against the whole fetch budget
fn whole_fetch_timeout(err: TranscriptError, total: Duration) -> TranscriptError {
    match err {
        TranscriptError::FetchTimeout(_) => TranscriptError::FetchTimeout(total),
        other => other,
    }
}

/// Turn the `subtitles` / `automatic_captions` maps of `--dump-json` into tracks
pub fn tracks_from_info(info: &Value) -> Vec<CaptionTrack> {
    let mut tracks = Vec::new();

    for (key, is_generated) in [("subtitles", false), ("automatic_captions", true)] {
        let Some(map) = info[key].as_object() else {
            continue;
        };

        let mut codes: Vec<&String> = map
            .iter()
            .filter(|(code, formats)| {
                code.as_str() != "live_chat"
                    && formats.as_array().is_some_and(|f| !f.is_empty())
            })
            .map(|(code, _)| code)
            .collect();
        codes.sort();

        for code in codes {
            let language = map[code]
                .as_array()
                .and_then(|formats| formats.iter().find_map(|f| f["name"].as_str()))
                .map(|name| name.to_string());

            tracks.push(CaptionTrack {
                language_code: code.clone(),
                language,
                is_generated,
            });
        }
    }

    tracks
}

#[async_trait]
impl CaptionSource for YtDlpFetcher {
    async fn fetch(&self, video_id: &VideoId, timeout: Duration) -> Result<CaptionSet> {
        let deadline = Instant::now() + timeout;
        let dir = self.scoped_dir()?;
        tracing::debug!("Fetching subtitles for {} into scoped temp dir", video_id);

        let mut set = self.download(video_id, dir, &self.sub_langs(), timeout).await?;

        if set.is_empty() && self.any_language_fallback {
            let tracks = self
                .list_tracks(video_id, time_left(deadline, timeout)?)
                .await
                .map_err(|e| whole_fetch_timeout(e, timeout))?;

            if let Some(track) = fallback_track(&tracks) {
                tracing::info!(
                    "No preferred subtitles for {}, falling back to {}",
                    video_id,
                    track.language_code
                );
                set = self
                    .download(
                        video_id,
                        set.into_dir(),
                        &track.language_code,
                        time_left(deadline, timeout)?,
                    )
                    .await
                    .map_err(|e| whole_fetch_timeout(e, timeout))?;
            }
        }

        if set.is_empty() {
            tracing::info!("{} produced no subtitle files for {}", self.yt_dlp_path, video_id);
            return Err(TranscriptError::NoCaptionsAvailable(video_id.to_string()));
        }

        tracing::info!("Subtitles for {}: {}", video_id, set.languages().join(", "));
        Ok(set)
    }

    async fn list_tracks(&self, video_id: &VideoId, timeout: Duration) -> Result<Vec<CaptionTrack>> {
        let output = self.run(&Self::info_args(video_id), None, timeout).await?;

        if !output.status.success() {
            let diagnostic = summarize_diagnostic(&output.stderr);
            tracing::warn!("{} exited with {}: {}", self.yt_dlp_path, output.status, diagnostic);
            return Err(TranscriptError::fetch_failed(diagnostic));
        }

        let info: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            TranscriptError::fetch_failed(format!("unexpected yt-dlp output: {}", e))
        })?;

        Ok(tracks_from_info(&info))
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}
