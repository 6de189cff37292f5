use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use crate::validate::VideoId;
use crate::Result;

/// A subtitle file written by the captioning tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    /// Language tag taken from the file name (`en`, `en-GB`, `fr`...)
    pub language: String,

    /// Location inside the fetch's temporary directory
    pub path: PathBuf,
}

/// Subtitle files produced by one fetch.
///
/// Owns the temporary directory the files live in; dropping the set deletes
/// the directory and everything in it.
#[derive(Debug)]
pub struct CaptionSet {
    dir: TempDir,
    files: Vec<SubtitleFile>,
}

impl CaptionSet {
    /// Collect the `.vtt` files in `dir`, one per language tag
    pub fn collect(dir: TempDir, video_id: &VideoId) -> Result<Self> {
        let mut files: Vec<SubtitleFile> = Vec::new();

        let entries = fs_err::read_dir(dir.path()).map_err(|e| {
            crate::TranscriptError::fetch_failed(format!(
                "could not list subtitle output: {}",
                e.kind()
            ))
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("vtt") {
                continue;
            }
            let Some(language) = language_from_file_name(&path, video_id) else {
                tracing::debug!("Skipping unexpected subtitle file {:?}", path.file_name());
                continue;
            };
            if files.iter().any(|f| f.language.eq_ignore_ascii_case(&language)) {
                continue;
            }
            files.push(SubtitleFile { language, path });
        }

        files.sort_by(|a, b| a.language.cmp(&b.language));

        Ok(Self { dir, files })
    }

    /// Languages available in this set
    pub fn languages(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.language.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Give the directory back for another run
    pub(crate) fn into_dir(self) -> TempDir {
        self.dir
    }

    /// Pick the file to parse according to the preference list
    pub fn select(&self, preferences: &[String]) -> Option<&SubtitleFile> {
        select_preferred(&self.files, preferences)
    }
}

/// Choose the first preferred language that has a file, otherwise the
/// alphabetically first language available.
pub fn select_preferred<'a>(
    files: &'a [SubtitleFile],
    preferences: &[String],
) -> Option<&'a SubtitleFile> {
    preferences
        .iter()
        .find_map(|wanted| {
            files
                .iter()
                .find(|file| file.language.eq_ignore_ascii_case(wanted))
        })
        .or_else(|| files.iter().min_by(|a, b| a.language.cmp(&b.language)))
}

/// `<id>.<lang>.vtt` -> `<lang>`
fn language_from_file_name(path: &Path, video_id: &VideoId) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let language = name
        .strip_prefix(video_id.as_str())?
        .strip_prefix('.')?
        .strip_suffix(".vtt")?;

    (!language.is_empty() && !language.contains(['/', '\\'])).then(|| language.to_string())
}

/// One caption track a video offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language tag (`en`, `pt-BR`...)
    pub language_code: String,

    /// Human readable language name, when the tool reports one
    pub language: Option<String>,

    /// True for YouTube's automatic captions
    pub is_generated: bool,
}

/// Trait for fetching caption files for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Run the captioning tool once and collect the subtitle files it wrote
    async fn fetch(&self, video_id: &VideoId, timeout: Duration) -> Result<CaptionSet>;

    /// List the caption tracks a video offers without downloading any
    async fn list_tracks(&self, video_id: &VideoId, timeout: Duration) -> Result<Vec<CaptionTrack>>;

    /// Name of the underlying tool, for logs
    fn tool_name(&self) -> &'static str;
}
