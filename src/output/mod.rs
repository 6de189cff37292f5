use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::captions::CaptionTrack;
use crate::transcript::{TranscriptResult, TranscriptSegments};
use crate::utils::format_timestamp;

/// Something the `fetch` command can print
pub enum Transcript {
    Text(TranscriptResult),
    Timed(TranscriptSegments),
}

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: &OutputFormat) -> Result<String> {
    let content = match (format, transcript) {
        (OutputFormat::Text, Transcript::Text(result)) => result.text.clone(),
        (OutputFormat::Text, Transcript::Timed(timed)) => timed
            .segments
            .iter()
            .map(|segment| format!("[{}] {}", format_timestamp(segment.start), segment.text))
            .collect::<Vec<_>>()
            .join("\n"),
        (OutputFormat::Json, Transcript::Text(result)) => {
            let mut value = serde_json::to_value(result)?;
            value["word_count"] = result.word_count().into();
            serde_json::to_string_pretty(&value)?
        }
        (OutputFormat::Json, Transcript::Timed(timed)) => serde_json::to_string_pretty(timed)?,
    };

    Ok(content)
}

/// Render caption tracks as one line each
pub fn render_tracks(tracks: &[CaptionTrack]) -> String {
    if tracks.is_empty() {
        return "No caption tracks available".to_string();
    }

    tracks
        .iter()
        .map(|track| {
            format!(
                "{:<12} {:<28} {}",
                track.language_code,
                track.language.as_deref().unwrap_or("-"),
                if track.is_generated { "auto-generated" } else { "manual" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Save transcript to file
pub fn save_to_file(transcript: &Transcript, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(transcript, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(transcript: &Transcript, format: &OutputFormat) -> Result<()> {
    println!("{}", render(transcript, format)?);
    Ok(())
}
