//! WebVTT to plain text.
//!
//! This is a text filter rather than a full WebVTT parser: it strips the
//! header, metadata blocks, cue timings, cue identifiers and inline tags, then
//! collapses the rolling duplicates that YouTube auto-captions produce. Blocks
//! it does not recognise are passed through as text instead of failing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::{Result, TranscriptError};

/// One timed piece of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A block of the file after filtering
#[derive(Debug)]
enum Block {
    Cue {
        start: f64,
        end: f64,
        lines: Vec<String>,
    },
    /// Text that did not look like a cue; kept for completeness
    Loose(Vec<String>),
}

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})\s+-->\s+((?:\d+:)?\d{1,2}:\d{2}[.,]\d{3})(?:\s|$)",
        )
        .expect("timing regex is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"))
}

fn annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("annotation regex is valid"))
}

/// Read a subtitle file and reduce it to plain text
pub fn parse_file(path: &Path) -> Result<String> {
    Ok(parse_str(&read_subtitle(path)?))
}

/// Read a subtitle file and keep cue timings
pub fn parse_file_segments(path: &Path) -> Result<Vec<Segment>> {
    Ok(parse_segments(&read_subtitle(path)?))
}

fn read_subtitle(path: &Path) -> Result<String> {
    // Error carries no path
    let bytes = std::fs::read(path)
        .map_err(|e| TranscriptError::ParseError(format!("subtitle file unreadable: {}", e.kind())))?;
    tracing::debug!("Read subtitle file ({} bytes)", bytes.len());

    String::from_utf8(bytes)
        .map_err(|_| TranscriptError::ParseError("subtitle file is not valid UTF-8".to_string()))
}

/// Reduce WebVTT content to deduplicated, tag-free text joined by single spaces
pub fn parse_str(content: &str) -> String {
    let mut out: Vec<String> = Vec::new();

    for block in scan(content) {
        let lines = match block {
            Block::Cue { lines, .. } => lines,
            Block::Loose(lines) => lines,
        };
        for line in lines {
            if out.last() != Some(&line) {
                out.push(line);
            }
        }
    }

    out.join(" ").trim().to_string()
}

/// Like [`parse_str`], but keeps each cue's timing.
///
/// Lines repeated from the previous cue are dropped, and cues left empty by
/// that are skipped. Blocks without a timing line have no place on the
/// timeline and are ignored here.
pub fn parse_segments(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut previous: Option<String> = None;

    for block in scan(content) {
        let Block::Cue { start, end, lines } = block else {
            continue;
        };

        let mut kept = Vec::new();
        for line in lines {
            if previous.as_ref() != Some(&line) {
                previous = Some(line.clone());
                kept.push(line);
            }
        }

        if !kept.is_empty() {
            segments.push(Segment {
                text: kept.join(" "),
                start,
                duration: (end - start).max(0.0),
            });
        }
    }

    segments
}

fn scan(content: &str) -> Vec<Block> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut first = true;

    for line in content.lines().chain(std::iter::once("")) {
        // Whitespace-only lines belong to the cue; only empty lines end a block
        if !line.is_empty() {
            current.push(line);
            continue;
        }
        if current.is_empty() {
            continue;
        }
        if let Some(block) = classify_block(&current, first) {
            blocks.push(block);
        }
        first = false;
        current.clear();
    }

    blocks
}

fn classify_block(lines: &[&str], first: bool) -> Option<Block> {
    let head = lines[0].trim_start();

    if first && head.starts_with("WEBVTT") {
        return None;
    }
    if ["NOTE", "STYLE", "REGION"]
        .iter()
        .any(|keyword| head == *keyword || head.starts_with(&format!("{} ", keyword)))
    {
        return None;
    }

    // Everything before the timing line is a cue identifier
    let timing = lines.iter().enumerate().find_map(|(i, line)| {
        timing_regex().captures(line).and_then(|caps| {
            let start = parse_timestamp(&caps[1])?;
            let end = parse_timestamp(&caps[2])?;
            Some((i, start, end))
        })
    });

    match timing {
        Some((index, start, end)) => Some(Block::Cue {
            start,
            end,
            lines: clean_lines(&lines[index + 1..]),
        }),
        None => {
            let lines = clean_lines(lines);
            (!lines.is_empty()).then_some(Block::Loose(lines))
        }
    }
}

fn clean_lines(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .map(|line| clean_line(line))
        .filter(|line| !line.is_empty())
        .collect()
}

fn clean_line(line: &str) -> String {
    let without_tags = tag_regex().replace_all(line, "");
    let decoded = decode_entities(&without_tags);
    let without_annotations = annotation_regex().replace_all(&decoded, "");
    without_annotations.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse `hh:mm:ss.mmm` or `mm:ss.mmm` into seconds
fn parse_timestamp(stamp: &str) -> Option<f64> {
    let stamp = stamp.replace(',', ".");
    let mut parts = stamp.rsplitn(3, ':');
    let seconds: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let hours: f64 = match parts.next() {
        Some(h) => h.parse().ok()?,
        None => 0.0,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTO_CAPTIONS: &str = "WEBVTT
Kind: captions
Language: en

00:00:00.160 --> 00:00:02.470 align:start position:0%
\x20
we're<00:00:00.480><c> no</c><00:00:00.640><c> strangers</c>

00:00:02.470 --> 00:00:02.480 align:start position:0%
we're no strangers
\x20

00:00:02.480 --> 00:00:04.950 align:start position:0%
we're no strangers
to<00:00:02.800><c> love</c>

00:00:04.950 --> 00:00:04.960 align:start position:0%
to love

";

    #[test]
    fn test_rolling_auto_captions() {
        assert_eq!(parse_str(AUTO_CAPTIONS), "we're no strangers to love");
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let vtt = "WEBVTT

00:00:01.000 --> 00:00:02.000
hello world

00:00:02.000 --> 00:00:03.000
hello world

00:00:03.000 --> 00:00:04.000
hello world
";
        assert_eq!(parse_str(vtt), "hello world");
    }

    #[test]
    fn test_non_consecutive_duplicates_are_kept() {
        let vtt = "WEBVTT

00:00:01.000 --> 00:00:02.000
la

00:00:02.000 --> 00:00:03.000
da

00:00:03.000 --> 00:00:04.000
la
";
        assert_eq!(parse_str(vtt), "la da la");
    }

    #[test]
    fn test_no_timestamps_in_output() {
        let vtt = "WEBVTT

1
00:00:01.000 --> 00:00:03.000
first line

2
00:00:03.000 --> 00:00:05.000 line:90%
second line

01:02:03.000 --> 01:02:04.500
third line
";
        let text = parse_str(vtt);
        assert_eq!(text, "first line second line third line");
        let arrow = Regex::new(r"\d+:\d+.*-->").unwrap();
        assert!(!arrow.is_match(&text));
        assert!(!text.contains("-->"));
    }

    #[test]
    fn test_metadata_blocks_dropped() {
        let vtt = "WEBVTT - with a title

STYLE
::cue { color: yellow }

NOTE this is a comment
spanning lines

REGION
id:fred width:40%

intro
00:00:00.000 --> 00:00:01.000
<v Roger>Hi &amp; welcome</v>
";
        assert_eq!(parse_str(vtt), "Hi & welcome");
    }

    #[test]
    fn test_annotations_and_entities() {
        let vtt = "WEBVTT

00:00:00.000 --> 00:00:01.000
[Music]

00:00:01.000 --> 00:00:02.000
<i>it&#39;s</i>   a&nbsp;test [Applause]
";
        assert_eq!(parse_str(vtt), "it's a test");
    }

    #[test]
    fn test_malformed_block_passes_through() {
        let vtt = "WEBVTT

00:00:01 -> 00:00:02
garbled cue

00:00:02.000 --> 00:00:03.000
fine
";
        assert_eq!(parse_str(vtt), "00:00:01 -> 00:00:02 garbled cue fine");
    }

    #[test]
    fn test_digit_only_caption_text_survives() {
        let vtt = "WEBVTT

00:00:01.000 --> 00:00:02.000
1984
";
        assert_eq!(parse_str(vtt), "1984");
    }

    #[test]
    fn test_crlf_and_bom() {
        let vtt = "\u{feff}WEBVTT\r\n\r\n00:00:01.000 --> 00:00:02.000\r\nwindows line\r\n";
        assert_eq!(parse_str(vtt), "windows line");
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse_str(AUTO_CAPTIONS), parse_str(AUTO_CAPTIONS));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_str(""), "");
        assert_eq!(parse_str("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_segments_keep_timing() {
        let segments = parse_segments(AUTO_CAPTIONS);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "we're no strangers");
        assert!((segments[0].start - 0.16).abs() < 1e-9);
        assert!((segments[0].duration - 2.31).abs() < 1e-9);
        assert_eq!(segments[1].text, "to love");
        assert!((segments[1].start - 2.48).abs() < 1e-9);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:01.500"), Some(1.5));
        assert_eq!(parse_timestamp("01:00:00.000"), Some(3600.0));
        assert_eq!(parse_timestamp("00:00:02,250"), Some(2.25));
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn test_parse_file_errors_hide_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("secret-name.en.vtt");
        let err = parse_file(&missing).unwrap_err();
        assert!(matches!(err, TranscriptError::ParseError(_)));
        assert!(!err.to_string().contains("secret-name"));

        let binary = dir.path().join("binary.vtt");
        std::fs::write(&binary, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        assert!(matches!(parse_file(&binary), Err(TranscriptError::ParseError(_))));
    }

    #[test]
    fn test_parse_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.en.vtt");
        std::fs::write(&path, AUTO_CAPTIONS).unwrap();
        assert_eq!(parse_file(&path).unwrap(), "we're no strangers to love");
        assert_eq!(parse_file_segments(&path).unwrap().len(), 2);
    }
}
