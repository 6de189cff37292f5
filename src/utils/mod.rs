use std::path::Path;

/// Most diagnostic lines kept from a failing tool run
const MAX_DIAGNOSTIC_LINES: usize = 5;

/// Most characters kept from a failing tool run
const MAX_DIAGNOSTIC_CHARS: usize = 1000;

/// Replace every occurrence of `path` in `text` so temp paths never leave the process
pub fn redact_path(text: &str, path: &Path) -> String {
    let needle = path.to_string_lossy();
    if needle.is_empty() {
        return text.to_string();
    }
    text.replace(needle.as_ref(), "<tmp>")
}

/// Reduce tool stderr to the lines worth reporting.
///
/// `ERROR:` lines win; otherwise the last few non-empty lines are kept.
pub fn summarize_diagnostic(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.starts_with("ERROR"))
        .collect();

    let chosen = if errors.is_empty() {
        &lines[lines.len().saturating_sub(MAX_DIAGNOSTIC_LINES)..]
    } else {
        &errors[errors.len().saturating_sub(MAX_DIAGNOSTIC_LINES)..]
    };

    let summary = chosen.join("\n");
    if summary.is_empty() {
        return "no diagnostic output".to_string();
    }
    if summary.chars().count() > MAX_DIAGNOSTIC_CHARS {
        let cut: String = summary.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        format!("{}...", cut)
    } else {
        summary
    }
}

/// Count whitespace separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Format seconds as `HH:MM:SS` (or `MM:SS` under an hour)
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required to fetch captions", yt_dlp_path));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
