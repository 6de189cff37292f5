use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-api",
    about = "YouTube Transcript API - fetch YouTube captions as plain text",
    version,
    long_about = "Fetches YouTube captions with yt-dlp, strips the WebVTT timing and markup, and returns plain text. Runs as a small REST API or as a one-shot command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Require this key in the X-API-Key header
        #[arg(long, env = "APP_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Caption fetch timeout in seconds
        #[arg(short, long, env = "TRANSCRIPT_TIMEOUT", value_name = "SECS")]
        timeout: Option<u64>,

        /// yt-dlp executable
        #[arg(long, env = "YT_DLP_PATH", value_name = "PATH")]
        yt_dlp: Option<String>,
    },

    /// Fetch one transcript and print it
    Fetch {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        input: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include cue timestamps
        #[arg(long)]
        timestamps: bool,

        /// Caption fetch timeout in seconds
        #[arg(short, long, env = "TRANSCRIPT_TIMEOUT", value_name = "SECS")]
        timeout: Option<u64>,

        /// yt-dlp executable
        #[arg(long, env = "YT_DLP_PATH", value_name = "PATH")]
        yt_dlp: Option<String>,
    },

    /// List the caption tracks a video offers
    Languages {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        input: String,

        /// yt-dlp executable
        #[arg(long, env = "YT_DLP_PATH", value_name = "PATH")]
        yt_dlp: Option<String>,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config path
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
