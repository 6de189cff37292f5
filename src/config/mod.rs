use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Caption fetching settings
    pub captions: CaptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Key required in the `X-API-Key` header; open access when unset
    pub api_key: Option<String>,

    /// Per-client request limits
    pub rate_limit: RateLimitSettings,

    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub per_minute: u32,
    pub per_hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// yt-dlp executable name or path
    pub yt_dlp_path: String,

    /// Wall-clock limit for one yt-dlp run, in seconds
    pub timeout_secs: u64,

    /// Subtitle languages in order of preference
    pub languages: Vec<String>,

    /// When no preferred language exists, fetch one original-language track
    /// (manual, else the auto-generated `-orig` track)
    pub any_language_fallback: bool,

    /// Parent for per-request temporary directories (system temp if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            api_key: None,
            rate_limit: RateLimitSettings::default(),
            max_body_bytes: 100 * 1024,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            per_minute: 10,
            per_hour: 100,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            timeout_secs: 30,
            languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            any_language_fallback: true,
            temp_dir: None,
        }
    }
}

impl CaptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Load and validate a specific YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript-api").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.captions.timeout_secs == 0 {
            anyhow::bail!("captions.timeout_secs must be greater than zero");
        }
        if self.captions.languages.iter().all(|l| l.trim().is_empty()) {
            anyhow::bail!("captions.languages must name at least one language");
        }
        if self.captions.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("captions.yt_dlp_path must not be empty");
        }
        if self.server.rate_limit.per_minute == 0 || self.server.rate_limit.per_hour == 0 {
            anyhow::bail!("server.rate_limit limits must be greater than zero");
        }
        if self.server.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            anyhow::bail!("server.api_key must not be blank; remove it to disable authentication");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}", self.server.socket_addr());
        println!(
            "  API Key: {}",
            if self.server.api_key.is_some() { "configured" } else { "not set (open access)" }
        );
        println!(
            "  Rate Limit: {}/minute, {}/hour",
            self.server.rate_limit.per_minute, self.server.rate_limit.per_hour
        );
        println!("  yt-dlp: {}", self.captions.yt_dlp_path);
        println!("  Timeout: {}s", self.captions.timeout_secs);
        println!("  Languages: {}", self.captions.languages.join(", "));
        println!("  Any-Language Fallback: {}", self.captions.any_language_fallback);
        if let Some(dir) = &self.captions.temp_dir {
            println!("  Temp Dir: {}", dir.display());
        }
    }
}
