use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript_api::cli::{Cli, Commands};
use yt_transcript_api::config::Config;
use yt_transcript_api::output::{self, Transcript};
use yt_transcript_api::{server, utils, TranscriptService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so `fetch` output stays clean
    let default_filter = if cli.verbose {
        "yt_transcript_api=debug,tower_http=debug"
    } else {
        "yt_transcript_api=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            api_key,
            timeout,
            yt_dlp,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) {
                config.server.api_key = Some(api_key);
            }
            apply_caption_overrides(&mut config, timeout, yt_dlp);
            config.validate()?;

            // Check for required external dependencies (non-fatal)
            let missing_deps = utils::check_dependencies(&config.captions.yt_dlp_path).await;
            for dep in missing_deps {
                tracing::warn!("Dependency check: {} not found (continuing anyway)", dep);
            }

            tracing::info!("{} v{} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            server::serve(config).await?;
        }
        Commands::Fetch {
            input,
            output,
            format,
            timestamps,
            timeout,
            yt_dlp,
        } => {
            apply_caption_overrides(&mut config, timeout, yt_dlp);
            config.validate()?;

            let service = TranscriptService::new(config.captions.clone());
            let transcript = if timestamps {
                Transcript::Timed(service.get_segments(&input, None).await?)
            } else {
                Transcript::Text(service.get_transcript(&input, None).await?)
            };

            match output {
                Some(path) => {
                    output::save_to_file(&transcript, &path, &format)?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&transcript, &format)?;
                }
            }
        }
        Commands::Languages { input, yt_dlp } => {
            apply_caption_overrides(&mut config, None, yt_dlp);
            config.validate()?;

            let service = TranscriptService::new(config.captions.clone());
            let tracks = service.list_tracks(&input, None).await?;
            println!("{}", output::render_tracks(&tracks));
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save()?;
                println!("Default configuration written to: {}", path.display());
            } else {
                config.display();
                if !show {
                    println!();
                    println!("Config file: {}", Config::config_path()?.display());
                }
            }
        }
    }

    Ok(())
}

fn apply_caption_overrides(config: &mut Config, timeout: Option<u64>, yt_dlp: Option<String>) {
    if let Some(secs) = timeout {
        config.captions.timeout_secs = secs;
    }
    if let Some(path) = yt_dlp {
        config.captions.yt_dlp_path = path;
    }
    tracing::debug!(
        "Caption timeout {:?}, yt-dlp at {}",
        Duration::from_secs(config.captions.timeout_secs),
        config.captions.yt_dlp_path
    );
}
