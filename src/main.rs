//! # Thumbnail Optimizer - Main Entry Point
//!
//! Punto di ingresso della CLI `thumb-optimize`.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti con `clap`
//! - Inizializzazione del logging con `tracing`
//! - Risoluzione della configurazione (file JSON + override da CLI)
//! - Avvio del batch o del report dei tool
//!
//! ## Esempio di utilizzo:
//! ```bash
//! thumb-optimize --media-root /srv/media cache/ --timeout 30 --verbose
//! thumb-optimize --gif-bin "" --check-tools
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use thumbnail_optimizer::json_output::JsonMessage;
use thumbnail_optimizer::tool_resolver::ToolPathResolver;
use thumbnail_optimizer::{BatchOptimizer, Config, ImageFormat};

#[derive(Parser)]
#[command(name = "thumb-optimize")]
#[command(about = "Shrink generated thumbnails in place with pngquant, gifsicle and jpegoptim")]
struct Args {
    /// Files or directories to optimize, relative to the media root (default: the whole media root)
    paths: Vec<PathBuf>,

    /// JSON config file (default: per-user config dir, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory thumbnail paths are relative to
    #[arg(short, long)]
    media_root: Option<PathBuf>,

    /// PNG optimizer binary ("" disables PNG optimization)
    #[arg(long)]
    png_bin: Option<String>,

    /// GIF optimizer binary ("" disables GIF optimization)
    #[arg(long)]
    gif_bin: Option<String>,

    /// JPEG optimizer binary ("" disables JPEG optimization)
    #[arg(long)]
    jpeg_bin: Option<String>,

    /// Kill an optimizer that runs longer than this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Report which optimizer binaries are available and exit
    #[arg(long)]
    check_tools: bool,

    /// Write the resolved configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Layer command-line overrides over the loaded configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(ref media_root) = self.media_root {
            config.media_root = media_root.clone();
        }
        let overrides = [
            (ImageFormat::Png, &self.png_bin),
            (ImageFormat::Gif, &self.gif_bin),
            (ImageFormat::Jpeg, &self.jpeg_bin),
        ];
        for (format, location) in overrides {
            if let Some(location) = location {
                config.set_binary(format, Some(location.clone()));
            }
        }
        if self.timeout.is_some() {
            config.tool_timeout_secs = self.timeout;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, so JSON lines on stdout stay clean)
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    args.apply_to(&mut config);

    if let Some(ref path) = args.save_config {
        config
            .save_to_file(path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    if args.check_tools {
        print!("{}", ToolPathResolver::new().tools_report(&config));
        return Ok(());
    }

    if let Err(e) = config.validate() {
        if args.json {
            JsonMessage::error("Invalid configuration".to_string(), Some(e.to_string())).emit();
        }
        return Err(e).context("Invalid configuration");
    }

    let stats = BatchOptimizer::new(config, args.json).run(&args.paths).await;
    if stats.errors > 0 {
        return Err(anyhow::anyhow!("{} file(s) could not be optimized", stats.errors));
    }

    Ok(())
}
