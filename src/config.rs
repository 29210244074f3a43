//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione dell'ottimizzatore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con il binario da usare per ogni formato
//! - Risolve la configurazione una sola volta all'avvio; poi viene passata
//!   esplicitamente a `ImageProcessor` e `ThumbnailPipeline`
//! - Caricamento/salvataggio da/verso file JSON
//! - Validazione dei parametri
//!
//! ## Parametri di configurazione:
//! - `png_location`: binario PNG (default: "pngquant")
//! - `gif_location`: binario GIF (default: "gifsicle")
//! - `jpeg_location`: binario JPEG (default: "jpegoptim")
//! - `media_root`: directory base dei thumbnail (default: ".")
//! - `tool_timeout_secs`: timeout opzionale per il processo esterno (default: nessuno)
//!
//! Un location `null` o stringa vuota disabilita il formato. Una chiave assente
//! nel file JSON usa il default.
//!
//! ## Esempio:
//! ```rust
//! use thumbnail_optimizer::Config;
//!
//! let config = Config {
//!     gif_location: Some(String::new()), // GIF disabilitato
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{OptimizeError, Result};
use crate::format::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const CONFIG_DIR_NAME: &str = "thumbnail-optimizer";
const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration for thumbnail optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// PNG optimizer binary (None or empty = disabled)
    #[serde(default = "default_png_location")]
    pub png_location: Option<String>,
    /// GIF optimizer binary (None or empty = disabled)
    #[serde(default = "default_gif_location")]
    pub gif_location: Option<String>,
    /// JPEG optimizer binary (None or empty = disabled)
    #[serde(default = "default_jpeg_location")]
    pub jpeg_location: Option<String>,
    /// Directory thumbnail names are relative to
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Kill the optimizer after this many seconds (None = wait forever)
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

fn default_png_location() -> Option<String> {
    Some(ImageFormat::Png.default_binary().to_string())
}

fn default_gif_location() -> Option<String> {
    Some(ImageFormat::Gif.default_binary().to_string())
}

fn default_jpeg_location() -> Option<String> {
    Some(ImageFormat::Jpeg.default_binary().to_string())
}

fn default_media_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            png_location: default_png_location(),
            gif_location: default_gif_location(),
            jpeg_location: default_jpeg_location(),
            media_root: default_media_root(),
            tool_timeout_secs: None,
        }
    }
}

impl Config {
    /// Binary configured for a format, or `None` when the format is disabled.
    pub fn binary_for(&self, format: ImageFormat) -> Option<&str> {
        let location = match format {
            ImageFormat::Png => self.png_location.as_deref(),
            ImageFormat::Gif => self.gif_location.as_deref(),
            ImageFormat::Jpeg => self.jpeg_location.as_deref(),
        };
        location.map(str::trim).filter(|l| !l.is_empty())
    }

    /// Replace the location for one format.
    pub fn set_binary(&mut self, format: ImageFormat, location: Option<String>) {
        let slot = match format {
            ImageFormat::Png => &mut self.png_location,
            ImageFormat::Gif => &mut self.gif_location,
            ImageFormat::Jpeg => &mut self.jpeg_location,
        };
        *slot = location;
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.media_root.exists() {
            return Err(OptimizeError::Validation(format!(
                "Media root does not exist: {}",
                self.media_root.display()
            )));
        }
        if !self.media_root.is_dir() {
            return Err(OptimizeError::Validation(format!(
                "Media root is not a directory: {}",
                self.media_root.display()
            )));
        }
        if self.tool_timeout_secs == Some(0) {
            return Err(OptimizeError::Validation(
                "Tool timeout must be greater than 0 seconds".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-user config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Resolve the configuration once at startup.
    ///
    /// An explicit path must exist. Without one the per-user file is used when
    /// present, otherwise the built-in defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(OptimizeError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path).await
            }
            None => match Self::default_path() {
                Some(path) => Self::from_file(&path).await,
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from file, falling back to defaults when it is missing.
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
