//! # Thumbnail Optimizer Library
//!
//! Hook "optimize-on-create" per pipeline di thumbnail: dopo che un thumbnail è
//! stato scritto su disco, lancia l'ottimizzatore esterno del formato
//! (pngquant, gifsicle, jpegoptim) e sostituisce atomicamente il file se il tool
//! ha prodotto un risultato.
//!
//! ## Architettura dei moduli:
//! - `config`: binari per formato, media root, timeout opzionale
//! - `error`: tipi di errore della libreria
//! - `format`: dispatch per estensione e argomenti dei tool
//! - `image_processor`: l'hook vero e proprio
//! - `pipeline`: composizione degli step post-creazione
//! - `file_manager`: sostituzione atomica, permessi, discovery
//! - `tool_resolver`: report di disponibilità dei tool
//! - `batch`, `progress`, `json_output`: supporto alla CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use thumbnail_optimizer::{Config, ImageProcessor, ThumbnailPipeline};
//!
//! # async fn run() -> Result<(), thumbnail_optimizer::OptimizeError> {
//! let config = Config::load(None).await?;
//! let pipeline = ThumbnailPipeline::new(config.media_root.clone())
//!     .with_stage(ImageProcessor::new(config));
//!
//! pipeline
//!     .create("cache/4f/photo.png", |path| async move {
//!         // il thumbnailer esterno scrive `path` qui
//!         # let _ = path;
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod image_processor;
pub mod json_output;
pub mod pipeline;
pub mod progress;
pub mod tool_resolver;
pub mod utils;

pub use batch::BatchOptimizer;
pub use config::Config;
pub use error::OptimizeError;
pub use format::ImageFormat;
pub use image_processor::{ImageProcessor, OptimizationReport, Outcome, SkipReason};
pub use pipeline::{FnStage, StageOutcome, ThumbnailPipeline, ThumbnailStage};
