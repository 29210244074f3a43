//! # JSON Output Module
//!
//! Output strutturato in JSON per chi lancia `thumb-optimize` da un altro
//! processo (job di manutenzione, script di deploy).
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del batch
//! - `file_complete`: esito di un file (ottimizzato, saltato, errore)
//! - `complete`: statistiche finali
//! - `error`: errore generale
//!
//! Un messaggio per riga su stdout.

use crate::image_processor::{Outcome, SkipReason};
use crate::progress::OptimizationStats;
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del batch
    Start {
        media_root: PathBuf,
        total_files: usize,
        tools: JsonTools,
    },

    /// Fine elaborazione di un file
    FileComplete {
        path: PathBuf,
        optimized: bool,
        original_size: Option<u64>,
        optimized_size: Option<u64>,
        reduction_percent: Option<f64>,
        skip_reason: Option<SkipReason>,
        error: Option<String>,
    },

    /// Batch completato
    Complete {
        files_processed: usize,
        files_optimized: usize,
        files_skipped: usize,
        errors: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        duration_seconds: f64,
    },

    /// Errore generale
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Binari attivi per formato (None = disabilitato)
#[derive(Debug, Serialize)]
pub struct JsonTools {
    pub png: Option<String>,
    pub gif: Option<String>,
    pub jpeg: Option<String>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(media_root: PathBuf, total_files: usize, tools: JsonTools) -> Self {
        Self::Start {
            media_root,
            total_files,
            tools,
        }
    }

    /// Messaggio di completamento per un file elaborato senza errori
    pub fn file_complete(path: PathBuf, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Optimized(report) => Self::FileComplete {
                path,
                optimized: true,
                original_size: Some(report.size_before),
                optimized_size: Some(report.size_after),
                reduction_percent: Some(report.reduction_percent()),
                skip_reason: None,
                error: None,
            },
            Outcome::Skipped { reason } => Self::FileComplete {
                path,
                optimized: false,
                original_size: None,
                optimized_size: None,
                reduction_percent: None,
                skip_reason: Some(*reason),
                error: None,
            },
        }
    }

    /// Messaggio di completamento per un file fallito
    pub fn file_failed(path: PathBuf, error: String) -> Self {
        Self::FileComplete {
            path,
            optimized: false,
            original_size: None,
            optimized_size: None,
            reduction_percent: None,
            skip_reason: None,
            error: Some(error),
        }
    }

    pub fn complete(stats: &OptimizationStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_optimized: stats.files_optimized,
            files_skipped: stats.files_skipped,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            average_reduction: stats.overall_reduction_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&crate::Config> for JsonTools {
    fn from(config: &crate::Config) -> Self {
        use crate::format::ImageFormat;
        Self {
            png: config.binary_for(ImageFormat::Png).map(str::to_string),
            gif: config.binary_for(ImageFormat::Gif).map(str::to_string),
            jpeg: config.binary_for(ImageFormat::Jpeg).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageFormat;
    use crate::image_processor::OptimizationReport;
    use std::time::Duration;

    #[test]
    fn test_file_complete_optimized() {
        let outcome = Outcome::Optimized(OptimizationReport {
            path: PathBuf::from("/m/photo.PNG"),
            file_name: "photo.PNG".to_string(),
            format: ImageFormat::Png,
            size_before: 10000,
            size_after: 6000,
            elapsed: Duration::from_millis(12),
        });
        let msg = JsonMessage::file_complete(PathBuf::from("/m/photo.PNG"), &outcome);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "file_complete");
        assert_eq!(json["optimized"], true);
        assert_eq!(json["original_size"], 10000);
        assert_eq!(json["optimized_size"], 6000);
        assert_eq!(json["reduction_percent"], 40.0);
    }

    #[test]
    fn test_file_complete_skipped() {
        let outcome = Outcome::skipped(SkipReason::Disabled);
        let msg = JsonMessage::file_complete(PathBuf::from("/m/anim.gif"), &outcome);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["optimized"], false);
        assert_eq!(json["skip_reason"], "disabled");
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_complete_carries_stats() {
        let mut stats = OptimizationStats::new();
        stats.add_optimized(100, 50);
        let json = serde_json::to_value(JsonMessage::complete(&stats, 1.5)).unwrap();

        assert_eq!(json["type"], "complete");
        assert_eq!(json["files_optimized"], 1);
        assert_eq!(json["total_bytes_saved"], 50);
        assert_eq!(json["average_reduction"], 50.0);
    }

    #[test]
    fn test_tools_from_config() {
        let config = crate::Config {
            gif_location: None,
            ..Default::default()
        };
        let tools = JsonTools::from(&config);
        assert_eq!(tools.png.as_deref(), Some("pngquant"));
        assert_eq!(tools.gif, None);
    }
}
