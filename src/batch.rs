//! # Batch Optimizer
//!
//! Orchestratore della CLI: applica lo stesso hook usato dal thumbnailer ai
//! thumbnail già presenti su disco.
//!
//! ## Flusso:
//! 1. Espande i path in input (directory ricorsive via `FileManager`)
//! 2. Esegue la pipeline su ogni file, uno alla volta
//! 3. Aggiorna statistiche, progress bar o messaggi JSON
//!
//! L'elaborazione è sequenziale: ogni file usa un path temporaneo derivato dal
//! suo nome e l'hook non coordina accessi concorrenti.

use crate::config::Config;
use crate::file_manager::FileManager;
use crate::image_processor::{ImageProcessor, Outcome, SkipReason};
use crate::json_output::{JsonMessage, JsonTools};
use crate::pipeline::ThumbnailPipeline;
use crate::progress::{OptimizationStats, ProgressManager};
use crate::utils::display_name;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// Runs the optimize-on-create hook over existing thumbnails
pub struct BatchOptimizer {
    pipeline: ThumbnailPipeline,
    config: Config,
    json_output: bool,
    show_progress: bool,
}

impl BatchOptimizer {
    pub fn new(config: Config, json_output: bool) -> Self {
        let pipeline = ThumbnailPipeline::new(config.media_root.clone())
            .with_stage(ImageProcessor::new(config.clone()));
        Self {
            pipeline,
            config,
            json_output,
            show_progress: !json_output,
        }
    }

    /// Disable the progress bar (log-only output).
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Expand inputs into the list of files to process.
    ///
    /// Relative inputs are taken relative to the media root; no inputs means
    /// the whole media root. Explicit files are kept even with an unknown
    /// extension so the hook can report them as unsupported.
    pub fn collect_files(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let roots: Vec<PathBuf> = if inputs.is_empty() {
            vec![self.config.media_root.clone()]
        } else {
            inputs.iter().map(|input| self.pipeline.resolve(input)).collect()
        };

        let mut files = Vec::new();
        for root in roots {
            if root.is_dir() {
                files.extend(FileManager::find_image_files(&root));
            } else {
                files.push(root);
            }
        }
        files
    }

    /// Process every input and return the accumulated statistics.
    pub async fn run(&self, inputs: &[PathBuf]) -> OptimizationStats {
        let start_time = Instant::now();
        let files = self.collect_files(inputs);

        if self.json_output {
            JsonMessage::start(
                self.config.media_root.clone(),
                files.len(),
                JsonTools::from(&self.config),
            )
            .emit();
        } else {
            info!(
                "Optimizing {} thumbnail(s) under {}",
                files.len(),
                self.config.media_root.display()
            );
        }

        let progress = if self.show_progress {
            ProgressManager::new(files.len() as u64)
        } else {
            ProgressManager::hidden()
        };

        let mut stats = OptimizationStats::new();
        for file in &files {
            self.process_file(file, &mut stats).await;
            progress.update(&display_name(file));
        }

        progress.finish(&stats.format_summary());
        let duration = start_time.elapsed().as_secs_f64();
        if self.json_output {
            JsonMessage::complete(&stats, duration).emit();
        } else {
            info!("{} in {:.2}s", stats.format_summary(), duration);
        }
        stats
    }

    async fn process_file(&self, file: &Path, stats: &mut OptimizationStats) {
        match self.pipeline.on_path(file).await {
            Ok(outcomes) => {
                let outcome = outcomes
                    .iter()
                    .find(|stage| stage.outcome.performed())
                    .or_else(|| outcomes.first())
                    .map(|stage| stage.outcome.clone())
                    .unwrap_or_else(|| Outcome::skipped(SkipReason::NotAFile));
                match &outcome {
                    Outcome::Optimized(report) => {
                        stats.add_optimized(report.size_before, report.size_after);
                    }
                    Outcome::Skipped { .. } => {
                        let size = FileManager::file_size(file).await.unwrap_or(0);
                        stats.add_skipped(size);
                    }
                }
                if self.json_output {
                    JsonMessage::file_complete(file.to_path_buf(), &outcome).emit();
                }
            }
            Err(e) => {
                error!("Failed to optimize {}: {}", file.display(), e);
                stats.add_error();
                if self.json_output {
                    JsonMessage::file_failed(file.to_path_buf(), e.to_string()).emit();
                }
            }
        }
    }
}
