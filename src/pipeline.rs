//! # Thumbnail Pipeline
//!
//! Composizione esplicita degli step che girano dopo la creazione di un
//! thumbnail. Il thumbnailer esterno produce il file; la pipeline lo risolve
//! sotto `media_root` e lo passa, in ordine, a ogni `ThumbnailStage`.
//!
//! ```rust,no_run
//! use thumbnail_optimizer::{Config, ImageProcessor, ThumbnailPipeline};
//!
//! # async fn run() -> Result<(), thumbnail_optimizer::OptimizeError> {
//! let config = Config::load(None).await?;
//! let pipeline = ThumbnailPipeline::new(config.media_root.clone())
//!     .with_stage(ImageProcessor::new(config));
//!
//! let outcomes = pipeline.on_thumbnail_created("cache/ab/cd/photo.png").await?;
//! # let _ = outcomes;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::file_manager::FileManager;
use crate::image_processor::{ImageProcessor, Outcome, SkipReason};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A step that runs on a finished thumbnail file.
///
/// Uses `async_trait` so stages can live in a `Vec<Box<dyn ThumbnailStage>>`.
#[async_trait]
pub trait ThumbnailStage: Send + Sync {
    /// Stage name for logs and reports.
    fn name(&self) -> &str;

    async fn process(&self, path: &Path) -> Result<Outcome>;
}

#[async_trait]
impl ThumbnailStage for ImageProcessor {
    fn name(&self) -> &str {
        "optimize"
    }

    async fn process(&self, path: &Path) -> Result<Outcome> {
        self.optimize(path).await
    }
}

type StageFn = dyn Fn(PathBuf) -> BoxFuture<'static, Result<Outcome>> + Send + Sync;

/// Stage built from a closure
pub struct FnStage {
    name: String,
    func: Box<StageFn>,
}

impl FnStage {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(PathBuf) -> BoxFuture<'static, Result<Outcome>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl ThumbnailStage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, path: &Path) -> Result<Outcome> {
        (self.func)(path.to_path_buf()).await
    }
}

/// Outcome of one stage for one thumbnail
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: String,
    pub outcome: Outcome,
}

/// Ordered list of post-create stages rooted at the media directory
pub struct ThumbnailPipeline {
    media_root: PathBuf,
    stages: Vec<Box<dyn ThumbnailStage>>,
}

impl ThumbnailPipeline {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl ThumbnailStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_fn<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(PathBuf) -> BoxFuture<'static, Result<Outcome>> + Send + Sync + 'static,
    {
        self.with_stage(FnStage::new(name, func))
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Absolute location of a thumbnail name.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        self.media_root.join(name)
    }

    /// Run every stage on `media_root/name`.
    ///
    /// When the file is missing or not a regular file every stage reports
    /// `NotAFile` and nothing runs.
    pub async fn on_thumbnail_created(&self, name: impl AsRef<Path>) -> Result<Vec<StageOutcome>> {
        self.on_path(&self.resolve(name)).await
    }

    /// Run the base creation step, then the stages.
    pub async fn create<F, Fut>(&self, name: impl AsRef<Path>, base: F) -> Result<Vec<StageOutcome>>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let path = self.resolve(name);
        base(path.clone()).await?;
        self.on_path(&path).await
    }

    /// Run every stage on a path that is already resolved under the media root.
    pub async fn on_path(&self, path: &Path) -> Result<Vec<StageOutcome>> {
        if !FileManager::is_regular_file(path).await {
            debug!("{} is not a regular file, skipping stages", path.display());
            return Ok(self
                .stages
                .iter()
                .map(|stage| StageOutcome {
                    stage: stage.name().to_string(),
                    outcome: Outcome::skipped(SkipReason::NotAFile),
                })
                .collect());
        }

        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let outcome = stage.process(path).await?;
            debug!("Stage {} on {}: {:?}", stage.name(), path.display(), outcome.skip_reason());
            outcomes.push(StageOutcome {
                stage: stage.name().to_string(),
                outcome,
            });
        }
        Ok(outcomes)
    }
}
