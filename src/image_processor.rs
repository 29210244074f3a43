//! # Image Processing Module
//!
//! Questo modulo è l'hook "optimize-on-create": riceve il path di un thumbnail
//! appena generato, lancia l'ottimizzatore esterno adatto al formato e, se il
//! tool ha prodotto un file temporaneo non vuoto, lo sostituisce all'originale.
//!
//! ## Pipeline per ogni chiamata
//!
//! 1. **Rilevamento formato**: estensione case-insensitive (png, gif, jpg, jpeg)
//! 2. **Binario configurato**: vuoto o assente = formato disabilitato, skip
//! 3. **Dimensione iniziale**: `stat` dell'originale
//! 4. **Processo esterno**: stdout/stderr catturati e scartati, exit code ignorato
//! 5. **Controllo del file temporaneo**: assente o vuoto = nessun miglioramento, skip
//! 6. **Sostituzione atomica**: `rename` + permessi `rw-rw-r--`
//! 7. **Log**: nome, dimensione prima/dopo, durata
//!
//! ## Error Handling
//!
//! Best-effort: tool mancante, tool fallito, `--skip-if-larger` scattato o
//! timeout non sono errori. Il thumbnail originale resta valido e servibile.
//! Solo gli errori reali di filesystem (stat, rename, chmod) vengono propagati.
//!
//! ## Esempio
//!
//! ```rust,no_run
//! use thumbnail_optimizer::{Config, ImageProcessor};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), thumbnail_optimizer::OptimizeError> {
//! let processor = ImageProcessor::new(Config::default());
//! let outcome = processor.optimize(Path::new("/srv/media/cache/photo.png")).await?;
//! if outcome.performed() {
//!     // il file su disco è ora la versione ottimizzata
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::format::ImageFormat;
use crate::utils::display_name;
use serde::Serialize;
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Why an optimization did not replace the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Extension is not png, gif, jpg or jpeg
    UnsupportedFormat,
    /// Binary location empty or absent
    Disabled,
    /// Thumbnail path is not an existing regular file
    NotAFile,
    /// Temp file absent: tool missing, failed, or declined to shrink
    NoOutput,
    /// Tool left an empty temp file
    EmptyOutput,
    /// Tool exceeded the configured timeout and was killed
    TimedOut,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::Disabled => "optimizer disabled",
            Self::NotAFile => "not a regular file",
            Self::NoOutput => "no optimized output",
            Self::EmptyOutput => "empty optimized output",
            Self::TimedOut => "optimizer timed out",
        };
        f.write_str(text)
    }
}

/// What a successful optimization did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ImageFormat,
    pub size_before: u64,
    pub size_after: u64,
    pub elapsed: Duration,
}

impl OptimizationReport {
    pub fn bytes_saved(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }

    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.size_before, self.size_after)
    }
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reduced {} from {} to {} (took {:.4}s)",
            self.file_name,
            self.size_before,
            self.size_after,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Result of running the hook on one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Optimized(OptimizationReport),
    Skipped { reason: SkipReason },
}

impl Outcome {
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// True when the file on disk was replaced.
    pub fn performed(&self) -> bool {
        matches!(self, Self::Optimized(_))
    }

    pub fn report(&self) -> Option<&OptimizationReport> {
        match self {
            Self::Optimized(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Optimized(_) => None,
            Self::Skipped { reason } => Some(*reason),
        }
    }
}

/// How the external process ended, as far as the hook cares
enum ToolRun {
    Finished,
    TimedOut,
}

/// Size of the optimizer's temp file, or `None` when there is nothing to use.
///
/// A missing file is the normal "no improvement" answer (`--skip-if-larger`);
/// any other failure is logged before being treated the same way.
fn temp_output_size(tmp_path: &Path, metadata: io::Result<Metadata>) -> Option<u64> {
    match metadata {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        Ok(_) => {
            warn!("{} is not a regular file, ignoring it", tmp_path.display());
            None
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Cannot inspect {}: {}", tmp_path.display(), e);
            None
        }
    }
}

/// Optimize-on-create hook for PNG, GIF and JPEG thumbnails.
///
/// Holds the configuration resolved at startup; every call is independent and
/// blocks until the external optimizer exits (or the optional timeout fires).
///
/// The temp file name is derived from the source name, so two concurrent calls
/// on the same path race on it. Callers serialize creation per destination.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: Config,
}

impl ImageProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the matching optimizer on a finished thumbnail.
    ///
    /// Returns `Outcome::Skipped` for every "no improvement" case and an error
    /// only when the filesystem itself fails.
    pub async fn optimize(&self, path: &Path) -> Result<Outcome> {
        let Some(format) = ImageFormat::from_path(path) else {
            debug!("No optimizer for {}", path.display());
            return Ok(Outcome::skipped(SkipReason::UnsupportedFormat));
        };
        self.optimize_as(format, path).await
    }

    /// Same as `optimize` with the format already decided.
    pub async fn optimize_as(&self, format: ImageFormat, path: &Path) -> Result<Outcome> {
        let Some(binary) = self.config.binary_for(format) else {
            debug!("{} optimization disabled, leaving {}", format, path.display());
            return Ok(Outcome::skipped(SkipReason::Disabled));
        };

        let tmp_path = format.temp_path_for(path);
        let size_before = FileManager::file_size(path).await?;

        // A leftover from an interrupted run would look like fresh output.
        FileManager::remove_if_exists(&tmp_path).await?;

        let args = format.command_args(path, &tmp_path);
        debug!("Running {} {:?}", binary, args);

        let start_time = Instant::now();
        let run = self.run_tool(binary, &args).await;
        let elapsed = start_time.elapsed();

        if let ToolRun::TimedOut = run {
            warn!(
                "{} did not finish within {:?} on {}, leaving original",
                binary,
                self.config.tool_timeout(),
                path.display()
            );
            if let Err(e) = FileManager::remove_if_exists(&tmp_path).await {
                warn!("Failed to clean up {}: {}", tmp_path.display(), e);
            }
            return Ok(Outcome::skipped(SkipReason::TimedOut));
        }

        let tmp_size = match temp_output_size(&tmp_path, tokio::fs::metadata(&tmp_path).await) {
            Some(size) => size,
            None => {
                debug!("{} produced no output for {}", binary, path.display());
                return Ok(Outcome::skipped(SkipReason::NoOutput));
            }
        };
        if tmp_size == 0 {
            debug!("{} produced an empty file for {}", binary, path.display());
            FileManager::remove_if_exists(&tmp_path).await?;
            return Ok(Outcome::skipped(SkipReason::EmptyOutput));
        }

        FileManager::replace_atomically(&tmp_path, path).await?;
        let size_after = FileManager::file_size(path).await?;

        let report = OptimizationReport {
            path: path.to_path_buf(),
            file_name: display_name(path),
            format,
            size_before,
            size_after,
            elapsed,
        };
        info!(
            file = %report.file_name,
            size_before,
            size_after,
            elapsed_secs = elapsed.as_secs_f64(),
            "{}",
            report
        );

        Ok(Outcome::Optimized(report))
    }

    /// Spawn the optimizer and wait for it, swallowing its output.
    ///
    /// Spawn failures (missing binary, not executable) count as a finished run:
    /// the absent temp file reports them.
    async fn run_tool(&self, binary: &str, args: &[String]) -> ToolRun {
        let child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to start {}: {}", binary, e);
                return ToolRun::Finished;
            }
        };

        let output = child.wait_with_output();
        let result = match self.config.tool_timeout() {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => return ToolRun::TimedOut,
            },
            None => output.await,
        };

        match result {
            Ok(output) => debug!(
                "{} exited with {} ({} bytes stdout, {} bytes stderr)",
                binary,
                output.status,
                output.stdout.len(),
                output.stderr.len()
            ),
            Err(e) => debug!("Failed waiting for {}: {}", binary, e),
        }
        ToolRun::Finished
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{fake_tool, spawn_guard};
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn config_with(png: &str, gif: &str, jpeg: &str) -> Config {
        Config {
            png_location: Some(png.to_string()),
            gif_location: Some(gif.to_string()),
            jpeg_location: Some(jpeg.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_png_scenario_shrinks_and_reports() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        // pngquant argv: -o <tmp> --skip-if-larger --quality=85 <path>
        let tool = fake_tool(dir.path(), "pngquant", r#"head -c 6000 /dev/zero > "$2""#);
        let photo = dir.path().join("photo.PNG");
        std::fs::write(&photo, vec![7u8; 10000]).unwrap();
        std::fs::set_permissions(&photo, std::fs::Permissions::from_mode(0o600)).unwrap();

        let processor = ImageProcessor::new(config_with(tool.to_str().unwrap(), "", ""));
        let outcome = processor.optimize(&photo).await.unwrap();

        assert!(outcome.performed());
        let report = outcome.report().unwrap();
        assert_eq!(report.file_name, "photo.PNG");
        assert_eq!(report.size_before, 10000);
        assert_eq!(report.size_after, 6000);
        assert_eq!(report.bytes_saved(), 4000);

        let line = report.to_string();
        assert!(line.contains("photo.PNG"));
        assert!(line.contains("10000"));
        assert!(line.contains("6000"));

        assert_eq!(std::fs::read(&photo).unwrap(), vec![0u8; 6000]);
        let mode = std::fs::metadata(&photo).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
        assert!(!dir.path().join("photo.tmp.png").exists());
    }

    #[tokio::test]
    async fn test_gif_writes_to_temp_path() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        // gifsicle argv: -O3 <path> -o <tmp>
        let tool = fake_tool(dir.path(), "gifsicle", r#"printf 'GIF89a' > "$4""#);
        let anim = dir.path().join("anim.gif");
        std::fs::write(&anim, vec![1u8; 500]).unwrap();

        let processor = ImageProcessor::new(config_with("", tool.to_str().unwrap(), ""));
        let outcome = processor.optimize(&anim).await.unwrap();

        assert!(outcome.performed());
        assert_eq!(std::fs::read(&anim).unwrap(), b"GIF89a");
    }

    #[tokio::test]
    async fn test_jpeg_replaced_only_when_temp_file_appears() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        // jpegoptim argv: --max=85 --strip-all <path>; the hook looks for <stem>.tmp.jpg
        let tool = fake_tool(
            dir.path(),
            "jpegoptim",
            r#"p="$3"; printf 'small' > "${p%.*}.tmp.jpg""#,
        );
        let icon = dir.path().join("icon.jpg");
        std::fs::write(&icon, vec![3u8; 300]).unwrap();

        let processor = ImageProcessor::new(config_with("", "", tool.to_str().unwrap()));
        let outcome = processor.optimize(&icon).await.unwrap();

        assert!(outcome.performed());
        assert_eq!(std::fs::read(&icon).unwrap(), b"small");
    }

    #[tokio::test]
    async fn test_disabled_formats_are_untouched() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let tool = fake_tool(dir.path(), "any", &format!("touch '{}'", marker.display()));
        let tool = tool.to_str().unwrap();

        let processor = ImageProcessor::new(Config {
            png_location: Some(String::new()),
            gif_location: Some(String::new()),
            jpeg_location: None,
            ..Default::default()
        });
        for name in ["a.png", "anim.gif", "b.jpeg"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"original").unwrap();
            let outcome = processor.optimize(&path).await.unwrap();
            assert_eq!(outcome.skip_reason(), Some(SkipReason::Disabled));
            assert!(!outcome.performed());
            assert_eq!(std::fs::read(&path).unwrap(), b"original");
        }
        assert!(!marker.exists(), "{} must not have been spawned", tool);
    }

    #[tokio::test]
    async fn test_unsupported_extension_spawns_nothing() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let tool = fake_tool(dir.path(), "any", &format!("touch '{}'", marker.display()));
        let tool = tool.to_str().unwrap();

        let processor = ImageProcessor::new(config_with(tool, tool, tool));
        for name in ["doc.txt", "pic.webp", "noext", "x.png.orig"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"data").unwrap();
            let outcome = processor.optimize(&path).await.unwrap();
            assert_eq!(outcome.skip_reason(), Some(SkipReason::UnsupportedFormat));
        }
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_leaves_original() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let icon = dir.path().join("icon.jpg");
        std::fs::write(&icon, b"jpeg bytes").unwrap();

        let processor = ImageProcessor::new(config_with(
            "",
            "",
            "/definitely/not/installed/jpegoptim",
        ));
        let outcome = processor.optimize(&icon).await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::NoOutput));
        assert_eq!(std::fs::read(&icon).unwrap(), b"jpeg bytes");
        assert!(!dir.path().join("icon.tmp.jpg").exists());
    }

    #[tokio::test]
    async fn test_failing_tool_without_output_is_a_skip() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(dir.path(), "pngquant", "echo 'skipped: larger' >&2; exit 98");
        let path = dir.path().join("thumb.png");
        std::fs::write(&path, vec![9u8; 64]).unwrap();

        let processor = ImageProcessor::new(config_with(tool.to_str().unwrap(), "", ""));
        let outcome = processor.optimize(&path).await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::NoOutput));
        assert_eq!(std::fs::read(&path).unwrap(), vec![9u8; 64]);
    }

    #[tokio::test]
    async fn test_empty_output_is_discarded() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(dir.path(), "gifsicle", r#": > "$4""#);
        let path = dir.path().join("anim.gif");
        std::fs::write(&path, b"GIF89a-original").unwrap();

        let processor = ImageProcessor::new(config_with("", tool.to_str().unwrap(), ""));
        let outcome = processor.optimize(&path).await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::EmptyOutput));
        assert_eq!(std::fs::read(&path).unwrap(), b"GIF89a-original");
        assert!(!dir.path().join("anim.tmp.gif").exists());
    }

    #[tokio::test]
    async fn test_stale_temp_file_is_not_mistaken_for_output() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(dir.path(), "pngquant", "exit 0");
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"original").unwrap();
        std::fs::write(dir.path().join("a.tmp.png"), b"stale").unwrap();

        let processor = ImageProcessor::new(config_with(tool.to_str().unwrap(), "", ""));
        let outcome = processor.optimize(&path).await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::NoOutput));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_unremovable_stale_temp_is_an_error() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let tool = fake_tool(dir.path(), "pngquant", &format!("touch '{}'", marker.display()));
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"original").unwrap();
        // unlink fails on a directory, so the stale entry cannot be cleared
        let stale = dir.path().join("a.tmp.png");
        std::fs::create_dir(&stale).unwrap();
        std::fs::write(stale.join("leftover"), b"stale").unwrap();

        let processor = ImageProcessor::new(config_with(tool.to_str().unwrap(), "", ""));
        let result = processor.optimize(&path).await;

        assert!(result.is_err());
        assert!(!marker.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn test_temp_output_size_only_reads_regular_files() {
        let dir = TempDir::new().unwrap();
        let tmp = dir.path().join("a.tmp.png");

        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(temp_output_size(&tmp, Err(missing)), None);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(temp_output_size(&tmp, Err(denied)), None);

        assert_eq!(temp_output_size(&tmp, std::fs::metadata(dir.path())), None);
        std::fs::write(&tmp, b"12345").unwrap();
        assert_eq!(temp_output_size(&tmp, std::fs::metadata(&tmp)), Some(5));
    }

    #[tokio::test]
    async fn test_timeout_kills_hung_tool() {
        let _guard = spawn_guard();
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(dir.path(), "pngquant", r#"printf 'partial' > "$2"; exec sleep 30"#);
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"original").unwrap();

        let mut config = config_with(tool.to_str().unwrap(), "", "");
        config.tool_timeout_secs = Some(1);
        let processor = ImageProcessor::new(config);
        let outcome = processor.optimize(&path).await.unwrap();

        assert_eq!(outcome.skip_reason(), Some(SkipReason::TimedOut));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert!(!dir.path().join("a.tmp.png").exists());
    }

    #[tokio::test]
    async fn test_missing_original_is_an_error() {
        let dir = TempDir::new().unwrap();
        let processor = ImageProcessor::new(Config::default());
        let result = processor.optimize(&dir.path().join("gone.png")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::skipped(SkipReason::NoOutput)).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "no_output");
    }
}
