//! # Tool Path Resolver
//!
//! Finds the configured optimizer binaries so `thumb-optimize --check-tools`
//! can report what will actually run. Availability is informational: the hook
//! never refuses to spawn a tool because it was not found here.

use crate::config::Config;
use crate::format::ImageFormat;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Availability of one format's optimizer
#[derive(Debug, Clone, PartialEq)]
pub enum ToolStatus {
    Disabled,
    Found(PathBuf),
    Missing(String),
}

/// Tool path resolver over `PATH`
pub struct ToolPathResolver {
    search_path: Vec<PathBuf>,
}

impl ToolPathResolver {
    /// Resolver over the current process `PATH`.
    pub fn new() -> Self {
        let search_path = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { search_path }
    }

    /// Resolver over an explicit list of directories.
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Resolve a configured location.
    ///
    /// A location with a directory part must exist as a file; a bare name is
    /// looked up in the search path.
    pub fn resolve(&self, location: &str) -> Option<PathBuf> {
        let candidate = Path::new(location);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            debug!("Checking explicit tool path {:?}", candidate);
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        let extension = if cfg!(windows) { ".exe" } else { "" };
        let file_name = format!("{}{}", location, extension);
        self.search_path
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
    }

    /// Status of the optimizer configured for one format.
    pub fn status(&self, config: &Config, format: ImageFormat) -> ToolStatus {
        match config.binary_for(format) {
            None => ToolStatus::Disabled,
            Some(location) => match self.resolve(location) {
                Some(path) => ToolStatus::Found(path),
                None => ToolStatus::Missing(location.to_string()),
            },
        }
    }

    /// Get a report of tool availability
    pub fn tools_report(&self, config: &Config) -> String {
        let mut report = String::from("Thumbnail optimizer tools:\n");
        for format in ImageFormat::ALL {
            let line = match self.status(config, format) {
                ToolStatus::Disabled => format!("  - {}: disabled\n", format),
                ToolStatus::Found(path) => format!("  ✅ {}: {}\n", format, path.display()),
                ToolStatus::Missing(location) => {
                    if cfg!(target_os = "linux") {
                        format!(
                            "  ❌ {}: {} not found (install with: {})\n",
                            format,
                            location,
                            Self::linux_install_instructions(format)
                        )
                    } else {
                        format!("  ❌ {}: {} not found\n", format, location)
                    }
                }
            };
            report.push_str(&line);
        }
        report.push_str("\nMissing tools only disable optimization; thumbnails are left as generated.\n");
        report
    }

    fn linux_install_instructions(format: ImageFormat) -> &'static str {
        match format {
            ImageFormat::Png => "sudo apt-get install pngquant",
            ImageFormat::Gif => "sudo apt-get install gifsicle",
            ImageFormat::Jpeg => "sudo apt-get install jpegoptim",
        }
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
