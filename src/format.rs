//! # Image Format Dispatch
//!
//! Questo modulo decide quale ottimizzatore esterno usare per un thumbnail.
//!
//! ## Responsabilità:
//! - Riconoscimento formato dall'estensione (case-insensitive)
//! - Nome di default del binario per ogni formato
//! - Calcolo del path temporaneo accanto all'originale
//! - Costruzione degli argomenti fissi passati al tool
//!
//! ## Tabella:
//!
//! | Formato | Estensioni     | Tool      | Argomenti                                        |
//! |---------|----------------|-----------|--------------------------------------------------|
//! | PNG     | png            | pngquant  | `-o <tmp> --skip-if-larger --quality=85 <path>`  |
//! | GIF     | gif            | gifsicle  | `-O3 <path> -o <tmp>`                            |
//! | JPEG    | jpg, jpeg      | jpegoptim | `--max=85 --strip-all <path>`                    |
//!
//! jpegoptim non riceve il path temporaneo: riscrive il file sul posto.
//! L'hook continua comunque a cercare `<stem>.tmp.jpg`, vedi DESIGN.md.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Quality ceiling handed to pngquant and jpegoptim.
pub const QUALITY: u8 = 85;

/// Image formats with a configured optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Gif,
    Jpeg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Gif, ImageFormat::Jpeg];

    /// Detect the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Binary name used when the configuration does not mention this format.
    pub fn default_binary(self) -> &'static str {
        match self {
            Self::Png => "pngquant",
            Self::Gif => "gifsicle",
            Self::Jpeg => "jpegoptim",
        }
    }

    /// Extension used for the temporary output file.
    pub fn temp_extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
        }
    }

    /// `<dir>/<stem>.tmp.<ext>` next to the original.
    pub fn temp_path_for(self, path: &Path) -> PathBuf {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        path.with_file_name(format!("{}.tmp.{}", stem, self.temp_extension()))
    }

    /// Arguments after the binary name.
    pub fn command_args(self, path: &Path, tmp: &Path) -> Vec<String> {
        let path = path.display();
        let tmp = tmp.display();
        match self {
            Self::Png => crate::args![
                "-o",
                tmp,
                "--skip-if-larger",
                format!("--quality={}", QUALITY),
                path
            ],
            Self::Gif => crate::args!["-O3", path, "-o", tmp],
            Self::Jpeg => crate::args![format!("--max={}", QUALITY), "--strip-all", path],
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Jpeg => "JPEG",
        };
        f.write_str(name)
    }
}
