//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file dei thumbnail.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei thumbnail in una directory (per la CLI)
//! - Sostituzione atomica dell'originale con l'output dell'ottimizzatore
//! - Permessi finali `rw-rw-r--`
//! - Utilità per dimensioni e percentuali di riduzione
//!
//! ## Sostituzione atomica:
//! Il file temporaneo vive nella stessa directory dell'originale, quindi
//! `rename` non attraversa filesystem e in ogni istante il path contiene o il
//! vecchio contenuto o quello nuovo.

use crate::format::ImageFormat;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Final mode of a replaced thumbnail: owner rw, group rw, other r.
pub const THUMBNAIL_MODE: u32 = 0o664;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Size in bytes
    pub async fn file_size(path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// True only for an existing regular file (symlinks are followed).
    pub async fn is_regular_file(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Remove a file, treating "not found" as success.
    pub async fn remove_if_exists(path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Rename `tmp` over `original` and reset its permissions.
    pub async fn replace_atomically(tmp: &Path, original: &Path) -> io::Result<()> {
        fs::rename(tmp, original).await?;
        Self::set_thumbnail_permissions(original).await
    }

    #[cfg(unix)]
    async fn set_thumbnail_permissions(path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(THUMBNAIL_MODE)).await
    }

    #[cfg(not(unix))]
    async fn set_thumbnail_permissions(path: &Path) -> io::Result<()> {
        let mut perms = fs::metadata(path).await?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(path, perms).await
    }

    /// Find every optimizable thumbnail under `root`, sorted.
    ///
    /// Leftover `*.tmp.<ext>` files from an interrupted run are not returned.
    pub fn find_image_files(root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| ImageFormat::from_path(p).is_some() && !Self::is_temp_artifact(p))
            .collect();
        files.sort();
        files
    }

    /// True for names like `photo.tmp.png` that this crate writes itself.
    pub fn is_temp_artifact(path: &Path) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase().ends_with(".tmp"))
            .unwrap_or(false)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_image_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("cache").join("ab");
        std::fs::create_dir_all(&nested).unwrap();
        for name in ["b.PNG", "a.jpeg", "notes.txt", "c.tmp.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(nested.join("anim.gif"), b"x").unwrap();

        let files = FileManager::find_image_files(dir.path());
        let expected = vec![
            dir.path().join("a.jpeg"),
            dir.path().join("b.PNG"),
            nested.join("anim.gif"),
        ];
        let mut expected_sorted = expected.clone();
        expected_sorted.sort();
        assert_eq!(files, expected_sorted);
    }

    #[test]
    fn test_is_temp_artifact() {
        assert!(FileManager::is_temp_artifact(Path::new("/m/photo.tmp.png")));
        assert!(FileManager::is_temp_artifact(Path::new("/m/PHOTO.TMP.JPG")));
        assert!(!FileManager::is_temp_artifact(Path::new("/m/photo.png")));
        assert!(!FileManager::is_temp_artifact(Path::new("/m/tmp.png")));
    }

    #[tokio::test]
    async fn test_replace_atomically_swaps_content() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("photo.png");
        let tmp = dir.path().join("photo.tmp.png");
        std::fs::write(&original, vec![1u8; 100]).unwrap();
        std::fs::write(&tmp, vec![2u8; 40]).unwrap();

        FileManager::replace_atomically(&tmp, &original).await.unwrap();

        assert!(!tmp.exists());
        assert_eq!(std::fs::read(&original).unwrap(), vec![2u8; 40]);
        assert_eq!(FileManager::file_size(&original).await.unwrap(), 40);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&original).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, THUMBNAIL_MODE);
        }
    }

    #[tokio::test]
    async fn test_replace_atomically_missing_tmp_is_an_error() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("photo.png");
        std::fs::write(&original, b"keep").unwrap();

        let result = FileManager::replace_atomically(&dir.path().join("gone.tmp.png"), &original).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read(&original).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.tmp.gif");
        FileManager::remove_if_exists(&path).await.unwrap();

        std::fs::write(&path, b"x").unwrap();
        FileManager::remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_is_regular_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        assert!(FileManager::is_regular_file(&file).await);
        assert!(!FileManager::is_regular_file(dir.path()).await);
        assert!(!FileManager::is_regular_file(&dir.path().join("missing.png")).await);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(10000, 6000), 40.0);
        assert_eq!(FileManager::calculate_reduction(0, 0), 0.0);
    }
}
