//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la classificazione
//! delle sorgenti.
//!
//! ## Responsabilità:
//! - Determinazione formato file (immagine vs passthrough)
//! - Riconoscimento del marker `_orig.` sulle sorgenti da convertire
//! - Copia verbatim dei file non-immagine nell'albero di output
//! - Strip EXIF sulle direct copy per i formati che lo supportano
//!
//! ## Formati immagine gestiti:
//! - JPG, JPEG, PNG, AVIF, WebP
//! - EXIF strip: solo JPG, JPEG, WebP (AVIF/PNG non lo portano in copia)
//!
//! ## Marker:
//! Un'immagine viene convertita solo se il nome contiene `_orig.`
//! (es. `tramonto_orig.jpg`). Immagini senza marker vengono registrate
//! come errore e saltate.

use crate::platform::PlatformCommands;
use anyhow::Result;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Image extensions the converter handles
pub const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "avif", "webp"];

/// Formats whose direct copies may carry EXIF worth stripping
pub const EXIF_EXTS: &[&str] = &["jpg", "jpeg", "webp"];

/// Filename marker identifying an unprocessed original awaiting conversion
pub const ORIG_MARKER: &str = "_orig.";

/// Manages file classification and passthrough operations
pub struct FileManager;

impl FileManager {
    /// Check if a file is a convertible image
    pub fn is_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Check if a file's format carries EXIF in a verbatim copy
    pub fn is_exif_format(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            EXIF_EXTS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Split a marked filename into (base, extension).
    ///
    /// `"sunset_orig.jpg"` -> `Some(("sunset", "jpg"))`. Returns `None` for
    /// unmarked names.
    pub fn split_marker(file_name: &str) -> Option<(&str, &str)> {
        let index = file_name.find(ORIG_MARKER)?;
        let base = &file_name[..index];
        let ext = &file_name[index + ORIG_MARKER.len()..];
        Some((base, ext))
    }

    /// Copy a file verbatim to the destination path
    pub async fn copy_verbatim(source: &Path, dest: &Path) -> Result<()> {
        fs::copy(source, dest).await?;
        debug!("Copied verbatim: {} -> {}", source.display(), dest.display());
        Ok(())
    }

    /// Strip identifying metadata from a delivered copy, for formats that
    /// carry it. Degrades to a warning when exiftool is not installed.
    pub async fn strip_exif(path: &Path) -> Result<()> {
        if !Self::is_exif_format(path) {
            return Ok(());
        }

        let platform = PlatformCommands::instance();
        if !platform.is_command_available("exiftool").await {
            warn!(
                "exiftool not available, EXIF left in place for {}",
                path.display()
            );
            return Ok(());
        }

        let status = tokio::process::Command::new(platform.get_command("exiftool"))
            .args(["-all=", "-overwrite_original"])
            .arg(path)
            .status()
            .await?;

        if !status.success() {
            warn!("exiftool failed to strip EXIF from {}", path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_image() {
        assert!(FileManager::is_image(&PathBuf::from("a/photo_orig.JPG")));
        assert!(FileManager::is_image(&PathBuf::from("photo_orig.avif")));
        assert!(!FileManager::is_image(&PathBuf::from("notes.txt")));
        assert!(!FileManager::is_image(&PathBuf::from("Makefile")));
    }

    #[test]
    fn test_is_exif_format() {
        assert!(FileManager::is_exif_format(&PathBuf::from("photo.jpeg")));
        assert!(FileManager::is_exif_format(&PathBuf::from("photo.webp")));
        assert!(!FileManager::is_exif_format(&PathBuf::from("photo.png")));
        assert!(!FileManager::is_exif_format(&PathBuf::from("photo.avif")));
    }

    #[test]
    fn test_split_marker() {
        assert_eq!(
            FileManager::split_marker("sunset_orig.jpg"),
            Some(("sunset", "jpg"))
        );
        assert_eq!(FileManager::split_marker("sunset.jpg"), None);
        // Marker must be followed by the extension dot
        assert_eq!(FileManager::split_marker("sunset_original"), None);
    }

    #[tokio::test]
    async fn test_copy_verbatim() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("doc.txt");
        let dest = temp.path().join("out.txt");
        tokio::fs::write(&source, b"hello").await.unwrap();

        FileManager::copy_verbatim(&source, &dest).await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
    }
}
