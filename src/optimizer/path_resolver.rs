//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path e dei nomi file di
//! output. Evita duplicazione tra l'orchestratore e il dispatch degli esiti.

use crate::catalog::TierCatalog;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Utility per calcolare path e nomi di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Mirror a source file's directory into the output tree.
    ///
    /// `/src/albums/2023/img_orig.jpg` with roots `/src` -> `/out` yields
    /// `/out/albums/2023`. Files outside the source root fall back to the
    /// output root itself.
    pub fn mirrored_dir(source_file: &Path, source_root: &Path, output_root: &Path) -> PathBuf {
        let relative = source_file
            .strip_prefix(source_root)
            .unwrap_or(source_file)
            .parent()
            .unwrap_or(Path::new(""));
        output_root.join(relative)
    }

    /// Build the artifact filename for one tier.
    ///
    /// The size identifier is the tier dimension, with an `_origsize` suffix
    /// when the dimension is the source's native size rather than a catalog
    /// breakpoint. Output is always AVIF.
    pub fn tier_filename(base: &str, dimension: u32, catalog: &TierCatalog) -> String {
        if catalog.is_breakpoint(dimension) {
            format!("{}_{}.avif", base, dimension)
        } else {
            format!("{}_{}_origsize.avif", base, dimension)
        }
    }

    /// Build the filename for a direct copy of the source.
    ///
    /// The `_orig` marker is replaced with a directcopy tag carrying the
    /// tier dimension: `sunset_orig.jpg` at tier 2048 becomes
    /// `sunset_2048_directcopy.jpg`.
    pub fn directcopy_filename(source_file_name: &str, dimension: u32) -> String {
        source_file_name.replace("_orig", &format!("_{}_directcopy", dimension))
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create parent directories for {}: {}",
                    path.display(),
                    e
                )
            })?;
        }
        Ok(())
    }
}
