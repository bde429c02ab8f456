//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di conversione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `base_quality`: Qualità di partenza della ricerca (1-100, default: 80)
//! - `lowest_quality`: Floor della ricerca di qualità (default: 50)
//! - `quality_step`: Decremento per iterazione (default: 5)
//! - `no_resize_multiplier`: Soglia di skip per sorgenti già piccole (default: 0.4)
//! - `workers`: Numero di worker paralleli (default: 4)
//! - `wipe`: Svuota la directory di output prima di iniziare
//! - `skip_existing`: Salta le coppie (sorgente, tier) già generate
//!
//! ## Validazione:
//! - Controlla che le qualità siano 1-100 e base >= floor
//! - Controlla che quality_step sia > 0
//! - Controlla che no_resize_multiplier sia in (0.0, 1.0]
//! - Controlla che workers sia > 0

use crate::catalog::TierCatalog;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for tiered image conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Starting encoder quality for the search (1-100)
    pub base_quality: u8,
    /// Quality floor; the search never goes below this
    pub lowest_quality: u8,
    /// Quality decrement per search iteration
    pub quality_step: u8,
    /// Sources below budget * multiplier skip compression entirely
    pub no_resize_multiplier: f64,
    /// Number of parallel workers
    pub workers: usize,
    /// Seconds before an external transcode invocation is treated as failed
    pub transcode_timeout_secs: u64,
    /// Clear the output tree before running (fresh rebuild)
    pub wipe: bool,
    /// Skip any (source, tier) pair whose destination already exists
    pub skip_existing: bool,
    /// Output directory for generated derivatives
    pub output_path: PathBuf,
    /// Resolution tiers and their file-size budgets
    pub catalog: TierCatalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_quality: 80,
            lowest_quality: 50,
            quality_step: 5,
            no_resize_multiplier: 0.4,
            workers: 4,
            transcode_timeout_secs: 120,
            wipe: false,
            skip_existing: false,
            output_path: PathBuf::from("_OUTPUT"),
            catalog: TierCatalog::default(),
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.base_quality == 0 || self.base_quality > 100 {
            return Err(anyhow::anyhow!("Base quality must be between 1 and 100"));
        }

        if self.lowest_quality == 0 || self.lowest_quality > 100 {
            return Err(anyhow::anyhow!("Lowest quality must be between 1 and 100"));
        }

        if self.lowest_quality > self.base_quality {
            return Err(anyhow::anyhow!(
                "Lowest quality ({}) must not exceed base quality ({})",
                self.lowest_quality,
                self.base_quality
            ));
        }

        if self.quality_step == 0 {
            return Err(anyhow::anyhow!("Quality step must be greater than 0"));
        }

        if self.no_resize_multiplier <= 0.0 || self.no_resize_multiplier > 1.0 {
            return Err(anyhow::anyhow!("No-resize multiplier must be between 0.0 and 1.0"));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.transcode_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Transcode timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Maximum number of iterations the quality search can take
    pub fn max_quality_iterations(&self) -> u32 {
        ((self.base_quality - self.lowest_quality) / self.quality_step) as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.base_quality = 0;
        assert!(config.validate().is_err());

        config.base_quality = 80;
        config.lowest_quality = 90;
        assert!(config.validate().is_err());

        config.lowest_quality = 50;
        config.quality_step = 0;
        assert!(config.validate().is_err());

        config.quality_step = 5;
        config.no_resize_multiplier = 1.5;
        assert!(config.validate().is_err());

        config.no_resize_multiplier = 0.4;
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.base_quality, 80);
        assert_eq!(config.lowest_quality, 50);
        assert_eq!(config.quality_step, 5);
        assert_eq!(config.no_resize_multiplier, 0.4);
        assert_eq!(config.workers, 4);
        assert!(!config.wipe);
        assert!(!config.skip_existing);
    }

    #[test]
    fn test_max_quality_iterations() {
        let config = Config::default();
        // 80, 75, 70, 65, 60, 55, 50
        assert_eq!(config.max_quality_iterations(), 7);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            base_quality: 85,
            lowest_quality: 55,
            workers: 8,
            skip_existing: true,
            ..Default::default()
        };

        // Save config
        original_config.save_to_file(&config_path).await.unwrap();

        // Load config
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.base_quality, 85);
        assert_eq!(loaded_config.lowest_quality, 55);
        assert_eq!(loaded_config.workers, 8);
        assert!(loaded_config.skip_existing);
    }
}
