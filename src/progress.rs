//! # Progress Tracking and Run Report Module
//!
//! Questo modulo gestisce il progress tracking e il report finale della
//! conversione.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Raccolta delle quattro liste di esito (generati, direct copy,
//!   skippati, errori)
//! - Stampa del riepilogo finale
//!
//! ## Liste tracciate:
//! - **generated**: artefatti compressi scritti con successo
//! - **direct_copies**: sorgenti consegnate verbatim (nessun beneficio)
//! - **skipped**: coppie saltate per `--skip-existing`
//! - **errors**: coppie fallite, con path di destinazione e motivo
//!
//! Gli errori sono terminali solo per la singola coppia; il batch continua
//! sempre e il report li elenca alla fine.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Manages progress reporting for the conversion run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager over (source, tier) pairs
    pub fn new(total_pairs: u64) -> Self {
        let bar = ProgressBar::new(total_pairs);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Aggregated outcome lists for one conversion run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Compressed artifacts written successfully
    pub generated: Vec<PathBuf>,
    /// Sources delivered verbatim (direct copies, including non-image passthrough)
    pub direct_copies: Vec<PathBuf>,
    /// Pairs skipped because the destination already existed
    pub skipped: Vec<PathBuf>,
    /// Failed pairs: destination path and human-readable reason
    pub errors: Vec<(PathBuf, String)>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_generated(&mut self, path: PathBuf) {
        self.generated.push(path);
    }

    pub fn add_direct_copy(&mut self, path: PathBuf) {
        self.direct_copies.push(path);
    }

    pub fn add_skipped(&mut self, path: PathBuf) {
        self.skipped.push(path);
    }

    pub fn add_error(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.errors.push((path, reason.into()));
    }

    /// Total pairs accounted for
    pub fn total(&self) -> usize {
        self.generated.len() + self.direct_copies.len() + self.skipped.len() + self.errors.len()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Generated: {} | Direct copies: {} | Skipped: {} | Errors: {}",
            self.generated.len(),
            self.direct_copies.len(),
            self.skipped.len(),
            self.errors.len()
        )
    }

    /// Print the full result lists at the end of the run
    pub fn log_details(&self) {
        info!("=== Conversion Complete ===");

        info!("Skipped ({}):", self.skipped.len());
        for path in &self.skipped {
            info!("  {}", path.display());
        }

        info!("Successfully generated files ({}):", self.generated.len());
        for path in &self.generated {
            info!("  {}", path.display());
        }

        info!("Files copied directly ({}):", self.direct_copies.len());
        for path in &self.direct_copies {
            info!("  {}", path.display());
        }

        if self.errors.is_empty() {
            info!("Errors: none");
        } else {
            warn!("Errors ({}):", self.errors.len());
            for (path, reason) in &self.errors {
                warn!("  {} - {}", path.display(), reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = RunReport::new();
        report.add_generated(PathBuf::from("/out/a_2048.avif"));
        report.add_direct_copy(PathBuf::from("/out/b_1024_directcopy.jpg"));
        report.add_skipped(PathBuf::from("/out/c_1024.avif"));
        report.add_error(PathBuf::from("/out/d_2048.avif"), "transcode failed");

        assert_eq!(report.total(), 4);
        assert_eq!(
            report.format_summary(),
            "Generated: 1 | Direct copies: 1 | Skipped: 1 | Errors: 1"
        );
    }
}
