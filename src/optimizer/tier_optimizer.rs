//! # Tier Optimizer Main Orchestrator
//!
//! Orchestratore principale della conversione batch: replica la struttura
//! dell'albero sorgente nell'output, copia i file non-immagine, enumera i
//! tier per ogni immagine marcata `_orig.` e invoca il resolution engine
//! una volta per coppia (sorgente, tier).
//!
//! ## Flusso:
//! 1. Wipe opzionale dell'output (`--wipe`)
//! 2. Walk dell'albero sorgente con mirroring delle directory
//! 3. Pianificazione: una job per ogni coppia (sorgente, tier), con skip
//!    delle destinazioni già esistenti (`--skip-existing`)
//! 4. Esecuzione su worker pool bounded (semaforo, `--workers`)
//! 5. Dispatch degli esiti: keep / direct copy + strip EXIF / errore
//! 6. Report finale con le quattro liste di esito
//!
//! Gli errori di una coppia non fermano mai il batch: vengono raccolti nel
//! report e la conversione continua. Nessun retry automatico.

use crate::{
    config::Config,
    engine::{ResizeEngine, ResizeOutcome, ResizeRequest},
    file_manager::FileManager,
    optimizer::path_resolver::PathResolver,
    platform::PlatformCommands,
    progress::{ProgressManager, RunReport},
    transcode::{MagickTranscoder, Transcoder},
    utils::format_size,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One planned (source, tier) conversion
#[derive(Debug, Clone)]
struct PairJob {
    source: PathBuf,
    dest: PathBuf,
    target_max_dimension: u32,
    /// Original filename, kept for the directcopy rename
    source_file_name: String,
}

/// Terminal record of one executed pair, fed back into the run report
enum PairRecord {
    Generated(PathBuf),
    DirectCopied(PathBuf),
    Failed(PathBuf, String),
}

/// Batch driver walking a source tree and producing tiered derivatives
pub struct TierOptimizer {
    config: Config,
    source_root: PathBuf,
    engine: Arc<ResizeEngine<MagickTranscoder>>,
}

impl TierOptimizer {
    /// Create a new optimizer, failing up front when ImageMagick is missing
    pub async fn new(source_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        let transcoder = MagickTranscoder::new(config.transcode_timeout_secs).await?;

        if !PlatformCommands::instance().is_command_available("exiftool").await {
            warn!("exiftool not found: direct copies will keep their EXIF metadata");
        }

        Ok(Self {
            engine: Arc::new(ResizeEngine::new(config.clone(), transcoder)),
            config,
            source_root: source_dir.to_path_buf(),
        })
    }

    /// Run the full conversion and return the aggregated report
    pub async fn run(&self) -> Result<RunReport> {
        let start_time = std::time::Instant::now();

        self.prepare_output_tree().await?;

        let mut report = RunReport::new();
        let jobs = self.plan_jobs(&mut report).await?;

        self.log_configuration(&jobs);

        let progress = ProgressManager::new(jobs.len() as u64);
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = Vec::new();

        for job in jobs {
            let permit = semaphore.clone().acquire_owned().await?;
            let engine = self.engine.clone();
            let progress = progress.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let record = Self::convert_pair(engine, &job).await;
                progress.update(&job.dest.file_name().unwrap_or_default().to_string_lossy());
                record
            }));
        }

        for task in tasks {
            match task.await? {
                PairRecord::Generated(path) => report.add_generated(path),
                PairRecord::DirectCopied(path) => report.add_direct_copy(path),
                PairRecord::Failed(path, reason) => report.add_error(path, reason),
            }
        }

        progress.finish(&report.format_summary());
        report.log_details();
        info!(
            "Run finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    /// Wipe (when requested) and create the output root
    async fn prepare_output_tree(&self) -> Result<()> {
        let output = &self.config.output_path;

        if self.config.wipe {
            info!("Wiping output directory as requested: {}", output.display());
            match tokio::fs::metadata(output).await {
                Ok(metadata) if metadata.is_dir() => tokio::fs::remove_dir_all(output).await?,
                Ok(_) => tokio::fs::remove_file(output).await?,
                Err(_) => {}
            }
        }

        tokio::fs::create_dir_all(output).await?;
        Ok(())
    }

    /// Walk the source tree: copy passthrough files, record unmarked or
    /// unreadable images as errors, and plan one job per (source, tier).
    async fn plan_jobs(&self, report: &mut RunReport) -> Result<Vec<PairJob>> {
        let catalog = &self.config.catalog;
        let mut jobs = Vec::new();

        for entry in WalkDir::new(&self.source_root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let source = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            let output_dir =
                PathResolver::mirrored_dir(source, &self.source_root, &self.config.output_path);

            // Non-image files travel verbatim
            if !FileManager::is_image(source) {
                let dest = output_dir.join(&file_name);
                PathResolver::ensure_parent_dirs(&dest).await?;
                match FileManager::copy_verbatim(source, &dest).await {
                    Ok(()) => report.add_direct_copy(dest),
                    Err(e) => report.add_error(dest, format!("Failed to copy file: {}", e)),
                }
                continue;
            }

            // Images must carry the original marker
            let Some((base, _ext)) = FileManager::split_marker(&file_name) else {
                debug!("Image file {} is not marked _orig - skipping", file_name);
                report.add_error(
                    source.to_path_buf(),
                    "Image file not marked _orig".to_string(),
                );
                continue;
            };

            let (width, height) = match self.engine.transcoder().probe(source).await {
                Ok(dimensions) => dimensions,
                Err(e) => {
                    report.add_error(
                        source.to_path_buf(),
                        format!("Failed to read source dimensions: {}", e),
                    );
                    continue;
                }
            };

            for target in catalog.targets_for_source(width.max(height)) {
                let dest = output_dir.join(PathResolver::tier_filename(base, target, catalog));

                if self.config.skip_existing && dest.exists() {
                    debug!("Skipping existing file {}", dest.display());
                    report.add_skipped(dest);
                    continue;
                }

                PathResolver::ensure_parent_dirs(&dest).await?;
                jobs.push(PairJob {
                    source: source.to_path_buf(),
                    dest,
                    target_max_dimension: target,
                    source_file_name: file_name.clone(),
                });
            }
        }

        Ok(jobs)
    }

    fn log_configuration(&self, jobs: &[PairJob]) {
        info!("Source tree: {}", self.source_root.display());
        info!("Output tree: {}", self.config.output_path.display());
        info!(
            "Quality search: {} down to {} step {}",
            self.config.base_quality, self.config.lowest_quality, self.config.quality_step
        );
        for tier in self.config.catalog.entries() {
            info!(
                "Tier {}px -> budget {}",
                tier.max_dimension,
                format_size(tier.budget_bytes)
            );
        }
        if self.config.skip_existing {
            info!("Skip mode: existing destination files are kept");
        }
        info!(
            "🔄 Converting {} (source, tier) pairs with {} workers",
            jobs.len(),
            self.config.workers
        );
    }

    /// Execute one pair and dispatch on the engine outcome
    async fn convert_pair(
        engine: Arc<ResizeEngine<MagickTranscoder>>,
        job: &PairJob,
    ) -> PairRecord {
        let request = ResizeRequest {
            source: job.source.clone(),
            dest: job.dest.clone(),
            target_max_dimension: job.target_max_dimension,
        };

        match engine.resolve(request).await {
            Ok(ResizeOutcome::Success) => PairRecord::Generated(job.dest.clone()),
            Ok(ResizeOutcome::DirectCopy) => Self::deliver_direct_copy(job).await,
            Ok(ResizeOutcome::SourceUnreadable) => PairRecord::Failed(
                job.dest.clone(),
                "Source image could not be opened".to_string(),
            ),
            Ok(ResizeOutcome::TranscodeFailed) => PairRecord::Failed(
                job.dest.clone(),
                "ImageMagick reported an error during transform".to_string(),
            ),
            Ok(ResizeOutcome::OutputMissing) => PairRecord::Failed(
                job.dest.clone(),
                "Target file was not generated after ImageMagick call".to_string(),
            ),
            Err(e) => PairRecord::Failed(job.dest.clone(), e.to_string()),
        }
    }

    /// Discard any partial artifact and deliver the source verbatim under
    /// the directcopy name, stripping EXIF where the format carries it.
    async fn deliver_direct_copy(job: &PairJob) -> PairRecord {
        if job.dest.exists() {
            let _ = tokio::fs::remove_file(&job.dest).await;
        }

        let copy_name =
            PathResolver::directcopy_filename(&job.source_file_name, job.target_max_dimension);
        let copy_path = job
            .dest
            .parent()
            .unwrap_or(Path::new(""))
            .join(copy_name);

        match FileManager::copy_verbatim(&job.source, &copy_path).await {
            Ok(()) => {
                if let Err(e) = FileManager::strip_exif(&copy_path).await {
                    warn!("EXIF strip failed for {}: {}", copy_path.display(), e);
                }
                debug!("Copied source to dest due to no size benefits");
                PairRecord::DirectCopied(copy_path)
            }
            Err(e) => PairRecord::Failed(copy_path, format!("Failed to copy source: {}", e)),
        }
    }
}
