//! # Resolution Engine Module
//!
//! Il cuore del sistema: per ogni coppia (sorgente, tier) decide se serve
//! il resize geometrico, seleziona il budget di filesize dal catalogo ed
//! esegue la ricerca bounded sulla qualità di compressione.
//!
//! ## Responsabilità:
//! - Guard sul contratto del chiamante (tier oltre il catalogo = panic)
//! - Probe delle dimensioni sorgente via `Transcoder`
//! - Cheap-skip per sorgenti già aggressivamente piccole
//! - Ricerca di qualità discendente (base -> floor, passo fisso)
//! - Confronto finale artefatto vs sorgente (direct copy se non conviene)
//!
//! ## State machine:
//! ```text
//! Init -> SourceRead{ok|fail} -> [cheap-skip?] -> QualitySearch(loop)
//!      -> FinalCompare -> {Success | DirectCopy}
//! ```
//! `SourceUnreadable`, `TranscodeFailed` e `OutputMissing` sono early-exit
//! terminali raggiungibili solo dai rispettivi step. L'engine è stateless
//! tra le chiamate: tutti i tunable arrivano dalla `Config` immutabile.

use crate::config::Config;
use crate::error::ResizeError;
use crate::transcode::{ResizeBound, TranscodeSpec, Transcoder};
use crate::utils::format_size;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One conversion job: a source image and the tier to produce from it.
///
/// Constructed fresh per call and discarded once the outcome is produced.
/// `target_max_dimension` must never exceed the catalog's largest tier;
/// violating that is a caller bug and fails loudly in [`ResizeEngine::resolve`].
#[derive(Debug, Clone)]
pub struct ResizeRequest {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub target_max_dimension: u32,
}

/// Closed set of terminal outcomes for one (source, tier) pair.
///
/// `DirectCopy` is not an error: it signals that compression offered no
/// benefit and the caller should deliver the original bytes instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Artifact written at the destination path, within budget and smaller
    /// than the source
    Success,
    /// Source could not be opened or its dimensions read
    SourceUnreadable,
    /// The external encoder reported a non-zero exit status
    TranscodeFailed,
    /// The encoder reported success but produced no output file
    OutputMissing,
    /// Compression not beneficial; caller must copy the source verbatim
    DirectCopy,
}

/// Per-(source, tier) decision procedure over an injected [`Transcoder`].
pub struct ResizeEngine<T: Transcoder> {
    config: Config,
    transcoder: T,
}

impl<T: Transcoder> ResizeEngine<T> {
    pub fn new(config: Config, transcoder: T) -> Self {
        Self { config, transcoder }
    }

    /// The transcoder this engine drives.
    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Resolve one conversion request to its terminal outcome.
    ///
    /// On `Success` the destination file is the observable side effect. On
    /// the step-8 `DirectCopy` the over-sized artifact is left at the
    /// destination for the caller to discard. `Err(_)` is reserved for
    /// unexpected filesystem failures; every expected failure mode is
    /// expressed as a [`ResizeOutcome`] variant.
    ///
    /// # Panics
    /// Panics when `target_max_dimension` exceeds the largest catalog tier:
    /// that is a caller contract violation, not a runtime condition.
    pub async fn resolve(&self, request: ResizeRequest) -> Result<ResizeOutcome, ResizeError> {
        // Step 1: caller contract guard, before any filesystem access
        assert!(
            request.target_max_dimension <= self.config.catalog.max_dimension(),
            "resolve() was given a target dimension ({}) larger than any tier in the catalog ({})",
            request.target_max_dimension,
            self.config.catalog.max_dimension()
        );

        // Step 2: source metadata; no destination file is touched on failure
        let (source_width, source_height) = match self.transcoder.probe(&request.source).await {
            Ok(dimensions) => dimensions,
            Err(e) => {
                info!("Cannot read source {}: {}", request.source.display(), e);
                return Ok(ResizeOutcome::SourceUnreadable);
            }
        };
        let source_max_dimension = source_width.max(source_height);

        // Step 3: an exactly-sized source gets recompression only, avoiding
        // resampling artifacts on already-correct originals
        let resize = if source_max_dimension == request.target_max_dimension {
            None
        } else if source_width > source_height {
            Some(ResizeBound::Width(request.target_max_dimension))
        } else {
            Some(ResizeBound::Height(request.target_max_dimension))
        };

        // Step 4: budget selection
        let budget = self.config.catalog.budget_for(request.target_max_dimension);
        debug!(
            "Budget for tier {} is {} bytes",
            request.target_max_dimension, budget
        );

        // Step 5: cheap-skip. Lossy-recompressing an already tiny file can
        // only hurt quality for negligible size gain.
        let source_size = tokio::fs::metadata(&request.source).await?.len();
        if (source_size as f64) < budget as f64 * self.config.no_resize_multiplier {
            debug!(
                "Source {} already small ({}), skipping compression",
                request.source.display(),
                format_size(source_size)
            );
            return Ok(ResizeOutcome::DirectCopy);
        }

        // Step 6: each attempt starts from a clean destination
        remove_stale(&request.dest).await?;

        // Step 7: descending quality search
        let mut quality = self.config.base_quality;
        let mut artifact_size = 0u64;

        while quality >= self.config.lowest_quality {
            // Leftover artifact from the previous iteration
            remove_stale(&request.dest).await?;

            let spec = TranscodeSpec {
                source: request.source.clone(),
                dest: request.dest.clone(),
                resize,
                quality,
                strip_metadata: true,
            };

            // A tool-level failure is not quality-dependent; retrying at a
            // lower quality cannot fix it
            match self.transcoder.transcode(&spec).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Transcode failed for {}", request.dest.display());
                    return Ok(ResizeOutcome::TranscodeFailed);
                }
                Err(e) => {
                    info!("Transcode error for {}: {}", request.dest.display(), e);
                    return Ok(ResizeOutcome::TranscodeFailed);
                }
            }

            artifact_size = match tokio::fs::metadata(&request.dest).await {
                Ok(metadata) => metadata.len(),
                Err(_) => {
                    info!(
                        "Encoder reported success but produced no file at {}",
                        request.dest.display()
                    );
                    return Ok(ResizeOutcome::OutputMissing);
                }
            };

            if artifact_size <= budget {
                debug!(
                    "Budget met at quality {}: {} bytes <= {}",
                    quality, artifact_size, budget
                );
                break;
            }

            debug!(
                "Artifact over budget at quality {} ({} > {}), reducing",
                quality, artifact_size, budget
            );
            // Floor exhaustion exits the loop keeping the lowest-quality
            // artifact as best effort, not an error
            quality = quality.saturating_sub(self.config.quality_step);
        }

        // Step 8: compression that does not shrink the file is pointless
        if artifact_size >= source_size {
            info!(
                "Artifact {} ({}) not smaller than source ({}), using direct copy",
                request.dest.display(),
                format_size(artifact_size),
                format_size(source_size)
            );
            return Ok(ResizeOutcome::DirectCopy);
        }

        Ok(ResizeOutcome::Success)
    }
}

/// Remove whatever occupies `path`, file or directory.
async fn remove_stale(path: &Path) -> Result<(), ResizeError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if metadata.is_dir() {
                tokio::fs::remove_dir_all(path).await?;
            } else {
                tokio::fs::remove_file(path).await?;
            }
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted transcoder: deterministic dimensions, exit status, and
    /// artifact size per quality level. Records every invocation.
    struct ScriptedTranscoder {
        dimensions: Option<(u32, u32)>,
        exit_ok: bool,
        write_output: bool,
        size_for_quality: Box<dyn Fn(u8) -> u64 + Send + Sync>,
        calls: Mutex<Vec<TranscodeSpec>>,
    }

    impl ScriptedTranscoder {
        fn new(dimensions: (u32, u32), size_for_quality: impl Fn(u8) -> u64 + Send + Sync + 'static) -> Self {
            Self {
                dimensions: Some(dimensions),
                exit_ok: true,
                write_output: true,
                size_for_quality: Box::new(size_for_quality),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn unreadable() -> Self {
            let mut transcoder = Self::new((0, 0), |_| 0);
            transcoder.dimensions = None;
            transcoder
        }

        fn recorded_qualities(&self) -> Vec<u8> {
            self.calls.lock().unwrap().iter().map(|c| c.quality).collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Transcoder for ScriptedTranscoder {
        async fn probe(&self, path: &Path) -> Result<(u32, u32), ResizeError> {
            self.dimensions
                .ok_or_else(|| ResizeError::Probe(format!("unreadable: {}", path.display())))
        }

        async fn transcode(&self, spec: &TranscodeSpec) -> Result<bool, ResizeError> {
            self.calls.lock().unwrap().push(spec.clone());
            if !self.exit_ok {
                return Ok(false);
            }
            if self.write_output {
                let size = (self.size_for_quality)(spec.quality);
                std::fs::write(&spec.dest, vec![0u8; size as usize]).unwrap();
            }
            Ok(true)
        }
    }

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    /// Lay out a source file of `source_size` bytes and a destination path.
    fn fixture(source_size: u64) -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("photo_orig.jpg");
        let dest = temp.path().join("photo_2048.avif");
        std::fs::write(&source, vec![0u8; source_size as usize]).unwrap();
        Fixture {
            _temp: temp,
            source,
            dest,
        }
    }

    fn engine(transcoder: ScriptedTranscoder) -> ResizeEngine<ScriptedTranscoder> {
        ResizeEngine::new(Config::default(), transcoder)
    }

    fn request(fx: &Fixture, target: u32) -> ResizeRequest {
        ResizeRequest {
            source: fx.source.clone(),
            dest: fx.dest.clone(),
            target_max_dimension: target,
        }
    }

    #[tokio::test]
    #[should_panic(expected = "larger than any tier")]
    async fn test_target_beyond_catalog_panics() {
        let fx = fixture(280_000);
        let engine = engine(ScriptedTranscoder::new((5000, 3000), |_| 100_000));
        let _ = engine.resolve(request(&fx, 4000)).await;
    }

    #[tokio::test]
    async fn test_unreadable_source_touches_nothing() {
        let fx = fixture(280_000);
        let engine = engine(ScriptedTranscoder::unreadable());

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::SourceUnreadable);
        assert!(!fx.dest.exists());
        assert_eq!(engine.transcoder().call_count(), 0);
    }

    // Concrete scenario A from the conversion contract: 3000x2000 source,
    // tier 2048, 280KB source, first attempt lands under the 300KB budget.
    #[tokio::test]
    async fn test_first_attempt_within_budget_succeeds() {
        let fx = fixture(280_000);
        let engine = engine(ScriptedTranscoder::new((3000, 2000), |_| 260_000));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::Success);
        assert_eq!(engine.transcoder().recorded_qualities(), vec![80]);
        assert_eq!(std::fs::metadata(&fx.dest).unwrap().len(), 260_000);

        let calls = engine.transcoder().calls.lock().unwrap();
        assert_eq!(calls[0].resize, Some(ResizeBound::Width(2048)));
        assert!(calls[0].strip_metadata);
    }

    #[tokio::test]
    async fn test_portrait_source_bounds_height() {
        let fx = fixture(280_000);
        let engine = engine(ScriptedTranscoder::new((2000, 3000), |_| 260_000));

        engine.resolve(request(&fx, 2048)).await.unwrap();

        let calls = engine.transcoder().calls.lock().unwrap();
        assert_eq!(calls[0].resize, Some(ResizeBound::Height(2048)));
    }

    #[tokio::test]
    async fn test_exactly_sized_source_skips_resize() {
        let fx = fixture(280_000);
        let engine = engine(ScriptedTranscoder::new((2048, 1365), |_| 260_000));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::Success);
        let calls = engine.transcoder().calls.lock().unwrap();
        assert_eq!(calls[0].resize, None);
    }

    // Concrete scenario B: 1024x768 source already at the 1024 tier, 30KB
    // file under the 40KB cheap-skip threshold.
    #[tokio::test]
    async fn test_tiny_source_short_circuits_to_direct_copy() {
        let fx = fixture(30_000);
        let engine = engine(ScriptedTranscoder::new((1024, 768), |_| 25_000));

        let outcome = engine.resolve(request(&fx, 1024)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::DirectCopy);
        assert_eq!(engine.transcoder().call_count(), 0);
        assert!(!fx.dest.exists());
    }

    // Concrete scenario C: non-zero exit on the first attempt ends the
    // search immediately; no lower quality is tried.
    #[tokio::test]
    async fn test_tool_failure_is_not_retried() {
        let fx = fixture(280_000);
        let mut transcoder = ScriptedTranscoder::new((3000, 2000), |_| 260_000);
        transcoder.exit_ok = false;
        let engine = engine(transcoder);

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::TranscodeFailed);
        assert_eq!(engine.transcoder().call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_output_after_success_status() {
        let fx = fixture(280_000);
        let mut transcoder = ScriptedTranscoder::new((3000, 2000), |_| 260_000);
        transcoder.write_output = false;
        let engine = engine(transcoder);

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::OutputMissing);
        assert_eq!(engine.transcoder().call_count(), 1);
    }

    #[tokio::test]
    async fn test_quality_descends_until_budget_met() {
        let fx = fixture(900_000);
        // Budget 300KB: over budget at 80 and 75, under at 70
        let engine = engine(ScriptedTranscoder::new((3000, 2000), |quality| match quality {
            80 => 420_000,
            75 => 330_000,
            _ => 290_000,
        }));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::Success);
        assert_eq!(engine.transcoder().recorded_qualities(), vec![80, 75, 70]);
        assert_eq!(std::fs::metadata(&fx.dest).unwrap().len(), 290_000);
    }

    #[tokio::test]
    async fn test_floor_exhaustion_keeps_best_effort_artifact() {
        let fx = fixture(10_000_000);
        // Never meets the 300KB budget; every step stays at 400KB
        let engine = engine(ScriptedTranscoder::new((3000, 2000), |_| 400_000));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        // Best-effort exit: lowest-quality artifact retained, not an error
        assert_eq!(outcome, ResizeOutcome::Success);
        assert_eq!(
            engine.transcoder().recorded_qualities(),
            vec![80, 75, 70, 65, 60, 55, 50]
        );
        assert!(fx.dest.exists());
    }

    #[tokio::test]
    async fn test_budget_met_but_larger_than_source_is_direct_copy() {
        // 200KB source, artifact meets the 300KB budget at 250KB but is
        // larger than the source itself
        let fx = fixture(200_000);
        let engine = engine(ScriptedTranscoder::new((3000, 2000), |_| 250_000));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::DirectCopy);
        // Cleanup of the rejected artifact belongs to the caller
        assert!(fx.dest.exists());
    }

    #[tokio::test]
    async fn test_stale_directory_at_destination_is_cleared() {
        let fx = fixture(280_000);
        std::fs::create_dir(&fx.dest).unwrap();
        let engine = engine(ScriptedTranscoder::new((3000, 2000), |_| 260_000));

        let outcome = engine.resolve(request(&fx, 2048)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::Success);
        assert!(fx.dest.is_file());
    }

    #[tokio::test]
    async fn test_out_of_catalog_dimension_uses_smallest_budget() {
        // Native 800px source: no tier matches exactly, the 100KB fallback
        // budget applies and forces one quality reduction
        let fx = fixture(90_000);
        let engine = engine(ScriptedTranscoder::new((800, 600), |quality| match quality {
            80 => 120_000,
            _ => 80_000,
        }));

        let outcome = engine.resolve(request(&fx, 800)).await.unwrap();

        assert_eq!(outcome, ResizeOutcome::Success);
        assert_eq!(engine.transcoder().recorded_qualities(), vec![80, 75]);
    }
}
