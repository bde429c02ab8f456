//! # Transcode Execution Module
//!
//! Questo modulo astrae l'invocazione dell'encoder esterno dietro
//! un'interfaccia minimale, così che la logica decisionale dell'engine sia
//! testabile senza spawnare processi reali.
//!
//! ## Responsabilità:
//! - Definisce il trait `Transcoder` (probe dimensioni + transcode)
//! - Implementa `MagickTranscoder` basato su ImageMagick (magick/convert)
//! - Lettura dimensioni via header con la crate `image`, fallback a
//!   `magick identify` per i formati non supportati (AVIF)
//! - Timeout per invocazione: un transcode appeso viene trattato come
//!   exit status fallito
//!
//! ## Pipeline ImageMagick:
//! ```text
//! magick <src> -colorspace RGB -filter lanczos -define filter:lobes=3 \
//!        -resize <N>x> -colorspace sRGB \
//!        -define avif:speed=6 -define avif:chroma-subsampling=4:2:0 \
//!        -quality <Q> -strip <dest>
//! ```
//! Il round-trip di colorspace attorno al resample evita blur
//! gamma-scorretto; il `>` nella geometry fa solo shrink, mai upscale.

use crate::error::ResizeError;
use crate::platform::PlatformCommands;
use crate::utils::to_string_vec;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Bounding-box constraint for a resize, keyed on the longer source side.
///
/// Constraining only the longer side leaves the shorter side free, so the
/// aspect ratio is preserved exactly by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeBound {
    /// Source is landscape: bound the width (`<N>x>`)
    Width(u32),
    /// Source is portrait or square: bound the height (`x<N>>`)
    Height(u32),
}

/// One external transcode invocation: paths, optional resize, quality, strip.
#[derive(Debug, Clone)]
pub struct TranscodeSpec {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// `None` means recompression only (source already at target dimension)
    pub resize: Option<ResizeBound>,
    /// Encoder quality, 0-100
    pub quality: u8,
    pub strip_metadata: bool,
}

/// Narrow interface the resolution engine consumes.
///
/// `probe` reads source dimensions; `transcode` runs one encode and reports
/// the tool's exit status (`Ok(false)` = non-zero exit). Whether the output
/// file actually exists afterwards is checked by the caller.
#[allow(async_fn_in_trait)]
pub trait Transcoder {
    async fn probe(&self, path: &Path) -> Result<(u32, u32), ResizeError>;
    async fn transcode(&self, spec: &TranscodeSpec) -> Result<bool, ResizeError>;
}

/// Production transcoder driving ImageMagick as an external process.
#[derive(Debug, Clone)]
pub struct MagickTranscoder {
    /// Resolved binary: "magick" (IM 7) or "convert" (IM 6)
    program: String,
    timeout: Duration,
}

impl MagickTranscoder {
    /// Resolve the ImageMagick binary, preferring the IM7 `magick` frontend.
    pub async fn new(timeout_secs: u64) -> Result<Self, ResizeError> {
        let platform = PlatformCommands::instance();

        for candidate in ["magick", "convert"] {
            if platform.is_command_available(candidate).await {
                debug!("Using ImageMagick binary: {}", candidate);
                return Ok(Self {
                    program: platform.get_command(candidate).to_string(),
                    timeout: Duration::from_secs(timeout_secs),
                });
            }
        }

        Err(ResizeError::MissingDependency(
            "ImageMagick not found. Please install it (magick or convert must be on PATH).".to_string(),
        ))
    }

    /// Build the full ImageMagick argument list for a transcode spec.
    fn build_args(&self, spec: &TranscodeSpec) -> Vec<String> {
        let mut args = vec![spec.source.to_string_lossy().to_string()];

        if let Some(bound) = spec.resize {
            let geometry = match bound {
                ResizeBound::Width(dimension) => format!("{}x>", dimension),
                ResizeBound::Height(dimension) => format!("x{}>", dimension),
            };
            args.extend(to_string_vec([
                "-colorspace", "RGB",
                "-filter", "lanczos",
                "-define", "filter:lobes=3",
                "-resize", &geometry,
                "-colorspace", "sRGB",
            ]));
        }

        args.extend(to_string_vec([
            "-define", "avif:speed=6",
            "-define", "avif:chroma-subsampling=4:2:0",
            "-quality", &spec.quality.to_string(),
        ]));

        if spec.strip_metadata {
            args.push("-strip".to_string());
        }

        args.push(spec.dest.to_string_lossy().to_string());
        args
    }

    /// Pick the probe invocation: `magick identify` on IM7. On IM6 the
    /// resolved binary is `convert`, which requires an output image and
    /// cannot probe, so the standalone `identify` binary is used instead.
    fn identify_invocation(&self) -> (String, Vec<String>) {
        if self.program.contains("magick") {
            (self.program.clone(), vec!["identify".to_string()])
        } else {
            let identify = PlatformCommands::instance().get_command("identify");
            (identify.to_string(), Vec::new())
        }
    }

    /// Read dimensions via ImageMagick, used for formats the `image`
    /// crate cannot parse (AVIF sources).
    async fn identify_dimensions(&self, path: &Path) -> Result<(u32, u32), ResizeError> {
        let (program, prefix) = self.identify_invocation();
        let output = Command::new(&program)
            .args(&prefix)
            .args(["-format", "%w %h"])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ResizeError::Probe(format!(
                "identify failed for {}",
                path.display()
            )));
        }

        let dimensions = String::from_utf8_lossy(&output.stdout);
        let mut parts = dimensions.split_whitespace();
        match (
            parts.next().and_then(|w| w.parse::<u32>().ok()),
            parts.next().and_then(|h| h.parse::<u32>().ok()),
        ) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(ResizeError::Probe(format!(
                "Unparsable identify output for {}: {:?}",
                path.display(),
                dimensions
            ))),
        }
    }
}

impl Transcoder for MagickTranscoder {
    /// Read source width/height. Header-only parsing via the `image` crate
    /// for the common formats; `identify` fallback for the rest.
    async fn probe(&self, path: &Path) -> Result<(u32, u32), ResizeError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if matches!(ext.as_deref(), Some("jpg") | Some("jpeg") | Some("png") | Some("webp")) {
            let header_path = path.to_path_buf();
            let probed = tokio::task::spawn_blocking(move || image::image_dimensions(&header_path))
                .await
                .map_err(|e| ResizeError::Probe(format!("Probe task failed: {}", e)))?;

            if let Ok((width, height)) = probed {
                return Ok((width, height));
            }
            // Corrupt header or misnamed file: let identify have a try
        }

        self.identify_dimensions(path).await
    }

    /// Run one ImageMagick invocation. A timeout counts as a failed exit
    /// status, not an infrastructure error: retrying at another quality
    /// would not help and the caller must give up on this pair.
    async fn transcode(&self, spec: &TranscodeSpec) -> Result<bool, ResizeError> {
        let args = self.build_args(spec);
        debug!("Running {} {:?}", self.program, args);

        let start_time = std::time::Instant::now();
        let mut child = Command::new(&self.program).args(&args).spawn()?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "Transcode timed out after {:?}: {} -> {}",
                    self.timeout,
                    spec.source.display(),
                    spec.dest.display()
                );
                let _ = child.kill().await;
                return Ok(false);
            }
        };

        debug!(
            "Transcode finished in {:?} (quality {}): {}",
            start_time.elapsed(),
            spec.quality,
            spec.dest.display()
        );

        Ok(status.success())
    }
}
