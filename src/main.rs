//! # Tiered Image Resizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente
//! - Creazione della configurazione e avvio dell'optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (source, output, wipe, skip-existing, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Valida che la directory sorgente esista
//! 4. Crea un oggetto Config con tutti i parametri
//! 5. Istanzia TierOptimizer e avvia la conversione
//!
//! ## Esempio di utilizzo:
//! ```bash
//! tier-resizer ./_SOURCE_FILES --output ./_OUTPUT --wipe --workers 8
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tiered_image_resizer::{Config, TierOptimizer};

#[derive(Parser)]
#[command(name = "tier-resizer")]
#[command(about = "Generate web-friendly image derivatives at fixed resolution tiers.\n\
    \n\
    - The structure of the source tree is replicated to the output.\n\
    - Non-image files are copied directly over to the output.\n\
    - Image files containing _orig are compressed/resized as necessary.\n\
    - Image files not marked _orig are recorded as errors and skipped.")]
struct Args {
    /// Directory containing source images to convert
    source_directory: PathBuf,

    /// Output directory for generated derivatives
    #[arg(short, long, default_value = "_OUTPUT")]
    output: PathBuf,

    /// Wipe the output directory before starting (fresh rebuild)
    #[arg(short, long)]
    wipe: bool,

    /// Skip any files that exist at the output
    #[arg(short, long)]
    skip_existing: bool,

    /// Starting encoder quality for the search (1-100)
    #[arg(long, default_value = "80")]
    base_quality: u8,

    /// Quality floor for the search
    #[arg(long, default_value = "50")]
    lowest_quality: u8,

    /// Number of parallel workers
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.source_directory.exists() {
        return Err(anyhow::anyhow!(
            "Source directory does not exist: {}",
            args.source_directory.display()
        ));
    }

    let config = Config {
        base_quality: args.base_quality,
        lowest_quality: args.lowest_quality,
        workers: args.workers,
        wipe: args.wipe,
        skip_existing: args.skip_existing,
        output_path: args.output,
        ..Default::default()
    };

    let optimizer = TierOptimizer::new(&args.source_directory, config).await?;
    let report = optimizer.run().await?;

    if !report.errors.is_empty() {
        info!("{} pairs failed, see the error list above", report.errors.len());
    }

    Ok(())
}
