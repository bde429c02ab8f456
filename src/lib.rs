//! # Tiered Image Resizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `catalog`: Tabella tier -> budget di filesize e enumerazione target
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `engine`: Resolution engine per coppia (sorgente, tier)
//! - `transcode`: Astrazione dell'encoder esterno (ImageMagick)
//! - `file_manager`: Classificazione file, marker, copia verbatim, EXIF
//! - `optimizer`: Orchestratore batch del processo
//! - `platform`: Lookup cross-platform dei tool esterni
//! - `progress`: Progress tracking e report finale
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use tiered_image_resizer::{Config, TierOptimizer};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let optimizer = TierOptimizer::new(std::path::Path::new("_SOURCE_FILES"), config).await?;
//! let report = optimizer.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod transcode;
pub mod utils;

pub use catalog::{TierCatalog, TierEntry};
pub use config::Config;
pub use engine::{ResizeEngine, ResizeOutcome, ResizeRequest};
pub use error::ResizeError;
pub use optimizer::TierOptimizer;
pub use progress::RunReport;
pub use transcode::{MagickTranscoder, ResizeBound, TranscodeSpec, Transcoder};
