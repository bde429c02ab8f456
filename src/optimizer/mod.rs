//! # Optimizer Module
//!
//! Modulo orchestratore per la conversione batch.
//!
//! ## Sottomoduli:
//! - `tier_optimizer`: Orchestratore principale (walk, enumerazione tier,
//!   dispatch degli esiti, concorrenza)
//! - `path_resolver`: Calcolo centralizzato di path e nomi di output

pub mod path_resolver;
pub mod tier_optimizer;

pub use tier_optimizer::TierOptimizer;
