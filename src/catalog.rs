//! # Tier Catalog Module
//!
//! Questo modulo definisce la tabella delle risoluzioni di output e i
//! budget di filesize associati.
//!
//! ## Responsabilità:
//! - Definisce `TierEntry` (dimensione massima, bound inferiore, budget bytes)
//! - Fornisce lookup del budget per una dimensione target (`budget_for`)
//! - Enumera i tier da generare per una sorgente (`targets_for_source`)
//! - Espone il limite massimo del catalogo per il contratto col chiamante
//!
//! ## Catalogo di default:
//! - 2560 -> 500KB (hero e background)
//! - 2048 -> 300KB (gallery view grandi)
//! - 1024 -> 100KB (thumbnail-tier)
//!
//! Il catalogo viene costruito una volta all'avvio ed è immutabile per
//! tutta la durata del processo.

use serde::{Deserialize, Serialize};

/// One row of the tier catalog: a resolution ceiling with its byte budget.
///
/// `lower_bound` is the bottom of the dimension range this row covers; a
/// budget lookup matches the row when the requested dimension falls inside
/// `lower_bound..=max_dimension`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierEntry {
    /// Resolution ceiling (max of width/height) this tier produces
    pub max_dimension: u32,
    /// Lowest dimension that still selects this row's budget
    pub lower_bound: u32,
    /// Maximum allowed byte size of the compressed artifact
    pub budget_bytes: u64,
}

impl TierEntry {
    pub const fn new(max_dimension: u32, lower_bound: u32, budget_bytes: u64) -> Self {
        Self {
            max_dimension,
            lower_bound,
            budget_bytes,
        }
    }
}

/// Ordered table mapping resolution tiers to file-size budgets.
///
/// Rows are kept largest-tier first. The catalog is pure data: the decision
/// about which tiers apply to a given source lives in
/// [`TierCatalog::targets_for_source`], the budget selection in
/// [`TierCatalog::budget_for`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCatalog {
    entries: Vec<TierEntry>,
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                // 4K tier intentionally absent: only useful for hires gallery
                // views where load times aren't crucial
                TierEntry::new(2560, 2049, 500 * 1000),
                TierEntry::new(2048, 1025, 300 * 1000),
                TierEntry::new(1024, 0, 100 * 1000),
            ],
        }
    }
}

impl TierCatalog {
    /// Build a catalog from explicit rows (largest tier first).
    ///
    /// # Panics
    /// Panics when `entries` is empty or not in descending dimension order;
    /// a malformed catalog is a programming error, not a runtime condition.
    pub fn new(entries: Vec<TierEntry>) -> Self {
        assert!(!entries.is_empty(), "tier catalog must have at least one row");
        assert!(
            entries.windows(2).all(|w| w[0].max_dimension > w[1].max_dimension),
            "tier catalog rows must be ordered from largest to smallest dimension"
        );
        Self { entries }
    }

    /// The largest tier dimension in the catalog. Requests above this value
    /// violate the caller contract of the resolution engine.
    pub fn max_dimension(&self) -> u32 {
        self.entries[0].max_dimension
    }

    /// Whether `dimension` is one of the catalog breakpoints.
    pub fn is_breakpoint(&self, dimension: u32) -> bool {
        self.entries.iter().any(|e| e.max_dimension == dimension)
    }

    /// Look up the file-size budget for a target dimension.
    ///
    /// Selects the first row whose `lower_bound..=max_dimension` range
    /// contains the target. Dimensions outside every range (e.g. a source
    /// whose native resolution sits below all defined tiers) fall back to the
    /// smallest tier's budget: out-of-catalog requests still get a sane,
    /// conservative limit instead of an error.
    pub fn budget_for(&self, target_max_dimension: u32) -> u64 {
        self.entries
            .iter()
            .find(|e| e.max_dimension >= target_max_dimension && e.lower_bound <= target_max_dimension)
            .unwrap_or_else(|| self.entries.last().expect("catalog is never empty"))
            .budget_bytes
    }

    /// Enumerate the target dimensions to generate for a source image.
    ///
    /// Every catalog tier the source can fill (tier <= native max dimension)
    /// is produced, plus the native dimension itself as a max-res option when
    /// it does not exceed the largest tier. A native dimension that happens
    /// to sit exactly on a breakpoint is emitted once.
    pub fn targets_for_source(&self, source_max_dimension: u32) -> Vec<u32> {
        let mut targets: Vec<u32> = self
            .entries
            .iter()
            .map(|e| e.max_dimension)
            .filter(|d| *d <= source_max_dimension)
            .collect();

        if source_max_dimension <= self.max_dimension() && !targets.contains(&source_max_dimension) {
            targets.push(source_max_dimension);
        }

        targets
    }

    /// All catalog rows, largest tier first.
    pub fn entries(&self) -> &[TierEntry] {
        &self.entries
    }
}
