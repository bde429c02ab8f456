//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Probe`: Lettura dimensioni immagine fallita
//! - `Transcode`: ImageMagick ha riportato un errore durante il transform
//! - `MissingDependency`: Tool esterno mancante (magick, exiftool)
//! - `Validation`: Errori di validazione input
//!
//! Gli esiti per-coppia della conversione (sorgente illeggibile, transcode
//! fallito, output mancante, direct copy) NON sono errori: vivono in
//! `engine::ResizeOutcome`. Questo enum copre solo i fallimenti
//! infrastrutturali inattesi.

/// Custom error types for tiered image conversion
#[derive(thiserror::Error, Debug)]
pub enum ResizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dimension probe error: {0}")]
    Probe(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
