//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - `ConvertError`: errori locali a un singolo file (decode, encode, tool esterni).
//!   Vengono catturati al confine del file e registrati nella lista `skipped`.
//! - `BatchError`: precondizioni che impediscono l'avvio di un batch
//!   (nessun file, tool mancante, output non valido, batch già in corso).
//!
//! ## Categorie di errori per file:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/codifica immagini
//! - `Exif`: Errori di parsing EXIF
//! - `Transcoder` / `Probe` / `Rasterizer` / `HeifDecoder`: tool esterni falliti
//! - `UnsupportedConversion`: percorso di conversione non ammesso (es. SVG -> JPEG)
//! - `MissingDependency`: tool esterno mancante per questo file
//! - `Timeout`: tool esterno oltre il limite configurato
//!
//! ## Esempio:
//! ```rust,ignore
//! if target != TargetFormat::Png {
//!     return Err(ConvertError::UnsupportedConversion("SVG can only be converted to PNG".into()));
//! }
//! ```

use std::path::PathBuf;

/// Errors local to one file of a batch
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not write output file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("FFmpeg error: {0}")]
    Transcoder(String),

    #[error("FFprobe error: {0}")]
    Probe(String),

    #[error("SVG rasterizer error: {0}")]
    Rasterizer(String),

    #[error("HEIF decoder error: {0}")]
    HeifDecoder(String),

    #[error("RAW decoder error: {0}")]
    Raw(String),

    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("{program} did not finish within {limit:?}")]
    Timeout { program: String, limit: std::time::Duration },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Conditions that stop a batch before any file is touched
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Please select files first.")]
    NoFiles,

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Output path is not a directory: {}", .0.display())]
    InvalidOutputDir(PathBuf),

    #[error("Another batch is already running")]
    AlreadyRunning,
}
