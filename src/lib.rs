//! # Media Scrubber Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom (per file e per batch)
//! - `registry`: Lista ordinata e deduplicata dei file selezionati
//! - `file_manager`: Classificazione media e discovery dei file
//! - `metadata`: Lettura metadata (EXIF, RAW, ffprobe)
//! - `image_processor`: Conversione immagini (JPEG/PNG), strip e resize
//! - `video_processor`: Remux video con FFmpeg
//! - `batch`: Avvio dei batch in background, run lock, progress
//! - `progress`: Eventi di progresso e riepilogo finale
//! - `tool_resolver`: Ricerca dei tool esterni
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_scrubber::{BatchRunner, Config, FileRegistry, ToolPathResolver};
//!
//! let config = Config::default();
//! let toolchain = ToolPathResolver::from_config(&config).resolve_toolchain(&config);
//! let runner = BatchRunner::from_config(&config, toolchain);
//! let handle = runner.start_images(registry.snapshot(), &output_dir, config.conversion).await?;
//! let result = handle.wait().await?;
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod metadata;
pub mod progress;
pub mod registry;
pub mod tool_resolver;
pub mod utils;
pub mod video_processor;

#[cfg(test)]
mod test_support;

pub use batch::{BatchHandle, BatchRunner, PathResolver, ProgressTracker};
pub use config::{Config, ConversionConfig, TargetFormat};
pub use error::{BatchError, ConvertError};
pub use file_manager::{FileManager, MediaKind};
pub use image_processor::ImageProcessor;
pub use metadata::MetadataReader;
pub use progress::{BatchResult, ProgressEvent, Summary};
pub use registry::{FileEntry, FileRegistry};
pub use tool_resolver::{ToolPathResolver, Toolchain};
pub use video_processor::VideoProcessor;
