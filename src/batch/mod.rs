//! # Batch Module
//!
//! Separa le responsabilità dell'esecuzione dei batch in sottomoduli:
//! - `runner`: avvio dei worker in background con run lock e precondizioni
//! - `progress_tracker`: consumo degli eventi di progresso (progress bar o JSON)
//! - `path_resolver`: logica di calcolo dei path di output centralizzata

pub mod path_resolver;
pub mod progress_tracker;
pub mod runner;

pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use runner::{BatchHandle, BatchRunner};
