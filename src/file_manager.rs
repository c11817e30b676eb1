//! # File Management Module
//!
//! Questo modulo gestisce la classificazione dei file e la raccolta degli input.
//!
//! ## Responsabilità:
//! - Classificazione chiusa dei media (`MediaKind`) per estensione, case-insensitive
//! - Espansione degli input: i file restano tali, le directory vengono visitate ricorsivamente
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati riconosciuti:
//! - **Raster**: JPG, JPEG, PNG, WebP, BMP, GIF, TIFF
//! - **HEIF**: HEIC, HEIF
//! - **Vettoriali**: SVG
//! - **RAW**: RAF, CR2, CR3, ARW, NEF, DNG
//! - **Video**: MP4, MOV, AVI, MKV
//!
//! ## Esempio:
//! ```rust,ignore
//! match MediaKind::from_path(&file) {
//!     MediaKind::Video => { /* remux */ }
//!     MediaKind::VectorImage => { /* rasterize */ }
//!     _ => { /* decode */ }
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Media kinds the workers know how to dispatch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Decodable by the built-in image codecs
    RasterImage,
    /// HEIC/HEIF stills, decoded through an external reader
    HeifImage,
    /// SVG, rasterized by an external tool
    VectorImage,
    /// Camera RAW containers
    LegacyRawImage,
    /// Containers ffmpeg can remux
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension() else {
            return Self::Unknown;
        };
        let ext_lower = ext.to_string_lossy().to_lowercase();
        match ext_lower.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif" | "tif" | "tiff" => Self::RasterImage,
            "heic" | "heif" => Self::HeifImage,
            "svg" => Self::VectorImage,
            "raf" | "cr2" | "cr3" | "arw" | "nef" | "dng" => Self::LegacyRawImage,
            "mp4" | "mov" | "avi" | "mkv" => Self::Video,
            _ => Self::Unknown,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

/// Manages file discovery
pub struct FileManager;

impl FileManager {
    /// Expand user inputs into a flat file list.
    ///
    /// Files are kept in the given order. Directories are walked recursively and
    /// their files appended sorted by path. Missing paths are kept as-is; they
    /// fail later, when a worker processes them.
    pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let root = std::path::absolute(input)?;
                let mut found: Vec<PathBuf> = WalkDir::new(&root)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path())
                    .collect();
                found.sort();
                files.extend(found);
            } else {
                files.push(std::path::absolute(input)?);
            }
        }

        Ok(files)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
