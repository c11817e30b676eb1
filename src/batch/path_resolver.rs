//! # Path Resolution Module
//!
//! Centralizza il calcolo dei nomi di output, condiviso fra worker immagini e video.
//! Tutti gli output finiscono flat nella directory scelta: `<stem>_processed.<ext>`.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// `<stem>_processed.<extension>`
    pub fn processed_name(input_path: &Path, extension: &str) -> Result<String, ConvertError> {
        let file_stem = input_path
            .file_stem()
            .ok_or_else(|| ConvertError::UnsupportedFormat(format!("Invalid file name: {}", input_path.display())))?
            .to_string_lossy();

        Ok(format!("{}_processed.{}", file_stem, extension))
    }

    /// Output path inside `output_dir`; input directory structure is not mirrored
    pub fn output_path(input_path: &Path, output_dir: &Path, extension: &str) -> Result<PathBuf, ConvertError> {
        Ok(output_dir.join(Self::processed_name(input_path, extension)?))
    }

    /// Base name used in progress messages and the skipped list
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}
