//! # Metadata Reader
//!
//! Questo modulo produce un blocco di testo leggibile con i metadata di un file.
//!
//! ## Dispatch per tipo:
//! - **Video** (mp4, mov, avi, mkv): `ffprobe` con dump JSON di container e stream,
//!   ristampato con indentazione a 4 spazi
//! - **RAW** (raf, cr2, cr3, arw, nef, dng, feature `raw`): produttore, modello e data di scatto
//! - **Immagini**: tag EXIF del primo IFD, con i nomi del registro di `kamadak-exif`
//!
//! ## Garanzie:
//! `read` non fallisce mai: ogni errore diventa una riga di testo nel blocco del
//! file, così un dump multi-file non si interrompe.
//!
//! ## Esempio:
//! ```rust,ignore
//! let reader = MetadataReader::new(&toolchain);
//! let report = reader.report(&registry.snapshot()).await;
//! ```

use crate::args;
use crate::batch::PathResolver;
use crate::error::ConvertError;
use crate::file_manager::MediaKind;
use crate::registry::FileEntry;
use crate::tool_resolver::Toolchain;
use crate::utils::{run_command, stderr_tail};
use image::{ImageFormat, ImageReader};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Line shown for images without any EXIF block
pub const NO_METADATA_MARKER: &str = "No EXIF metadata found.";

/// Width of the rule separating files in a report
pub const RULE_WIDTH: usize = 40;

/// Reads embedded metadata from images, camera RAW files and videos
#[derive(Debug, Clone)]
pub struct MetadataReader {
    probe: Option<PathBuf>,
    probe_timeout: Option<Duration>,
}

impl MetadataReader {
    pub fn new(tools: &Toolchain) -> Self {
        Self {
            probe: tools.probe.clone(),
            probe_timeout: None,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Metadata of one file as a text block. Never fails.
    pub async fn read(&self, path: &Path) -> String {
        let name = PathResolver::display_name(path);

        match MediaKind::from_path(path) {
            MediaKind::Video => self.read_video(path, &name).await,
            #[cfg(feature = "raw")]
            MediaKind::LegacyRawImage => {
                let input = path.to_path_buf();
                let result = tokio::task::spawn_blocking(move || read_raw_blocking(&input)).await;
                flatten(result).unwrap_or_else(|e| format!("Error reading {}: {}", name, e))
            }
            _ => {
                let input = path.to_path_buf();
                let result = tokio::task::spawn_blocking(move || read_photo_blocking(&input)).await;
                flatten(result).unwrap_or_else(|e| format!("Error reading {}: {}", name, e))
            }
        }
    }

    /// Blocks for every file in order, each followed by a 40-character rule
    pub async fn report(&self, files: &[FileEntry]) -> String {
        let mut combined = String::new();
        for path in files {
            debug!("Reading metadata: {}", path.display());
            combined.push_str(&self.read(path).await);
            combined.push('\n');
            combined.push_str(&"=".repeat(RULE_WIDTH));
            combined.push_str("\n\n");
        }
        combined
    }

    async fn read_video(&self, path: &Path, name: &str) -> String {
        let Some(probe) = self.probe.as_deref() else {
            return format!("File: {}\n  ffprobe not found.", name);
        };

        match self.probe_json(probe, path).await {
            Ok(json) => format!("File: {}\n{}", name, json),
            Err(e) => format!("Error reading video metadata for {}: {}", name, e),
        }
    }

    async fn probe_json(&self, probe: &Path, path: &Path) -> Result<String, ConvertError> {
        let output = run_command(
            probe,
            &args![
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                path
            ],
            self.probe_timeout,
        )
        .await?;

        if !output.status.success() {
            return Err(ConvertError::Probe(stderr_tail(&output)));
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        pretty_json(&value)
    }
}

fn flatten(result: Result<Result<String, ConvertError>, tokio::task::JoinError>) -> Result<String, ConvertError> {
    result?
}

/// JSON with 4-space indentation
fn pretty_json(value: &serde_json::Value) -> Result<String, ConvertError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// EXIF tags of a still image
fn read_photo_blocking(path: &Path) -> Result<String, ConvertError> {
    let name = PathResolver::display_name(path);

    // Containers exif can parse; anything else that decodes as an image has no tags
    let exif_capable = match MediaKind::from_path(path) {
        MediaKind::HeifImage => true,
        _ => {
            let format = ImageReader::open(path)?.with_guessed_format()?.format();
            match format {
                Some(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP) => true,
                Some(_) => false,
                None => {
                    return Err(ConvertError::UnsupportedFormat(
                        "cannot identify image file".to_string(),
                    ))
                }
            }
        }
    };

    let mut text = format!("File: {}\n", name);
    if !exif_capable {
        text.push_str("  ");
        text.push_str(NO_METADATA_MARKER);
        return Ok(text);
    }

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => {
            let mut found = false;
            for field in exif.fields().filter(|f| f.ifd_num == exif::In::PRIMARY) {
                found = true;
                text.push_str(&format!(
                    "  {}: {}\n",
                    field.tag,
                    field.display_value().with_unit(&exif)
                ));
            }
            if !found {
                text.push_str("  ");
                text.push_str(NO_METADATA_MARKER);
            }
        }
        Err(exif::Error::NotFound(_)) => {
            text.push_str("  ");
            text.push_str(NO_METADATA_MARKER);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(text)
}

/// Camera, model and capture time of a RAW file
#[cfg(feature = "raw")]
fn read_raw_blocking(path: &Path) -> Result<String, ConvertError> {
    let raw = rawloader::RawLoader::new()
        .decode_file(path)
        .map_err(|e| ConvertError::Raw(format!("{:?}", e)))?;

    let timestamp = raw_timestamp(path).unwrap_or_else(|| "unknown".to_string());

    Ok(format!(
        "File: {}\n  Camera: {} {}\n  Timestamp: {}",
        PathResolver::display_name(path),
        raw.make,
        raw.model,
        timestamp
    ))
}

/// Most RAW containers are TIFF based, so their capture time is in EXIF
#[cfg(feature = "raw")]
fn raw_timestamp(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .find_map(|tag| exif.get_field(tag, exif::In::PRIMARY))
        .map(|field| field.display_value().to_string())
}
