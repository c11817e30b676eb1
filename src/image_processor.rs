//! # Image Processing Module
//!
//! Questo modulo converte le immagini selezionate, un file alla volta, nella
//! directory di output scelta.
//!
//! ## Pipeline per file
//!
//! 1. **Nome output**: `<stem>_processed.<jpeg|png>`
//! 2. **SVG**: rasterizzato direttamente in PNG da `rsvg-convert`; SVG -> JPEG non è ammesso
//! 3. **HEIC/HEIF**: decodificato da `heif-convert` in un PNG temporaneo, poi caricato in memoria
//! 4. **Altri formati** (RAW compresi): decodificati con il crate `image`; i RAW
//!    basati su TIFF (DNG, NEF, ARW) spesso passano, gli altri falliscono per file
//! 5. **Strip metadata**: ricostruisce l'immagine dai soli pixel (stesso color type, stesse dimensioni)
//! 6. **Resize**: metà larghezza e metà altezza (divisione intera), filtro Lanczos3
//! 7. **Salvataggio**: JPEG qualità 95 (alpha rimosso, 3 canali) oppure PNG (alpha preservato)
//!
//! ## Error Handling e Resilienza
//!
//! - Ogni errore resta locale al file: il nome finisce in `skipped` e si passa al successivo
//! - L'output viene scritto in un file temporaneo nella directory di destinazione e
//!   rinominato solo a encode completato: un file fallito non lascia output parziali
//! - Precondizione: SVG con target PNG richiede il rasterizzatore prima di iniziare
//!
//! ## Concorrenza
//!
//! - Decode/encode sono CPU-bound e girano in `spawn_blocking`
//! - I tool esterni passano da `utils::run_command` con timeout opzionale
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let processor = ImageProcessor::new(ConversionConfig::default(), toolchain);
//! let (sender, _events) = ProgressSender::channel(16);
//! let result = processor.run(&files, Path::new("/output"), &sender).await?;
//! ```

use crate::args;
use crate::batch::PathResolver;
use crate::config::{ConversionConfig, TargetFormat};
use crate::error::{BatchError, ConvertError};
use crate::file_manager::{FileManager, MediaKind};
use crate::progress::{BatchResult, ProgressSender};
use crate::registry::FileEntry;
use crate::tool_resolver::Toolchain;
use crate::utils::{run_command, stderr_tail};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageBuffer, ImageReader, Pixel};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// JPEG encoder quality for every JPEG output
pub const JPEG_QUALITY: u8 = 95;

/// Label carried by image batch results
pub const IMAGES_LABEL: &str = "Images";

/// # Image Processor
///
/// Converts a list of images into a flat output directory according to one
/// [`ConversionConfig`] snapshot.
///
/// ## Features
/// - Raster formats decoded in-process with the `image` crate
/// - SVG rasterized by an external tool, PNG output only
/// - HEIC/HEIF decoded by an external tool into a temporary PNG
/// - Optional metadata strip and half-size resize
/// - Per-file failures collected, never aborting the batch
pub struct ImageProcessor {
    /// Options fixed for the whole run
    config: ConversionConfig,
    /// External tools resolved at startup
    tools: Toolchain,
    /// Limit for each external tool invocation
    tool_timeout: Option<Duration>,
}

impl ImageProcessor {
    pub fn new(config: ConversionConfig, tools: Toolchain) -> Self {
        Self {
            config,
            tools,
            tool_timeout: None,
        }
    }

    /// Bound every external tool call (rasterizer, HEIF decoder)
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Checks that must pass before any file is touched.
    ///
    /// # Errors
    /// `BatchError::MissingDependency` when the list contains SVG files, the
    /// target is PNG and no rasterizer was found.
    pub fn check_preconditions(&self, files: &[FileEntry]) -> Result<(), BatchError> {
        let has_svg = files
            .iter()
            .any(|f| MediaKind::from_path(f) == MediaKind::VectorImage);

        if has_svg && self.config.target_format == TargetFormat::Png && self.tools.rasterizer.is_none() {
            return Err(BatchError::MissingDependency(
                "rsvg-convert is required to convert SVG files".to_string(),
            ));
        }

        Ok(())
    }

    /// Check preconditions, then convert every file.
    pub async fn run(
        &self,
        files: &[FileEntry],
        output_dir: &Path,
        progress: &ProgressSender,
    ) -> Result<BatchResult, BatchError> {
        self.check_preconditions(files)?;
        Ok(self.process_all(files, output_dir, progress).await)
    }

    /// Convert every file in order, reporting progress.
    ///
    /// Sends one `Started` event per file and a final `Finished` event
    /// carrying the returned result.
    pub async fn process_all(&self, files: &[FileEntry], output_dir: &Path, progress: &ProgressSender) -> BatchResult {
        let total = files.len();
        let mut result = BatchResult::new(IMAGES_LABEL);

        info!(
            "Converting {} image(s) to {} in {} (strip metadata: {}, resize: {})",
            total,
            self.config.target_format,
            output_dir.display(),
            self.config.strip_metadata,
            self.config.resize_half
        );

        for (idx, path) in files.iter().enumerate() {
            let filename = PathResolver::display_name(path);
            progress.started(idx + 1, total, &filename);

            match self.convert(path, output_dir).await {
                Ok(output_path) => {
                    let size = tokio::fs::metadata(&output_path).await.map(|m| m.len()).unwrap_or(0);
                    debug!("Saved {} ({})", output_path.display(), FileManager::format_size(size));
                    result.add_processed();
                }
                Err(e) => {
                    warn!("Error converting {}: {}", filename, e);
                    result.add_skipped(filename);
                }
            }
        }

        progress.finished(result.clone()).await;
        result
    }

    /// Converts a single image and returns the written output path.
    ///
    /// # Errors
    /// Any decode, encode, tool or filesystem failure for this file. No output
    /// file exists when an error is returned.
    pub async fn convert(&self, input_path: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
        let target = self.config.target_format;
        let output_path = PathResolver::output_path(input_path, output_dir, target.extension())?;

        let image = match MediaKind::from_path(input_path) {
            MediaKind::VectorImage => {
                self.rasterize_svg(input_path, output_dir, &output_path).await?;
                return Ok(output_path);
            }
            MediaKind::HeifImage => self.decode_heif(input_path).await?,
            MediaKind::Video => {
                return Err(ConvertError::UnsupportedFormat(format!(
                    "{} is a video",
                    PathResolver::display_name(input_path)
                )))
            }
            MediaKind::RasterImage | MediaKind::LegacyRawImage | MediaKind::Unknown => {
                let input = input_path.to_path_buf();
                tokio::task::spawn_blocking(move || decode_image(&input)).await??
            }
        };

        let config = self.config;
        let staging_dir = output_dir.to_path_buf();
        let destination = output_path.clone();
        tokio::task::spawn_blocking(move || transform_and_save(image, config, &staging_dir, &destination)).await??;

        Ok(output_path)
    }

    /// SVG -> PNG through the external rasterizer
    async fn rasterize_svg(&self, input_path: &Path, output_dir: &Path, output_path: &Path) -> Result<(), ConvertError> {
        if self.config.target_format != TargetFormat::Png {
            return Err(ConvertError::UnsupportedConversion(
                "SVG can only be converted to PNG".to_string(),
            ));
        }

        let rasterizer = self.tools.rasterizer.as_deref().ok_or_else(|| {
            ConvertError::MissingDependency("rsvg-convert is required to convert SVG files".to_string())
        })?;

        let staging = tempfile::Builder::new()
            .prefix(".svg-")
            .suffix(".part")
            .tempfile_in(output_dir)?
            .into_temp_path();
        let staging_path: &Path = &staging;

        let output = run_command(
            rasterizer,
            &args!["-f", "png", "-o", staging_path, input_path],
            self.tool_timeout,
        )
        .await?;

        if !output.status.success() {
            return Err(ConvertError::Rasterizer(stderr_tail(&output)));
        }

        staging.persist(output_path).map_err(|e| ConvertError::Io(e.error))?;
        Ok(())
    }

    /// HEIC/HEIF -> in-memory image through the external decoder
    async fn decode_heif(&self, input_path: &Path) -> Result<DynamicImage, ConvertError> {
        let decoder = self.tools.heif_decoder.as_deref().ok_or_else(|| {
            ConvertError::MissingDependency("heif-convert is required to read HEIC/HEIF files".to_string())
        })?;

        let staging = tempfile::Builder::new()
            .prefix("heif-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();
        let staging_path: &Path = &staging;

        let output = run_command(decoder, &args![input_path, staging_path], self.tool_timeout).await?;
        if !output.status.success() {
            return Err(ConvertError::HeifDecoder(stderr_tail(&output)));
        }

        tokio::task::spawn_blocking(move || -> Result<DynamicImage, ConvertError> {
            let decoded = image::open(&staging)?;
            // `staging` is removed when dropped here
            Ok(decoded)
        })
        .await?
    }
}

/// Decode any format the `image` crate recognises, sniffing content when the
/// extension is missing or wrong
pub fn decode_image(path: &Path) -> Result<DynamicImage, ConvertError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

/// Rebuild the image from its raw pixel buffer only.
///
/// The result has the same color type and dimensions; nothing but pixels is
/// carried over.
pub fn strip_metadata(image: &DynamicImage) -> Result<DynamicImage, ConvertError> {
    fn rebuild<P: Pixel>(buffer: &ImageBuffer<P, Vec<P::Subpixel>>) -> Option<ImageBuffer<P, Vec<P::Subpixel>>> {
        ImageBuffer::from_raw(buffer.width(), buffer.height(), buffer.as_raw().clone())
    }

    let rebuilt = match image {
        DynamicImage::ImageLuma8(b) => rebuild(b).map(DynamicImage::ImageLuma8),
        DynamicImage::ImageLumaA8(b) => rebuild(b).map(DynamicImage::ImageLumaA8),
        DynamicImage::ImageRgb8(b) => rebuild(b).map(DynamicImage::ImageRgb8),
        DynamicImage::ImageRgba8(b) => rebuild(b).map(DynamicImage::ImageRgba8),
        DynamicImage::ImageLuma16(b) => rebuild(b).map(DynamicImage::ImageLuma16),
        DynamicImage::ImageLumaA16(b) => rebuild(b).map(DynamicImage::ImageLumaA16),
        DynamicImage::ImageRgb16(b) => rebuild(b).map(DynamicImage::ImageRgb16),
        DynamicImage::ImageRgba16(b) => rebuild(b).map(DynamicImage::ImageRgba16),
        DynamicImage::ImageRgb32F(b) => rebuild(b).map(DynamicImage::ImageRgb32F),
        DynamicImage::ImageRgba32F(b) => rebuild(b).map(DynamicImage::ImageRgba32F),
        _ => None,
    };

    rebuilt.ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("cannot rebuild a {:?} pixel buffer", image.color()))
    })
}

/// Exactly half width and half height (floor), Lanczos3 resampling
pub fn resize_half(image: &DynamicImage) -> Result<DynamicImage, ConvertError> {
    let (width, height) = (image.width(), image.height());
    let (new_width, new_height) = (width / 2, height / 2);

    if new_width == 0 || new_height == 0 {
        return Err(ConvertError::UnsupportedConversion(format!(
            "{}x{} is too small to halve",
            width, height
        )));
    }

    Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
}

/// Convert to a color type the target encoder accepts.
///
/// JPEG has no alpha: anything with alpha or color becomes RGB8, remaining
/// grayscale becomes L8. PNG keeps alpha; float buffers drop to 16 bits.
pub fn prepare_for_target(image: DynamicImage, target: TargetFormat) -> DynamicImage {
    match target {
        TargetFormat::Jpeg => {
            let color = image.color();
            if matches!(color, ColorType::L8 | ColorType::Rgb8) {
                image
            } else if color.has_alpha() || color.has_color() {
                DynamicImage::ImageRgb8(image.to_rgb8())
            } else {
                DynamicImage::ImageLuma8(image.to_luma8())
            }
        }
        TargetFormat::Png => match image.color() {
            ColorType::Rgb32F => DynamicImage::ImageRgb16(image.to_rgb16()),
            ColorType::Rgba32F => DynamicImage::ImageRgba16(image.to_rgba16()),
            _ => image,
        },
    }
}

/// Encode `image` as `target` into `writer`
pub fn encode<W: Write>(image: &DynamicImage, target: TargetFormat, writer: W) -> Result<(), ConvertError> {
    match target {
        TargetFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))?,
        TargetFormat::Png => image.write_with_encoder(PngEncoder::new(writer))?,
    }
    Ok(())
}

/// Steps 5-7 of the pipeline, ending with an atomic rename into place
fn transform_and_save(
    mut image: DynamicImage,
    config: ConversionConfig,
    output_dir: &Path,
    output_path: &Path,
) -> Result<(), ConvertError> {
    if config.strip_metadata {
        image = strip_metadata(&image)?;
    }

    if config.resize_half {
        image = resize_half(&image)?;
    }

    let image = prepare_for_target(image, config.target_format);

    let mut staging = tempfile::Builder::new()
        .prefix(".img-")
        .suffix(".part")
        .tempfile_in(output_dir)?;
    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        encode(&image, config.target_format, &mut writer)?;
        writer.flush()?;
    }

    staging.persist(output_path)?;
    Ok(())
}
