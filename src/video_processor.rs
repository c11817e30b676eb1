//! # Video Processing Module
//!
//! Questo modulo gestisce il remux dei video con FFmpeg.
//!
//! ## Responsabilità:
//! - Remux senza ricodifica (stream copy di video e audio)
//! - Rimozione opzionale di tutti i metadata di container e stream
//! - Output piatto nella directory scelta: `<stem>_processed.mp4`
//! - Verifica della dipendenza esterna (ffmpeg) prima di iniziare
//!
//! ## Formati supportati:
//! - **Input**: MP4, MOV, AVI, MKV (gli altri file vengono ignorati senza errore)
//! - **Output**: contenitore MP4 con gli stream originali
//!
//! ## Invocazione:
//! ```text
//! ffmpeg -i <input> -y [-map_metadata -1] -c:v copy -c:a copy <output>
//! ```
//!
//! ## Error Handling:
//! - FFmpeg mancante: precondizione, il batch non parte
//! - Exit code non zero, errore di avvio o timeout: il file finisce in `skipped`
//! - FFmpeg scrive su un file temporaneo nella directory di output, rinominato
//!   solo in caso di successo: un output già presente non viene mai toccato
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = VideoProcessor::new(config, &toolchain);
//! let result = processor.run(&files, &output_dir, &sender).await?;
//! ```

use crate::args;
use crate::batch::PathResolver;
use crate::config::ConversionConfig;
use crate::error::{BatchError, ConvertError};
use crate::file_manager::MediaKind;
use crate::progress::{BatchResult, ProgressSender};
use crate::registry::FileEntry;
use crate::tool_resolver::Toolchain;
use crate::utils::{run_command, stderr_tail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Label carried by video batch results
pub const VIDEOS_LABEL: &str = "Videos";

/// Container every remux is written to
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Handles video remuxing
pub struct VideoProcessor {
    config: ConversionConfig,
    transcoder: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl VideoProcessor {
    pub fn new(config: ConversionConfig, tools: &Toolchain) -> Self {
        Self {
            config,
            transcoder: tools.transcoder.clone(),
            timeout: None,
        }
    }

    /// Limit for each ffmpeg run. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the transcoder is available
    pub fn check_dependencies(&self) -> Result<&Path, BatchError> {
        self.transcoder
            .as_deref()
            .ok_or_else(|| BatchError::MissingDependency("ffmpeg is required for video processing".to_string()))
    }

    /// Transcoder arguments, in the order ffmpeg expects them
    pub fn remux_args(input_path: &Path, output_path: &Path, strip_metadata: bool) -> Vec<OsString> {
        let mut args = args!["-i", input_path, "-y"];
        if strip_metadata {
            args.extend(args!["-map_metadata", "-1"]);
        }
        args.extend(args!["-c:v", "copy", "-c:a", "copy", output_path]);
        args
    }

    /// Check dependencies, then remux every video.
    pub async fn run(
        &self,
        files: &[FileEntry],
        output_dir: &Path,
        progress: &ProgressSender,
    ) -> Result<BatchResult, BatchError> {
        let transcoder = self.check_dependencies()?;
        Ok(self.process_all(transcoder, files, output_dir, progress).await)
    }

    /// Remux every recognised video in order.
    ///
    /// Files that are not videos are passed over without an event or a
    /// `skipped` entry; the index of the remaining files still counts them.
    pub async fn process_all(
        &self,
        transcoder: &Path,
        files: &[FileEntry],
        output_dir: &Path,
        progress: &ProgressSender,
    ) -> BatchResult {
        let total = files.len();
        let mut result = BatchResult::new(VIDEOS_LABEL);

        info!(
            "Remuxing videos into {} (strip metadata: {})",
            output_dir.display(),
            self.config.strip_metadata
        );

        for (idx, path) in files.iter().enumerate() {
            if !MediaKind::from_path(path).is_video() {
                debug!("Not a video, ignoring: {}", path.display());
                continue;
            }

            let filename = PathResolver::display_name(path);
            progress.started(idx + 1, total, &filename);

            match self.remux(transcoder, path, output_dir).await {
                Ok(_) => result.add_processed(),
                Err(e) => {
                    warn!("Error processing video {}: {}", filename, e);
                    result.add_skipped(filename);
                }
            }
        }

        progress.finished(result.clone()).await;
        result
    }

    /// Remux one file and return the output path.
    ///
    /// ffmpeg writes into a hidden file in `output_dir` that is renamed over
    /// the final name only on success, so a failed run never touches an
    /// existing `<stem>_processed.mp4`.
    pub async fn remux(&self, transcoder: &Path, input_path: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
        let output_path = PathResolver::output_path(input_path, output_dir, OUTPUT_EXTENSION)?;
        let staging = tempfile::Builder::new()
            .prefix(".remux-")
            .suffix(&format!(".{}", OUTPUT_EXTENSION))
            .tempfile_in(output_dir)?
            .into_temp_path();
        let args = Self::remux_args(input_path, &staging, self.config.strip_metadata);

        let start_time = Instant::now();
        let output = run_command(transcoder, &args, self.timeout).await?;
        if !output.status.success() {
            return Err(ConvertError::Transcoder(stderr_tail(&output)));
        }

        staging
            .persist(&output_path)
            .map_err(|e| ConvertError::Io(e.error))?;

        debug!(
            "Remuxed {} in {:.1}s",
            PathResolver::display_name(input_path),
            start_time.elapsed().as_secs_f64()
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use tempfile::TempDir;

    fn config(strip_metadata: bool) -> ConversionConfig {
        ConversionConfig {
            strip_metadata,
            ..Default::default()
        }
    }

    #[test]
    fn test_remux_args_with_strip() {
        let args = VideoProcessor::remux_args(Path::new("/in/a.mov"), Path::new("/out/a_processed.mp4"), true);
        assert_eq!(
            args,
            crate::utils::to_os_args([
                "-i",
                "/in/a.mov",
                "-y",
                "-map_metadata",
                "-1",
                "-c:v",
                "copy",
                "-c:a",
                "copy",
                "/out/a_processed.mp4",
            ])
        );
    }

    #[test]
    fn test_remux_args_without_strip() {
        let args = VideoProcessor::remux_args(Path::new("a.mkv"), Path::new("b.mp4"), false);
        assert_eq!(
            args,
            crate::utils::to_os_args(["-i", "a.mkv", "-y", "-c:v", "copy", "-c:a", "copy", "b.mp4"])
        );
    }

    #[tokio::test]
    async fn test_missing_transcoder_is_a_precondition() {
        let output_dir = TempDir::new().unwrap();
        let processor = VideoProcessor::new(config(true), &Toolchain::none());
        let (sender, _events) = ProgressSender::channel(4);

        let result = processor
            .run(&[PathBuf::from("/in/clip.mp4")], output_dir.path(), &sender)
            .await;

        assert!(matches!(result, Err(BatchError::MissingDependency(_))));
        assert!(dir_entries(output_dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remux_batch_skips_non_videos_silently() {
        let tools_dir = TempDir::new().unwrap();
        let input_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (ffmpeg, log) = write_fake_ffmpeg(tools_dir.path());
        let clip = input_dir.path().join("clip.MOV");
        let notes = input_dir.path().join("notes.txt");
        std::fs::write(&clip, b"video").unwrap();
        std::fs::write(&notes, b"text").unwrap();

        let processor = VideoProcessor::new(config(true), &Toolchain::none().with_transcoder(ffmpeg));
        let (sender, mut events) = ProgressSender::channel(8);
        let result = processor
            .run(&[notes, clip.clone()], output_dir.path(), &sender)
            .await
            .unwrap();

        assert_eq!(result.processed_count, 1);
        assert!(result.skipped.is_empty());
        assert_eq!(result.file_type_label, "Videos");
        assert_eq!(dir_entries(output_dir.path()), vec!["clip_processed.mp4".to_string()]);

        let logged = std::fs::read_to_string(log).unwrap();
        let lines: Vec<&str> = logged.lines().collect();
        let clip_arg = clip.display().to_string();
        assert_eq!(
            lines[..lines.len() - 1],
            ["-i", clip_arg.as_str(), "-y", "-map_metadata", "-1", "-c:v", "copy", "-c:a", "copy"]
        );
        let staged = Path::new(lines[lines.len() - 1]);
        assert_eq!(staged.parent(), Some(output_dir.path()));
        assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("mp4"));

        drop(sender);
        let first = events.recv().await.unwrap();
        assert_eq!(
            first,
            crate::progress::ProgressEvent::Started {
                index: 2,
                total: 2,
                filename: "clip.MOV".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_remux_is_skipped_without_partial_output() {
        let tools_dir = TempDir::new().unwrap();
        let input_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (ffmpeg, _log) = write_fake_ffmpeg(tools_dir.path());
        let good = input_dir.path().join("good.mp4");
        let bad = input_dir.path().join("bad.mkv");
        std::fs::write(&good, b"video").unwrap();
        std::fs::write(&bad, b"video").unwrap();

        let processor = VideoProcessor::new(config(false), &Toolchain::none().with_transcoder(ffmpeg));
        let (sender, _events) = ProgressSender::channel(8);
        let result = processor.run(&[bad, good], output_dir.path(), &sender).await.unwrap();

        assert_eq!(result.skipped, vec!["bad.mkv".to_string()]);
        assert_eq!(result.processed_count, 1);
        assert_eq!(dir_entries(output_dir.path()), vec!["good_processed.mp4".to_string()]);
        assert_eq!(
            result.summary().message(),
            "Completed, but some videos were skipped:\n\nbad.mkv"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remux_timeout_counts_as_failure() {
        let tools_dir = TempDir::new().unwrap();
        let input_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (ffmpeg, _log) = write_fake_ffmpeg(tools_dir.path());
        let slow = input_dir.path().join("slow.avi");
        std::fs::write(&slow, b"video").unwrap();

        let processor = VideoProcessor::new(config(true), &Toolchain::none().with_transcoder(&ffmpeg))
            .with_timeout(Some(Duration::from_millis(200)));
        let result = processor.remux(&ffmpeg, &slow, output_dir.path()).await;

        assert!(matches!(result, Err(ConvertError::Timeout { .. })));
        assert!(dir_entries(output_dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_remux_keeps_earlier_output_with_same_stem() {
        let tools_dir = TempDir::new().unwrap();
        let input_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        let (ffmpeg, _log) = write_fake_ffmpeg(tools_dir.path());
        let first = input_dir.path().join("x.mov");
        let missing = input_dir.path().join("x.mkv");
        std::fs::write(&first, b"video").unwrap();

        let processor = VideoProcessor::new(config(true), &Toolchain::none().with_transcoder(ffmpeg));
        let (sender, _events) = ProgressSender::channel(8);
        let result = processor
            .run(&[first, missing], output_dir.path(), &sender)
            .await
            .unwrap();

        assert_eq!(result.processed_count, 1);
        assert_eq!(result.skipped, vec!["x.mkv".to_string()]);
        assert_eq!(dir_entries(output_dir.path()), vec!["x_processed.mp4".to_string()]);
        assert_eq!(
            std::fs::read_to_string(output_dir.path().join("x_processed.mp4")).unwrap(),
            "remuxed"
        );
    }
}
