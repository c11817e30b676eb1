//! # Batch Runner
//!
//! Avvia i worker immagini/video/metadata in un task tokio separato dal
//! contesto interattivo.
//!
//! ## Responsabilità:
//! - Verifica delle precondizioni prima di toccare qualsiasi file
//!   (lista vuota, tool mancanti, directory di output non valida)
//! - Run lock: un solo batch di conversione alla volta
//! - Snapshot della configurazione e della lista file all'avvio
//! - Canale bounded per gli eventi di progresso
//!
//! ## Esempio:
//! ```rust,ignore
//! let runner = BatchRunner::from_config(&config, toolchain);
//! let handle = runner.start_images(registry.snapshot(), &output_dir, config.conversion).await?;
//! let (mut events, task) = handle.into_parts();
//! let result = tracker.drain(&mut events).await;
//! ```

use crate::config::{Config, ConversionConfig};
use crate::error::BatchError;
use crate::image_processor::ImageProcessor;
use crate::metadata::MetadataReader;
use crate::progress::{BatchResult, ProgressEvent, ProgressSender};
use crate::registry::FileEntry;
use crate::tool_resolver::Toolchain;
use crate::video_processor::VideoProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const DEFAULT_PROGRESS_BUFFER: usize = 64;

/// Starts batches in the background, one conversion at a time
#[derive(Clone)]
pub struct BatchRunner {
    tools: Toolchain,
    run_lock: Arc<Mutex<()>>,
    progress_buffer: usize,
    transcoder_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
}

/// A running conversion batch
pub struct BatchHandle {
    events: mpsc::Receiver<ProgressEvent>,
    task: JoinHandle<BatchResult>,
}

impl BatchHandle {
    pub fn into_parts(self) -> (mpsc::Receiver<ProgressEvent>, JoinHandle<BatchResult>) {
        (self.events, self.task)
    }

    /// Wait for the batch, ignoring progress events
    pub async fn wait(self) -> anyhow::Result<BatchResult> {
        drop(self.events);
        Ok(self.task.await?)
    }
}

impl BatchRunner {
    pub fn new(tools: Toolchain) -> Self {
        Self {
            tools,
            run_lock: Arc::new(Mutex::new(())),
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
            transcoder_timeout: None,
            probe_timeout: None,
        }
    }

    /// Runner using the buffer size and timeouts from `config`
    pub fn from_config(config: &Config, tools: Toolchain) -> Self {
        Self {
            progress_buffer: config.progress_buffer,
            transcoder_timeout: config.transcoder_timeout(),
            probe_timeout: config.probe_timeout(),
            ..Self::new(tools)
        }
    }

    pub fn with_transcoder_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transcoder_timeout = timeout;
        self
    }

    /// Whether a conversion batch holds the run lock
    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Start converting `files` into `output_dir`.
    ///
    /// # Errors
    /// Any `BatchError` precondition; in that case nothing was written.
    pub async fn start_images(
        &self,
        files: Vec<FileEntry>,
        output_dir: &Path,
        config: ConversionConfig,
    ) -> Result<BatchHandle, BatchError> {
        if files.is_empty() {
            return Err(BatchError::NoFiles);
        }

        let processor = ImageProcessor::new(config, self.tools.clone()).with_tool_timeout(self.transcoder_timeout);
        processor.check_preconditions(&files)?;

        let guard = self.acquire()?;
        let output_dir = prepare_output_dir(output_dir).await?;
        let (sender, events) = ProgressSender::channel(self.progress_buffer);

        info!("Starting image batch: {} file(s)", files.len());
        let task = tokio::spawn(async move {
            let _guard = guard;
            processor.process_all(&files, &output_dir, &sender).await
        });

        Ok(BatchHandle { events, task })
    }

    /// Start remuxing the videos among `files` into `output_dir`.
    ///
    /// # Errors
    /// Any `BatchError` precondition; in that case nothing was written.
    pub async fn start_videos(
        &self,
        files: Vec<FileEntry>,
        output_dir: &Path,
        config: ConversionConfig,
    ) -> Result<BatchHandle, BatchError> {
        if files.is_empty() {
            return Err(BatchError::NoFiles);
        }

        let processor = VideoProcessor::new(config, &self.tools).with_timeout(self.transcoder_timeout);
        let transcoder = processor.check_dependencies()?.to_path_buf();

        let guard = self.acquire()?;
        let output_dir = prepare_output_dir(output_dir).await?;
        let (sender, events) = ProgressSender::channel(self.progress_buffer);

        info!("Starting video batch: {} file(s)", files.len());
        let task = tokio::spawn(async move {
            let _guard = guard;
            processor.process_all(&transcoder, &files, &output_dir, &sender).await
        });

        Ok(BatchHandle { events, task })
    }

    /// Read metadata of `files` in the background, producing one report
    pub fn start_metadata(&self, files: Vec<FileEntry>) -> Result<JoinHandle<String>, BatchError> {
        if files.is_empty() {
            return Err(BatchError::NoFiles);
        }

        let reader = MetadataReader::new(&self.tools).with_probe_timeout(self.probe_timeout);
        Ok(tokio::spawn(async move { reader.report(&files).await }))
    }

    fn acquire(&self) -> Result<OwnedMutexGuard<()>, BatchError> {
        self.run_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| BatchError::AlreadyRunning)
    }
}

async fn prepare_output_dir(output_dir: &Path) -> Result<PathBuf, BatchError> {
    let invalid = || BatchError::InvalidOutputDir(output_dir.to_path_buf());

    match tokio::fs::metadata(output_dir).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(invalid()),
        Err(_) => {
            debug!("Creating output directory {}", output_dir.display());
            tokio::fs::create_dir_all(output_dir).await.map_err(|_| invalid())?;
        }
    }

    Ok(output_dir.to_path_buf())
}
