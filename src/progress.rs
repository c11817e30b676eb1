//! # Progress Tracking and Completion Module
//!
//! Questo modulo gestisce gli eventi di progresso e il riepilogo finale di un batch.
//!
//! ## Responsabilità:
//! - `ProgressEvent`: eventi inviati dal worker in background (inizio file, fine batch)
//! - `ProgressSender`: lato worker del canale bounded verso il contesto interattivo
//! - `BatchResult`: file prodotti, file saltati, etichetta del tipo ("Images"/"Videos")
//! - `Summary`: messaggio finale, successo completo o parziale
//! - `ProgressManager`: progress bar visuale con `indicatif`
//!
//! ## Consegna degli eventi:
//! Gli eventi `Started` usano `try_send`: se il buffer è pieno vengono scartati.
//! L'evento `Finished` viene sempre atteso, quindi il risultato finale arriva
//! comunque finché il ricevitore è vivo.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [=========>------------------------------] 3/12 (25%) Processing 3/12: IMG_0042.HEIC
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Message from a background worker to the interactive side
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A file is about to be processed (`index` is 1-based)
    Started {
        index: usize,
        total: usize,
        filename: String,
    },
    /// The batch is over
    Finished(BatchResult),
}

/// Outcome of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Files that produced an output
    pub processed_count: usize,
    /// Names of files that failed, in processing order
    pub skipped: Vec<String>,
    /// "Images" or "Videos"
    pub file_type_label: String,
}

impl BatchResult {
    pub fn new(file_type_label: &str) -> Self {
        Self {
            file_type_label: file_type_label.to_string(),
            ..Default::default()
        }
    }

    pub fn add_processed(&mut self) {
        self.processed_count += 1;
    }

    pub fn add_skipped(&mut self, filename: impl Into<String>) {
        self.skipped.push(filename.into());
    }

    pub fn is_full_success(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let label = self.file_type_label.to_lowercase();
        if self.skipped.is_empty() {
            Summary::Success(format!("All {} processed successfully!", label))
        } else {
            Summary::Partial {
                message: format!(
                    "Completed, but some {} were skipped:\n\n{}",
                    label,
                    self.skipped.join(", ")
                ),
                skipped: self.skipped.clone(),
            }
        }
    }
}

/// Final notice shown once per batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Success(String),
    Partial { message: String, skipped: Vec<String> },
}

impl Summary {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Success(_) => "Completed",
            Self::Partial { .. } => "Completed with Errors",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) => message,
            Self::Partial { message, .. } => message,
        }
    }
}

/// Worker side of the progress channel
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Bounded channel pair with room for `capacity` pending events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Report that file `index` of `total` is starting. Dropped if the buffer is full.
    pub fn started(&self, index: usize, total: usize, filename: &str) {
        let event = ProgressEvent::Started {
            index,
            total,
            filename: filename.to_string(),
        };
        if self.tx.try_send(event).is_err() {
            debug!("Progress update dropped for {}", filename);
        }
    }

    /// Deliver the terminal event, waiting for buffer space
    pub async fn finished(&self, result: BatchResult) {
        if self.tx.send(ProgressEvent::Finished(result)).await.is_err() {
            debug!("Progress receiver closed before batch completion");
        }
    }
}

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden(total_files: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_files);
        Self { bar }
    }

    /// Show that file `index` (1-based) is being processed
    pub fn update(&self, index: usize, total: usize, filename: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index.saturating_sub(1) as u64);
        self.bar.set_message(format!("Processing {}/{}: {}", index, total, filename));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_success_summary() {
        let mut result = BatchResult::new("Images");
        result.add_processed();
        result.add_processed();

        let summary = result.summary();
        assert_eq!(summary, Summary::Success("All images processed successfully!".to_string()));
        assert_eq!(summary.title(), "Completed");
    }

    #[test]
    fn test_partial_summary_names_every_skipped_file() {
        let mut result = BatchResult::new("Videos");
        result.add_processed();
        result.add_skipped("a.mov");
        result.add_skipped("b.mkv");

        let summary = result.summary();
        assert_eq!(summary.title(), "Completed with Errors");
        assert_eq!(
            summary.message(),
            "Completed, but some videos were skipped:\n\na.mov, b.mkv"
        );
        assert!(matches!(summary, Summary::Partial { ref skipped, .. } if skipped.len() == 2));
    }

    #[tokio::test]
    async fn test_started_events_drop_but_finished_arrives() {
        let (sender, mut rx) = ProgressSender::channel(1);
        sender.started(1, 3, "a.jpg");
        // buffer full, these are dropped
        sender.started(2, 3, "b.jpg");
        sender.started(3, 3, "c.jpg");

        let consumer = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        });

        sender.finished(BatchResult::new("Images")).await;
        drop(sender);

        let events = consumer.await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::Started { index: 1, .. }));
        assert!(matches!(events.last(), Some(ProgressEvent::Finished(_))));
    }

    #[tokio::test]
    async fn test_finished_with_closed_receiver_does_not_hang() {
        let (sender, rx) = ProgressSender::channel(1);
        drop(rx);
        sender.finished(BatchResult::new("Images")).await;
    }

    #[test]
    fn test_hidden_manager_tracks_position() {
        let manager = ProgressManager::hidden(4);
        manager.update(3, 4, "c.png");
        assert_eq!(manager.position(), 2);
        manager.finish("done");
        assert_eq!(manager.position(), 4);
    }
}
