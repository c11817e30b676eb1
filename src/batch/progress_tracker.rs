//! # Progress Tracking Module
//!
//! Consuma gli eventi inviati dal worker e li presenta nel contesto interattivo:
//! progress bar `indicatif` oppure messaggi JSON su stdout.

use crate::json_output::JsonMessage;
use crate::progress::{BatchResult, ProgressEvent, ProgressManager};
use tokio::sync::mpsc;

/// Presents progress events as they arrive
pub struct ProgressTracker {
    json_output: bool,
    hidden: bool,
    manager: Option<ProgressManager>,
}

impl ProgressTracker {
    /// Crea un nuovo tracker
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            hidden: false,
            manager: None,
        }
    }

    /// Tracker that draws nothing
    pub fn hidden() -> Self {
        Self {
            json_output: false,
            hidden: true,
            manager: None,
        }
    }

    fn manager(&mut self, total: usize) -> &ProgressManager {
        let hidden = self.hidden || self.json_output;
        self.manager.get_or_insert_with(|| {
            if hidden {
                ProgressManager::hidden(total as u64)
            } else {
                ProgressManager::new(total as u64)
            }
        })
    }

    /// Apply one event
    pub fn handle(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { index, total, filename } => {
                if self.json_output {
                    JsonMessage::file_start(*index, *total, filename).emit();
                }
                self.manager(*total).update(*index, *total, filename);
            }
            ProgressEvent::Finished(result) => {
                if self.json_output {
                    JsonMessage::complete(result).emit();
                }
                if let Some(manager) = &self.manager {
                    manager.finish("Done!");
                }
            }
        }
    }

    /// Position of the bar, if any file has started
    pub fn position(&self) -> Option<u64> {
        self.manager.as_ref().map(|m| m.position())
    }

    /// Consume events until the batch finishes or the worker goes away
    pub async fn drain(&mut self, events: &mut mpsc::Receiver<ProgressEvent>) -> Option<BatchResult> {
        while let Some(event) = events.recv().await {
            self.handle(&event);
            if let ProgressEvent::Finished(result) = event {
                return Some(result);
            }
        }
        None
    }
}
