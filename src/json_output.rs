//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! (es. una GUI che lancia il binario e legge stdout riga per riga).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio di un batch
//! - `file_start`: Inizio elaborazione di un file
//! - `complete`: Fine batch con file saltati e riepilogo
//! - `metadata`: Report metadata aggregato
//! - `error`: Precondizione fallita, il batch non è partito

use crate::progress::BatchResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        file_type: String,
        total_files: usize,
        output_dir: PathBuf,
    },

    /// Inizio elaborazione di un file specifico
    #[serde(rename = "file_start")]
    FileStart {
        index: usize,
        total: usize,
        filename: String,
        percentage: f64,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        file_type: String,
        processed: usize,
        skipped: Vec<String>,
        success: bool,
        message: String,
    },

    /// Report metadata
    #[serde(rename = "metadata")]
    Metadata { report: String },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(file_type: &str, total_files: usize, output_dir: PathBuf) -> Self {
        Self::Start {
            file_type: file_type.to_string(),
            total_files,
            output_dir,
        }
    }

    pub fn file_start(index: usize, total: usize, filename: &str) -> Self {
        let percentage = if total > 0 {
            (index.saturating_sub(1) as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::FileStart {
            index,
            total,
            filename: filename.to_string(),
            percentage,
        }
    }

    pub fn complete(result: &BatchResult) -> Self {
        Self::Complete {
            file_type: result.file_type_label.clone(),
            processed: result.processed_count,
            skipped: result.skipped.clone(),
            success: result.is_full_success(),
            message: result.summary().message().to_string(),
        }
    }

    pub fn metadata(report: String) -> Self {
        Self::Metadata { report }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
