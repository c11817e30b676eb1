//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri persistenti (path dei tool, timeout, default)
//! - Definisce `ConversionConfig`, lo snapshot immutabile letto all'avvio di ogni batch
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `tools_dir`: Directory con tool bundled (default: None)
//! - `ffmpeg_path` / `ffprobe_path` / `rsvg_convert_path` / `heif_convert_path`:
//!   override espliciti dei tool esterni (default: None = ricerca automatica)
//! - `transcoder_timeout_secs`: Timeout per ffmpeg (default: None = nessun timeout)
//! - `probe_timeout_secs`: Timeout per ffprobe (default: None)
//! - `progress_buffer`: Capacità del canale di progresso (default: 64)
//! - `conversion`: Default per strip/resize/formato
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     transcoder_timeout_secs: Some(600),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Output format for the image worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Jpeg,
    Png,
}

impl TargetFormat {
    /// Lowercased format name, used as the output extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Png => write!(f, "PNG"),
        }
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(format!("unsupported target format '{}' (expected jpeg or png)", other)),
        }
    }
}

/// Per-run conversion options, copied once when a batch starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Drop EXIF / container metadata
    pub strip_metadata: bool,
    /// Halve width and height of images
    pub resize_half: bool,
    /// Output format for images
    pub target_format: TargetFormat,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            strip_metadata: true,
            resize_half: false,
            target_format: TargetFormat::Jpeg,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing bundled tools
    pub tools_dir: Option<PathBuf>,
    /// Explicit ffmpeg binary
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary
    pub ffprobe_path: Option<PathBuf>,
    /// Explicit rsvg-convert binary
    pub rsvg_convert_path: Option<PathBuf>,
    /// Explicit heif-convert binary
    pub heif_convert_path: Option<PathBuf>,
    /// Max seconds per ffmpeg invocation (None = wait forever)
    pub transcoder_timeout_secs: Option<u64>,
    /// Max seconds per ffprobe invocation
    pub probe_timeout_secs: Option<u64>,
    /// Capacity of the progress channel
    pub progress_buffer: usize,
    /// Default conversion options
    pub conversion: ConversionConfig,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools_dir: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            rsvg_convert_path: None,
            heif_convert_path: None,
            transcoder_timeout_secs: None,
            probe_timeout_secs: None,
            progress_buffer: 64,
            conversion: ConversionConfig::default(),
            json_output: false,
        }
    }
}

impl Config {
    /// Default config file location (`<config dir>/media-scrubber/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("media-scrubber").join("config.json"))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.progress_buffer == 0 {
            return Err(anyhow::anyhow!("Progress buffer must be greater than 0"));
        }

        if self.transcoder_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Transcoder timeout must be greater than 0 seconds"));
        }

        if self.probe_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Probe timeout must be greater than 0 seconds"));
        }

        let explicit_tools = [
            &self.ffmpeg_path,
            &self.ffprobe_path,
            &self.rsvg_convert_path,
            &self.heif_convert_path,
        ];
        for tool in explicit_tools.into_iter().flatten() {
            if !tool.is_file() {
                return Err(anyhow::anyhow!("Configured tool does not exist: {}", tool.display()));
            }
        }

        if let Some(ref tools_dir) = self.tools_dir {
            if !tools_dir.is_dir() {
                return Err(anyhow::anyhow!("Tools directory is not a directory: {}", tools_dir.display()));
            }
        }

        Ok(())
    }

    pub fn transcoder_timeout(&self) -> Option<Duration> {
        self.transcoder_timeout_secs.map(Duration::from_secs)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.progress_buffer = 0;
        assert!(config.validate().is_err());

        config.progress_buffer = 8;
        config.transcoder_timeout_secs = Some(0);
        assert!(config.validate().is_err());

        config.transcoder_timeout_secs = Some(30);
        config.ffmpeg_path = Some(PathBuf::from("/definitely/not/here/ffmpeg"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.progress_buffer, 64);
        assert!(config.transcoder_timeout().is_none());
        assert!(config.conversion.strip_metadata);
        assert!(!config.conversion.resize_half);
        assert_eq!(config.conversion.target_format, TargetFormat::Jpeg);
    }

    #[test]
    fn test_target_format_parsing() {
        assert_eq!("JPEG".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("jpg".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("Png".parse::<TargetFormat>().unwrap(), TargetFormat::Png);
        assert!("webp".parse::<TargetFormat>().is_err());
        assert_eq!(TargetFormat::Jpeg.extension(), "jpeg");
        assert_eq!(TargetFormat::Png.to_string(), "PNG");
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            transcoder_timeout_secs: Some(120),
            progress_buffer: 16,
            conversion: ConversionConfig {
                strip_metadata: false,
                resize_half: true,
                target_format: TargetFormat::Png,
            },
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.transcoder_timeout_secs, Some(120));
        assert_eq!(loaded_config.progress_buffer, 16);
        assert_eq!(loaded_config.conversion, original_config.conversion);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.progress_buffer, 64);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "probe_timeout_secs": 5 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.probe_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.progress_buffer, 64);
    }
}
