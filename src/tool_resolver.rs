//! # Tool Path Resolver
//!
//! Questo modulo trova i tool esterni usati dai worker.
//!
//! ## Responsabilità:
//! - Path espliciti dal file di configurazione
//! - Tool bundled accanto all'eseguibile (o in `TOOLS_DIR`)
//! - Tool installati nel sistema e raggiungibili dal `PATH`
//! - Report dei tool con i suggerimenti di installazione
//!
//! La risoluzione avviene una sola volta all'avvio: il risultato è un
//! [`Toolchain`] passato ai worker, così i test possono sostituire i tool con
//! script.

use crate::config::Config;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";
pub const RSVG_CONVERT: &str = "rsvg-convert";
pub const HEIF_CONVERT: &str = "heif-convert";
/// Newer libheif releases ship the decoder under this name
pub const HEIF_DEC: &str = "heif-dec";

/// Resolved locations of the external tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    /// ffmpeg, for remuxing videos
    pub transcoder: Option<PathBuf>,
    /// ffprobe, for video metadata
    pub probe: Option<PathBuf>,
    /// rsvg-convert, for SVG -> PNG
    pub rasterizer: Option<PathBuf>,
    /// heif-convert, for HEIC/HEIF stills
    pub heif_decoder: Option<PathBuf>,
}

impl Toolchain {
    /// Toolchain with nothing available
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_transcoder(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcoder = Some(path.into());
        self
    }

    pub fn with_probe(mut self, path: impl Into<PathBuf>) -> Self {
        self.probe = Some(path.into());
        self
    }

    pub fn with_rasterizer(mut self, path: impl Into<PathBuf>) -> Self {
        self.rasterizer = Some(path.into());
        self
    }

    pub fn with_heif_decoder(mut self, path: impl Into<PathBuf>) -> Self {
        self.heif_decoder = Some(path.into());
        self
    }

    /// Whether both ffmpeg and ffprobe were found
    pub fn has_video_support(&self) -> bool {
        self.transcoder.is_some() && self.probe.is_some()
    }
}

/// Tool path resolver for system and bundled installs
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver, detecting a bundled tools directory if there is one
    pub fn new() -> Self {
        Self {
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Create a resolver with an explicit tools directory
    pub fn with_tools_dir(tools_dir: Option<PathBuf>) -> Self {
        Self { tools_dir }
    }

    /// Resolver honouring `config.tools_dir`, falling back to detection
    pub fn from_config(config: &Config) -> Self {
        match config.tools_dir {
            Some(ref dir) => Self::with_tools_dir(Some(dir.clone())),
            None => Self::new(),
        }
    }

    /// Detect the bundled tools directory
    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        // Strategy 1: TOOLS_DIR environment variable (direct override)
        if let Ok(tools_dir) = env::var("TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking TOOLS_DIR: {:?}", tools_path);
            if tools_path.is_dir() {
                return Some(tools_path);
            }
        }

        // Strategy 2: a tools/ directory next to the executable
        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                let tools_path = app_dir.join("tools");
                debug!("Checking bundled path: {:?}", tools_path);
                if tools_path.is_dir() {
                    return Some(tools_path);
                }
            }
        }

        debug!("No bundled tools directory found");
        None
    }

    /// Resolve every tool once, explicit config paths first
    pub fn resolve_toolchain(&self, config: &Config) -> Toolchain {
        let pick = |explicit: &Option<PathBuf>, names: &[&str]| -> Option<PathBuf> {
            if let Some(path) = explicit {
                return Some(path.clone());
            }
            names.iter().find_map(|name| self.resolve_tool(name))
        };

        let toolchain = Toolchain {
            transcoder: pick(&config.ffmpeg_path, &[FFMPEG]),
            probe: pick(&config.ffprobe_path, &[FFPROBE]),
            rasterizer: pick(&config.rsvg_convert_path, &[RSVG_CONVERT]),
            heif_decoder: pick(&config.heif_convert_path, &[HEIF_CONVERT, HEIF_DEC]),
        };
        debug!("Resolved toolchain: {:?}", toolchain);
        toolchain
    }

    /// Resolve the path to a specific tool, bundled first, then PATH
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = self.get_bundled_tool_path(tools_dir, tool_name);
            if bundled_path.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        if let Some(system_path) = self.find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        warn!("Tool not found: {}", tool_name);
        None
    }

    /// Get the expected path for a bundled tool
    fn get_bundled_tool_path(&self, tools_dir: &Path, tool_name: &str) -> PathBuf {
        let file_name = executable_name(tool_name);

        // 1. Direct: tools/{tool_name}
        let direct_path = tools_dir.join(&file_name);
        if direct_path.is_file() {
            return direct_path;
        }

        // 2. Per platform: tools/{os}/{tool_name}
        tools_dir.join(env::consts::OS).join(&file_name)
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let file_name = executable_name(tool_name);
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self, toolchain: &Toolchain) -> String {
        let mut report = String::new();
        report.push_str("Tool Path Resolver Report\n");
        report.push_str(&format!("Bundled tools dir: {:?}\n", self.tools_dir));
        report.push_str("\nTool Availability:\n");

        let tools = [
            ("Video remux", FFMPEG, &toolchain.transcoder),
            ("Video metadata", FFPROBE, &toolchain.probe),
            ("SVG to PNG", RSVG_CONVERT, &toolchain.rasterizer),
            ("HEIC/HEIF decode", HEIF_CONVERT, &toolchain.heif_decoder),
        ];

        for (purpose, tool, resolved) in tools {
            match resolved {
                Some(path) => report.push_str(&format!("  [OK] {} ({}) -> {:?}\n", tool, purpose, path)),
                None if cfg!(target_os = "linux") => report.push_str(&format!(
                    "  [MISSING] {} ({}) install with: {}\n",
                    tool,
                    purpose,
                    get_linux_install_instructions(tool)
                )),
                None => report.push_str(&format!("  [MISSING] {} ({})\n", tool, purpose)),
            }
        }

        report.push_str(&format!(
            "  [{}] RAW camera metadata (built in)\n",
            if cfg!(feature = "raw") { "OK" } else { "DISABLED" }
        ));

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

/// Get installation instructions for a tool on Linux
fn get_linux_install_instructions(tool_name: &str) -> String {
    match tool_name {
        FFMPEG | FFPROBE => "sudo apt-get install ffmpeg".to_string(),
        RSVG_CONVERT => "sudo apt-get install librsvg2-bin".to_string(),
        HEIF_CONVERT | HEIF_DEC => "sudo apt-get install libheif-examples".to_string(),
        _ => format!("sudo apt-get install {}", tool_name),
    }
}
