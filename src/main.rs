//! # Media Scrubber - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e risoluzione dei tool esterni
//! - Avvio del batch richiesto e presentazione del riepilogo finale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (sottocomando, file, opzioni di conversione)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` rispettato)
//! 3. Carica il file di configurazione e applica gli override della CLI
//! 4. Risolve ffmpeg, ffprobe, rsvg-convert e heif-convert
//! 5. Riempie il registry con i file (le directory vengono visitate ricorsivamente)
//! 6. Avvia il batch in background e mostra progresso e riepilogo
//!
//! ## Exit code:
//! - `0`: tutti i file elaborati
//! - `1`: alcuni file saltati
//! - `2`: precondizione fallita, nessun file toccato
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-scrubber images ~/Pictures/trip -o ~/Pictures/clean --format png --resize-half
//! media-scrubber videos clip.mov -o out/ --keep-metadata
//! media-scrubber --json metadata IMG_0042.HEIC
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use media_scrubber::image_processor::IMAGES_LABEL;
use media_scrubber::json_output::JsonMessage;
use media_scrubber::progress::ProgressManager;
use media_scrubber::registry::count_label;
use media_scrubber::video_processor::VIDEOS_LABEL;
use media_scrubber::{
    BatchError, BatchHandle, BatchRunner, Config, FileManager, FileRegistry, ProgressTracker, TargetFormat,
    ToolPathResolver,
};

#[derive(Parser)]
#[command(name = "media-scrubber")]
#[command(about = "Convert images, remux videos and strip their metadata")]
struct Args {
    /// Config file (default: <config dir>/media-scrubber/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output progress and results as JSON lines on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print embedded metadata of files
    Metadata {
        /// Files or directories
        files: Vec<PathBuf>,
    },

    /// Convert images to JPEG or PNG
    Images {
        /// Files or directories
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Target format: jpeg or png
        #[arg(short, long)]
        format: Option<TargetFormat>,

        /// Keep embedded metadata
        #[arg(long)]
        keep_metadata: bool,

        /// Halve width and height
        #[arg(long)]
        resize_half: bool,
    },

    /// Remux videos without re-encoding
    Videos {
        /// Files or directories
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Keep container and stream metadata
        #[arg(long)]
        keep_metadata: bool,

        /// Max seconds per ffmpeg run
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Report which external tools were found
    Tools,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    config.json_output |= args.json;

    let resolver = ToolPathResolver::from_config(&config);
    let toolchain = resolver.resolve_toolchain(&config);
    if !toolchain.has_video_support() {
        warn!("ffmpeg/ffprobe not found, video features will be disabled");
    }

    match args.command {
        Command::Tools => {
            print!("{}", resolver.get_tools_report(&toolchain));
            Ok(ExitCode::SUCCESS)
        }

        Command::Metadata { files } => {
            let registry = build_registry(&files)?;
            let runner = BatchRunner::from_config(&config, toolchain);

            let task = match runner.start_metadata(registry.snapshot()) {
                Ok(task) => task,
                Err(e) => return Ok(precondition_failed(e, config.json_output)),
            };

            let spinner = (!config.json_output).then(|| ProgressManager::spinner("Reading metadata..."));
            let report = task.await?;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            if config.json_output {
                JsonMessage::metadata(report).emit();
            } else {
                print!("{}", report);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Images {
            files,
            output,
            format,
            keep_metadata,
            resize_half,
        } => {
            let registry = build_registry(&files)?;
            let mut conversion = config.conversion;
            if let Some(format) = format {
                conversion.target_format = format;
            }
            conversion.strip_metadata &= !keep_metadata;
            conversion.resize_half |= resize_half;

            let runner = BatchRunner::from_config(&config, toolchain);
            match runner.start_images(registry.snapshot(), &output, conversion).await {
                Ok(handle) => run_batch(handle, IMAGES_LABEL, registry.len(), &output, config.json_output).await,
                Err(e) => Ok(precondition_failed(e, config.json_output)),
            }
        }

        Command::Videos {
            files,
            output,
            keep_metadata,
            timeout,
        } => {
            let registry = build_registry(&files)?;
            let mut conversion = config.conversion;
            conversion.strip_metadata &= !keep_metadata;
            if timeout.is_some() {
                config.transcoder_timeout_secs = timeout;
                config.validate()?;
            }

            let runner = BatchRunner::from_config(&config, toolchain);
            match runner.start_videos(registry.snapshot(), &output, conversion).await {
                Ok(handle) => run_batch(handle, VIDEOS_LABEL, registry.len(), &output, config.json_output).await,
                Err(e) => Ok(precondition_failed(e, config.json_output)),
            }
        }
    }
}

/// Registry filled with the expanded inputs
fn build_registry(inputs: &[PathBuf]) -> Result<FileRegistry> {
    let mut registry = FileRegistry::new();
    registry.subscribe(|entries| debug!("{}", count_label(entries.len())));

    let files = FileManager::expand_inputs(inputs)?;
    registry.add(files);

    info!("{}", registry.count_label());
    debug!("Selected: {}", registry.basenames().join(", "));
    Ok(registry)
}

/// Show progress until the batch ends, then the summary
async fn run_batch(
    handle: BatchHandle,
    label: &str,
    total: usize,
    output_dir: &Path,
    json_output: bool,
) -> Result<ExitCode> {
    if json_output {
        JsonMessage::start(label, total, output_dir.to_path_buf()).emit();
    }

    let (mut events, task) = handle.into_parts();
    let mut tracker = ProgressTracker::new(json_output);
    if tracker.drain(&mut events).await.is_none() {
        debug!("Progress channel closed before the final event");
    }
    let result = task.await?;

    if !json_output {
        let summary = result.summary();
        println!("{}: {}", summary.title(), summary.message());
    }

    Ok(if result.is_full_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn precondition_failed(error: BatchError, json_output: bool) -> ExitCode {
    if json_output {
        JsonMessage::error(error.to_string(), None).emit();
    } else {
        eprintln!("Error: {}", error);
    }
    ExitCode::from(2)
}
