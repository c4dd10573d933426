use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rescore_core::{BatchProgress, ConversionOutcome, Pipeline, PipelineConfig};
use rescore_infra_notation_native::NativeInterpreter;
use rescore_infra_storage_fs::FsStorage;
use rescore_ports::storage::{SettingsDto, StoragePort};
use rescore_ports::types::EncodingPolicy;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Repair OMR-produced MusicXML and render it to MIDI.
#[derive(Parser, Debug)]
#[command(
    name = "rescore",
    version,
    about = "Repair OMR-produced MusicXML (.mxl, .xml, .musicxml) and render it to MIDI"
)]
struct Cli {
    /// Notation files to convert, processed in order.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Do not write the repaired `<base>.xml` next to each input.
    #[arg(long)]
    no_persist_repaired: bool,

    /// Byte-to-text policy for notation payloads.
    #[arg(long, value_enum, env = "RESCORE_ENCODING")]
    encoding: Option<EncodingArg>,

    /// Settings file to use instead of the one in the config directory.
    #[arg(long, value_name = "FILE", env = "RESCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Write a JSON summary of the batch to this file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Debug-level logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    Latin1,
    Utf8Lossy,
    Utf8Strict,
}

impl From<EncodingArg> for EncodingPolicy {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Latin1 => EncodingPolicy::Latin1,
            EncodingArg::Utf8Lossy => EncodingPolicy::Utf8Lossy,
            EncodingArg::Utf8Strict => EncodingPolicy::Utf8Strict,
        }
    }
}

/// One start line and one result line per artifact on stdout.
struct ConsoleProgress;

impl BatchProgress for ConsoleProgress {
    fn on_artifact_start(&self, index: usize, total: usize, path: &Path) {
        println!("[{}/{}] -> Converting {}...", index + 1, total, path.display());
    }

    fn on_artifact_done(
        &self,
        _index: usize,
        _total: usize,
        path: &Path,
        outcome: &ConversionOutcome,
    ) {
        match outcome {
            ConversionOutcome::Converted { outputs } => {
                let written: Vec<String> =
                    outputs.iter().map(|p| p.display().to_string()).collect();
                println!("   ok: {}", written.join(", "));
            }
            ConversionOutcome::Skipped { reason } => {
                println!("   skipped {}: {reason}", path.display());
            }
            ConversionOutcome::Failed { kind, message } => {
                println!("   failed {}: {kind}: {message}", path.display());
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let settings = load_settings(cli.config.clone())?;
    let settings = apply_overrides(settings, &cli);
    debug!(?settings, "settings resolved");

    let pipeline = Pipeline::new(
        NativeInterpreter::new(),
        PipelineConfig::from_settings(&settings),
    );
    let report = pipeline.run_batch(&cli.inputs, &ConsoleProgress);

    if let Some(path) = cli.report.as_deref() {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(report = %path.display(), "batch report written");
    }

    Ok(())
}

fn load_settings(config: Option<PathBuf>) -> Result<SettingsDto> {
    let storage = match config {
        Some(path) => FsStorage::from_file(path.clone())
            .with_context(|| format!("cannot use settings file {}", path.display()))?,
        None => FsStorage::default(),
    };
    storage
        .load_settings()
        .with_context(|| format!("failed to load {}", storage.settings_path().display()))
}

fn apply_overrides(mut settings: SettingsDto, cli: &Cli) -> SettingsDto {
    if cli.no_persist_repaired {
        settings.persist_repaired = false;
    }
    if let Some(encoding) = cli.encoding {
        settings.encoding = encoding.into();
    }
    settings
}
