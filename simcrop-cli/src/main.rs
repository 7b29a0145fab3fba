//! `simcrop` command-line tool.
//!
//! Extracts, calibrates and crops camera images from simulated event dumps,
//! and lists what the dumps contain.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use simcrop_core::{
    extract_image, CalibrationMode, EventSet, EventSummary, PermutationMap, PipelineConfig,
    SetOperation, DEFAULT_ADC_THRESHOLD,
};
use simcrop_io::{
    batch_output_name, default_output_name, event_output_name, read_event_set,
    read_image_document, EventFileReader, ImageDocument, ImageFileWriter, OutputFormat,
};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    SimcropIo(#[from] simcrop_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] simcrop_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Usage(String),
}

/// Calibration applied before cropping.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Calibration {
    /// Raw ADC sums of the selected channel
    Raw,
    /// Pedestal and gain of the selected channel
    Channel,
    /// Channel 0 below the ADC threshold, channel 1 above
    DualGain,
}

impl From<Calibration> for CalibrationMode {
    fn from(value: Calibration) -> Self {
        match value {
            Calibration::Raw => Self::Raw,
            Calibration::Channel => Self::Channel,
            Calibration::DualGain => Self::DualGain,
        }
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Json => Self::Json,
            Format::Csv => Self::Csv,
        }
    }
}

/// Grouping for the `list` subcommand.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListBy {
    /// Triggered telescopes per event
    Event,
    /// Triggered events per telescope
    Telescope,
}

/// Set operation across files.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Operation {
    Union,
    Intersection,
    /// Pairs not common to all files
    Difference,
}

impl From<Operation> for SetOperation {
    fn from(value: Operation) -> Self {
        match value {
            Operation::Union => Self::Union,
            Operation::Intersection => Self::Intersection,
            Operation::Difference => Self::Difference,
        }
    }
}

/// Cherenkov telescope simulation image extraction and cropping.
#[derive(Parser)]
#[command(name = "simcrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and crop one telescope image of one event
    Crop {
        /// Input event dump (JSON Lines)
        input: PathBuf,

        /// Telescope to extract
        #[arg(short, long)]
        telescope: u32,

        /// Event to extract (event ID)
        #[arg(short, long)]
        event: u64,

        /// Readout channel for raw and channel calibration
        #[arg(short, long, default_value = "0")]
        channel: usize,

        /// Calibration applied before cropping
        #[arg(long, value_enum, default_value = "raw")]
        calibration: Calibration,

        /// ADC threshold for dual-gain calibration
        #[arg(long, default_value_t = DEFAULT_ADC_THRESHOLD)]
        threshold: f64,

        /// Output file path (format from extension, default JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dump one event of one telescope as JSON
    Event {
        /// Input event dump (JSON Lines)
        input: PathBuf,

        /// Telescope to keep
        #[arg(short, long)]
        telescope: u32,

        /// Event to dump (event ID)
        #[arg(short, long)]
        event: u64,

        /// Output file path (default: CT<tel>_EV<event>_FULL_EVENT.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract and crop every matching image of one or more dumps
    Extract {
        /// Input event dump(s) (JSON Lines)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Telescopes to extract (default: all)
        #[arg(short, long, value_delimiter = ',')]
        telescopes: Vec<u32>,

        /// Events to extract (default: all)
        #[arg(short, long, value_delimiter = ',')]
        events: Vec<u64>,

        /// Calibration applied before cropping
        #[arg(long, value_enum, default_value = "dual-gain")]
        calibration: Calibration,

        /// Readout channel for raw and channel calibration
        #[arg(short, long, default_value = "0")]
        channel: usize,

        /// ADC threshold for dual-gain calibration
        #[arg(long, default_value_t = DEFAULT_ADC_THRESHOLD)]
        threshold: f64,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format (CSV holds the main image only)
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Count triggered events per telescope
    Count {
        /// Input event dump (JSON Lines)
        input: PathBuf,
    },

    /// List triggered telescopes per event, or events per telescope
    List {
        /// Input event dump (JSON Lines)
        input: PathBuf,

        /// Grouping key
        #[arg(long, value_enum, default_value = "event")]
        by: ListBy,
    },

    /// Combine (event, telescope) pairs of several dumps
    Sets {
        /// Input event dumps (JSON Lines)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Operation to apply
        #[arg(short, long, value_enum)]
        operation: Operation,
    },

    /// Print the ASTRI pixel permutation map
    Map {
        /// Print as CSV instead of an aligned table
        #[arg(long)]
        csv: bool,
    },

    /// Print pedestal and gain of a telescope
    Calib {
        /// Input event dump (JSON Lines)
        input: PathBuf,

        /// Telescope to query
        #[arg(short, long)]
        telescope: u32,
    },

    /// Show shape and statistics of an image document
    Stats {
        /// Image document (JSON)
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Crop {
            input,
            telescope,
            event,
            channel,
            calibration,
            threshold,
            output,
        } => {
            let config = PipelineConfig::default()
                .with_mode(calibration.into())
                .with_channel(channel)
                .with_adc_threshold(threshold);

            let sim_event = EventFileReader::open(&input)?
                .with_allowed_telescopes([telescope])
                .find_event(event)?;
            let record =
                sim_event
                    .telescope(telescope)
                    .ok_or(simcrop_io::Error::TelescopeNotFound {
                        event_id: event,
                        tel_id: telescope,
                    })?;

            let extracted = extract_image(&sim_event, record, &config)?;
            let document = ImageDocument::from_extracted(&extracted, Some(input.as_path()));

            let (path, format) = match output {
                Some(path) => {
                    let format = OutputFormat::from_path(&path).unwrap_or_else(|| {
                        log::warn!(
                            "unknown extension for '{}', defaulting to JSON",
                            path.display()
                        );
                        OutputFormat::Json
                    });
                    (path, format)
                }
                None => (
                    default_output_name(telescope, event, channel, OutputFormat::Json),
                    OutputFormat::Json,
                ),
            };

            log::info!("writing {}", path.display());
            ImageFileWriter::create(&path)?.write_document(&document, format)?;
        }

        Commands::Event {
            input,
            telescope,
            event,
            output,
        } => {
            let sim_event = EventFileReader::open(&input)?
                .with_allowed_telescopes([telescope])
                .find_event(event)?;
            let path = output.unwrap_or_else(|| event_output_name(telescope, event));
            log::info!("writing {}", path.display());
            ImageFileWriter::create(&path)?.write_event(&sim_event)?;
        }

        Commands::Extract {
            input,
            telescopes,
            events,
            calibration,
            channel,
            threshold,
            output_dir,
            format,
            threads,
        } => {
            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }

            let mut config = PipelineConfig::default()
                .with_mode(calibration.into())
                .with_channel(channel)
                .with_adc_threshold(threshold);
            if !telescopes.is_empty() {
                config = config.with_telescopes(telescopes.iter().copied());
            }
            if !events.is_empty() {
                config = config.with_events(events.iter().copied());
            }
            if let Some(dir) = &output_dir {
                std::fs::create_dir_all(dir)?;
            }

            let start = Instant::now();
            let mut written = 0usize;
            let mut skipped = 0usize;
            for path in &input {
                let (file_written, file_skipped) = extract_file(
                    path,
                    &config,
                    &telescopes,
                    output_dir.as_deref(),
                    format.into(),
                )?;
                log::info!(
                    "{}: {} image(s), {} skipped",
                    path.display(),
                    file_written,
                    file_skipped
                );
                written += file_written;
                skipped += file_skipped;
            }

            println!(
                "Extracted {} image(s) from {} file(s), skipped {} in {:.2}s",
                written,
                input.len(),
                skipped,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Count { input } => {
            let summary = read_summary(&input)?;
            println!("Number of events per telescope:");
            for (tel_id, count) in summary.event_counts() {
                println!("- Telescope {:03}: {}", tel_id, count);
            }
            println!("Total number of events: {}", summary.total_events());
        }

        Commands::List { input, by } => {
            let summary = read_summary(&input)?;
            match by {
                ListBy::Event => {
                    println!("Triggered telescopes per event:");
                    for (event_id, telescopes) in summary.telescopes_per_event() {
                        println!("- Event {:06}: {:?}", event_id, telescopes);
                    }
                }
                ListBy::Telescope => {
                    println!("Events per telescope:");
                    for (tel_id, events) in summary.events_per_telescope() {
                        println!("- Telescope {:03}: {:?}", tel_id, events);
                    }
                }
            }
        }

        Commands::Sets { inputs, operation } => {
            let sets = inputs
                .iter()
                .map(read_event_set)
                .collect::<simcrop_io::Result<Vec<EventSet>>>()?;
            let empty = sets.iter().filter(|set| set.is_empty()).count();
            if empty > 0 {
                log::warn!("{} input(s) had no triggered events", empty);
            }
            for (event_id, tel_id) in SetOperation::from(operation).apply(&sets) {
                println!("{} {}", event_id, tel_id);
            }
        }

        Commands::Map { csv } => {
            let map = PermutationMap::astri();
            for row in map.indices().outer_iter() {
                let cells: Vec<String> = if csv {
                    row.iter().map(ToString::to_string).collect()
                } else {
                    row.iter().map(|index| format!("{:4}", index)).collect()
                };
                println!("{}", cells.join(if csv { "," } else { " " }));
            }
        }

        Commands::Calib { input, telescope } => {
            let mut found = None;
            for sim_event in EventFileReader::open(&input)?.with_allowed_telescopes([telescope]) {
                let sim_event = sim_event?;
                if let Some(coefficients) = sim_event
                    .telescope(telescope)
                    .and_then(|record| record.calibration.clone())
                {
                    found = Some(coefficients);
                    break;
                }
            }
            let coefficients = found.ok_or_else(|| {
                CliError::Usage(format!("no calibration found for telescope {}", telescope))
            })?;
            for channel in 0..coefficients.num_channels() {
                let (pedestal, gain) = coefficients.channel(channel)?;
                println!("channel {}:", channel);
                println!("  pedestal: {:?}", pedestal);
                println!("  gain: {:?}", gain);
            }
        }

        Commands::Stats { input } => {
            let document = read_image_document(&input)?;
            print_stats("image", &document.cropped_image()?);
            if let Some(pe) = document.cropped_photoelectron_image()? {
                print_stats("photoelectron image", &pe);
            }
            println!(
                "Event {} telescope {} ({}, {})",
                document.event_id,
                document.tel_id,
                document.camera_id,
                if document.calibrated {
                    "calibrated"
                } else {
                    "raw"
                }
            );
        }
    }

    Ok(())
}

/// Extracts every accepted image of one dump. Returns (written, skipped).
fn extract_file(
    input: &Path,
    config: &PipelineConfig,
    telescopes: &[u32],
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<(usize, usize)> {
    let mut reader = EventFileReader::open(input)?;
    if !telescopes.is_empty() {
        reader = reader.with_allowed_telescopes(telescopes.iter().copied());
    }

    let mut written = 0usize;
    let mut skipped = 0usize;
    for sim_event in reader {
        let sim_event = sim_event?;
        if !config.accepts_event(sim_event.event_id) {
            continue;
        }
        log::debug!("event {}", sim_event.event_id);

        for (tel_id, result) in simcrop_core::extract_event_images(&sim_event, config) {
            let extracted = match result {
                Ok(extracted) => extracted,
                Err(err) => {
                    log::warn!(
                        "event {} telescope {}: skipped ({})",
                        sim_event.event_id,
                        tel_id,
                        err
                    );
                    skipped += 1;
                    continue;
                }
            };
            let path = batch_output_name(input, output_dir, sim_event.event_id, tel_id, format);
            let document = ImageDocument::from_extracted(&extracted, Some(input));
            ImageFileWriter::create(&path)?.write_document(&document, format)?;
            log::debug!("saved {}", path.display());
            written += 1;
        }
    }
    Ok((written, skipped))
}

fn read_summary(input: &Path) -> Result<EventSummary> {
    let mut summary = EventSummary::new();
    for sim_event in EventFileReader::open(input)? {
        summary.record(&sim_event?);
    }
    Ok(summary)
}

fn print_stats(label: &str, image: &simcrop_core::CroppedImage<f64>) {
    let (rows, cols) = image.shape();
    println!("{}: {}x{}", label, rows, cols);
    match image.stats() {
        Some(stats) => println!(
            "  min {:.3}  max {:.3}  mean {:.3}  sum {:.3}",
            stats.min, stats.max, stats.mean, stats.sum
        ),
        None => println!("  empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract_lists() {
        let cli = Cli::parse_from([
            "simcrop",
            "extract",
            "run1.jsonl",
            "run2.jsonl",
            "--telescopes",
            "1,3,5",
            "--events",
            "10",
            "--calibration",
            "channel",
        ]);
        match cli.command {
            Commands::Extract {
                input,
                telescopes,
                events,
                calibration,
                ..
            } => {
                assert_eq!(
                    input,
                    vec![PathBuf::from("run1.jsonl"), PathBuf::from("run2.jsonl")]
                );
                assert_eq!(telescopes, vec![1, 3, 5]);
                assert_eq!(events, vec![10]);
                assert_eq!(
                    CalibrationMode::from(calibration),
                    CalibrationMode::Channel
                );
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_crop_defaults() {
        let cli = Cli::parse_from(["simcrop", "crop", "run.jsonl", "-t", "2", "-e", "7"]);
        match cli.command {
            Commands::Crop {
                channel,
                threshold,
                output,
                calibration,
                ..
            } => {
                assert_eq!(channel, 0);
                assert!((threshold - 3500.0).abs() < f64::EPSILON);
                assert!(output.is_none());
                assert!(matches!(calibration, Calibration::Raw));
            }
            _ => panic!("expected crop"),
        }
    }

    #[test]
    fn test_extract_requires_input() {
        assert!(Cli::try_parse_from(["simcrop", "extract", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_parse_event() {
        let cli = Cli::parse_from(["simcrop", "event", "run.jsonl", "-t", "4", "-e", "12"]);
        match cli.command {
            Commands::Event {
                telescope,
                event,
                output,
                ..
            } => {
                assert_eq!(telescope, 4);
                assert_eq!(event, 12);
                assert!(output.is_none());
            }
            _ => panic!("expected event"),
        }
    }
}
