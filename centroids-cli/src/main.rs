//! centroids CLI: photon centroiding of raw detector frames.
//!
//! Frames are read from headerless 16-bit little-endian files.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use centroids_algorithms::{CentroidEngine, Status};
use centroids_core::{FrameStack, ParameterName, ParameterSet};
use centroids_io::{PhotonFileWriter, RawFrameReader};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    CentroidsIo(#[from] centroids_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] centroids_core::Error),

    #[error("Invalid parameters: {0}")]
    Parameter(#[from] centroids_core::ParameterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sub-pixel photon centroiding for counting detectors.
#[derive(Parser)]
#[command(name = "centroids")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and centroid photon events in a raw frame file
    Process {
        /// Input raw frame file
        input: PathBuf,

        /// Frame width in pixels
        #[arg(long)]
        width: usize,

        /// Frame height in pixels
        #[arg(long)]
        height: usize,

        /// Number of frames to process (default: all)
        #[arg(short = 'n', long)]
        frames: Option<usize>,

        /// JSON parameter file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Parameter override, e.g. THRESHOLD=120 (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_override)]
        overrides: Vec<(ParameterName, f64)>,

        /// Photon table output (.csv, .json or binary)
        #[arg(short, long)]
        output: PathBuf,

        /// Annotated map output (raw 16-bit frames)
        #[arg(long)]
        map: Option<PathBuf>,
    },

    /// Show information about a raw frame file
    Info {
        /// Input raw frame file
        input: PathBuf,

        /// Frame width in pixels
        #[arg(long)]
        width: usize,

        /// Frame height in pixels
        #[arg(long)]
        height: usize,
    },

    /// Print the default parameter set as JSON
    Defaults,

    /// Time repeated processing of a raw frame file
    Benchmark {
        /// Input raw frame file
        input: PathBuf,

        /// Frame width in pixels
        #[arg(long)]
        width: usize,

        /// Frame height in pixels
        #[arg(long)]
        height: usize,

        /// JSON parameter file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn parse_override(s: &str) -> std::result::Result<(ParameterName, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name: ParameterName = name.parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name, value))
}

fn load_params(config: Option<&Path>) -> Result<ParameterSet> {
    match config {
        Some(path) => Ok(centroids_io::load_params(path)?),
        None => Ok(ParameterSet::default()),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            width,
            height,
            frames,
            config,
            overrides,
            output,
            map,
        } => {
            let reader = RawFrameReader::open(&input, width, height)?;
            let frames = frames.unwrap_or_else(|| reader.frame_count());

            let mut params = load_params(config.as_deref())?;
            for (name, value) in overrides {
                log::debug!("override {name} = {value}");
                params.set_named(name, value);
            }
            let params = params
                .with_shape(width, height, frames)
                .with_return_map(map.is_some());

            log::info!(
                "Processing {} frames of {}x{} from {}",
                frames,
                width,
                height,
                input.display()
            );

            let start = Instant::now();
            let data = reader.read_frames(frames)?;
            let stack = FrameStack::new(&data, width, height, frames)
                .map_err(centroids_core::Error::from)?;
            let result = CentroidEngine::new().process_stack(stack, &params);
            if let Status::ParameterInvalid(err) = &result.status {
                return Err(err.clone().into());
            }
            let elapsed = start.elapsed();

            let mut writer = PhotonFileWriter::create(&output)?;
            let output_format = output
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or_else(|| "bin".to_string(), |ext| ext.to_lowercase());
            match output_format.as_str() {
                "csv" => writer.write_photons_csv(&result.photons)?,
                "json" => writer.write_photons_json(&result.photons)?,
                "bin" | "dat" => writer.write_photons_binary(&result.photons)?,
                other => {
                    log::warn!("Unknown extension '{}', defaulting to binary", other);
                    writer.write_photons_binary(&result.photons)?;
                }
            }
            log::debug!("Wrote photon table to {}", output.display());

            if let Some(map_path) = map {
                PhotonFileWriter::create(&map_path)?.write_maps(&result.maps)?;
                log::debug!("Wrote {} maps to {}", result.maps.len(), map_path.display());
            }

            let stats = &result.stats;
            println!(
                "Processed {} frames in {:.2}s",
                stats.frames,
                elapsed.as_secs_f64()
            );
            println!("Seeds: {}", stats.seeds);
            println!(
                "Rejected: {} edge, {} sum range, {} count, {} pile-up ({} groups)",
                stats.edge_rejected,
                stats.sum_rejected,
                stats.count_rejected,
                stats.pileup_rejected,
                stats.pileup_groups
            );
            println!("Photon events: {}", result.n_photons());
            println!("Total photons: {}", result.photons.total_photons());
        }

        Commands::Info {
            input,
            width,
            height,
        } => {
            let reader = RawFrameReader::open(&input, width, height)?;
            let file_size = reader.frame_bytes() * reader.frame_count();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );
            println!("Frames: {} of {}x{}", reader.frame_count(), width, height);

            let mut min = u16::MAX;
            let mut max = u16::MIN;
            let mut total = 0u64;
            for frame in reader.frames() {
                for &v in &frame {
                    min = min.min(v);
                    max = max.max(v);
                    total += u64::from(v);
                }
            }
            let samples = (width * height * reader.frame_count()) as f64;
            println!("Intensity range: {} - {}", min, max);
            println!("Mean intensity: {:.3}", total as f64 / samples);
        }

        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&ParameterSet::default())?);
        }

        Commands::Benchmark {
            input,
            width,
            height,
            config,
            iterations,
        } => {
            let reader = RawFrameReader::open(&input, width, height)?;
            let frames = reader.frame_count();
            let data = reader.read_frames(frames)?;
            let stack = FrameStack::new(&data, width, height, frames)
                .map_err(centroids_core::Error::from)?;
            let params = load_params(config.as_deref())?
                .with_shape(width, height, frames)
                .with_return_map(false);
            let engine = CentroidEngine::new();

            println!(
                "Benchmarking with {} frames, {} iterations",
                frames, iterations
            );

            // Warmup
            let warmup = engine.process_stack(stack, &params);
            if let Status::ParameterInvalid(err) = warmup.status {
                return Err(err.into());
            }

            let mut times = Vec::with_capacity(iterations);
            for _ in 0..iterations {
                let start = Instant::now();
                let out = engine.process_stack(stack, &params);
                times.push(start.elapsed().as_secs_f64() * 1000.0);
                log::debug!("{} photon events", out.n_photons());
            }

            if !times.is_empty() {
                let mean = times.iter().sum::<f64>() / times.len() as f64;
                let min = times.iter().copied().fold(f64::INFINITY, f64::min);
                let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!(
                    "{:<15} | {:<15} | {:<15}",
                    "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
                );
                println!("{:-<51}", "");
                println!("{:<15.3} | {:<15.3} | {:<15.3}", mean, min, max);
                println!(
                    "Throughput: {:.1} frames/s",
                    frames as f64 / (mean / 1000.0)
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("threshold=120").unwrap(),
            (ParameterName::Threshold, 120.0)
        );
        assert_eq!(
            parse_override("FIT_1D_X = 1").unwrap(),
            (ParameterName::Fit1DX, 1.0)
        );
        assert!(parse_override("THRESHOLD").is_err());
        assert!(parse_override("NOPE=1").is_err());
        assert!(parse_override("BOX=abc").is_err());
    }

    #[test]
    fn test_cli_parses_process() {
        let cli = Cli::try_parse_from([
            "centroids",
            "process",
            "frames.raw",
            "--width",
            "64",
            "--height",
            "32",
            "--set",
            "BOX=1",
            "--set",
            "SEARCH_BOX=1",
            "--output",
            "photons.csv",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Process {
                width,
                height,
                frames,
                overrides,
                ..
            } => {
                assert_eq!((width, height), (64, 32));
                assert_eq!(frames, None);
                assert_eq!(overrides.len(), 2);
            }
            _ => panic!("expected process"),
        }
    }
}
