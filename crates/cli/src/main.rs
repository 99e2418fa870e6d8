//! dsm2dtm CLI - bare-ground DTM and canopy height from a DSM

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use dsm2dtm_algorithms::pipeline::{
    process_with_options, ProcessingParameters, RunMetadata, DEFAULT_MAX_PIXELS,
    DEFAULT_SEARCH_RADIUS_M,
};
use dsm2dtm_core::io::{read_geotiff, GeoTiffOptions};
use dsm2dtm_core::{Bounds, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "dsm2dtm")]
#[command(author, version, about = "Derive a bare-ground DTM and a canopy height model from a DSM", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Derive DTM and CHM from a DSM
    Process {
        /// Input DSM (single-band GeoTIFF)
        input: PathBuf,
        /// Output DTM file; the CHM is written next to it as <name>_chm.tif
        output: PathBuf,
        /// Width in metres of the largest above-ground object to remove
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_RADIUS_M)]
        radius: f64,
        /// Pixel budget before the filter switches to a downsampled grid
        #[arg(long, default_value_t = DEFAULT_MAX_PIXELS)]
        max_pixels: usize,
        /// Write run metadata as JSON to this file
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Deflate-compress the outputs
        #[arg(long)]
        compress: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_metadata(metadata: &RunMetadata, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).context("Failed to serialise run metadata")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write metadata to {}", path.display()))
}

fn print_bounds(label: &str, b: &Bounds) {
    println!(
        "{}: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        label, b.west, b.south, b.east, b.north
    );
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_summary(metadata: &RunMetadata) {
    println!("Resolution: {:.3} m", metadata.resolution);
    println!(
        "Window: {} px ({:.1} m)",
        metadata.window_pixels, metadata.window_meters
    );
    if metadata.downsampled {
        println!(
            "Downsampled by {} to {} x {}",
            metadata.downsample_factor, metadata.processed_shape.1, metadata.processed_shape.0
        );
    }
    if metadata.negative_chm_cells > 0 {
        println!(
            "Warning: {} cells have a negative canopy height",
            metadata.negative_chm_cells
        );
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster: Raster<f64> = read_geotiff(&input)
                .with_context(|| format!("Failed to read raster {}", input.display()))?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            print_bounds("Bounds", &bounds);
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
                if let Some(ll) = crs.bounds_to_lonlat(&bounds) {
                    print_bounds("Bounds (lon/lat)", &ll);
                }
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!("  Valid cells: {}", stats.valid_count);
            println!("  NoData cells: {}", stats.nodata_count);
        }

        Commands::Process {
            input,
            output,
            radius,
            max_pixels,
            metadata,
            compress,
        } => {
            let params = ProcessingParameters {
                search_radius_meters: radius,
                max_pixels,
            };
            let options = GeoTiffOptions { deflate: compress };

            let start = Instant::now();
            let pb = spinner("Deriving DTM and CHM...");
            let result = process_with_options(&input, &output, &params, &options)
                .with_context(|| format!("Failed to process {}", input.display()))?;
            pb.finish_and_clear();

            print_summary(&result.metadata);
            done("DTM", &result.dtm_path, start.elapsed());
            println!("CHM saved to: {}", result.chm_path.display());

            if let Some(path) = metadata {
                write_metadata(&result.metadata, &path)?;
                println!("Metadata saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
