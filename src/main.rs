//! Gaze dwell replay tool: runs recorded gaze traces through the conditioner.

use anyhow::{Context, Result};
use clap::Parser;
use gaze_dwell::{
    app::{AppConfig, DwellApp},
    config::{Config, EXAMPLE_CONFIG},
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file to replay (`x y t_ms` per line, `- t_ms` for no prediction)
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Frame interval in milliseconds
    #[arg(short, long, default_value = "16.667")]
    frame_ms: f64,

    /// Screen width in pixels
    #[arg(long, default_value = "1280")]
    width: f64,

    /// Screen height in pixels
    #[arg(long, default_value = "720")]
    height: f64,

    /// Run a synthetic calibration with raw samples offset by DX DY first
    #[arg(long, num_args = 2, value_names = ["DX", "DY"], allow_negative_numbers = true)]
    calibrate_offset: Option<Vec<f64>>,

    /// Seed for beep jitter and synthetic noise
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Gaze dwell replay");

    // Load configuration if provided
    let settings = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let calibrate_offset = match args.calibrate_offset.as_deref() {
        Some([dx, dy]) => Some((*dx, *dy)),
        Some(_) => anyhow::bail!("--calibrate-offset takes exactly two values"),
        None => None,
    };

    if args.trace.is_none() && calibrate_offset.is_none() {
        warn!("Nothing to do: pass --trace and/or --calibrate-offset");
        return Ok(());
    }

    let config = AppConfig {
        trace: args.trace,
        frame_ms: args.frame_ms,
        screen: (args.width, args.height),
        calibrate_offset,
        seed: args.seed,
    };

    // Create and run application
    let mut app = DwellApp::new(config, settings).context("Failed to initialize replay")?;
    if let Some(summary) = app.run()? {
        println!(
            "frames={} signal_frames={} rejected={} feed_dropped={} peak_intensity={:.3} peak_level={} beeps={}",
            summary.frames,
            summary.frames_with_signal,
            summary.rejected,
            summary.feed_dropped,
            summary.peak_intensity,
            summary.peak_level.value(),
            summary.beeps
        );
    }
    let [rx, ry] = app.transform().rows;
    println!("transform=[{:.4} {:.4} {:.3}; {:.4} {:.4} {:.3}]", rx[0], rx[1], rx[2], ry[0], ry[1], ry[2]);

    Ok(())
}
