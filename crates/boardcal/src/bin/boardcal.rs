use std::{error::Error, path::PathBuf};

use boardcal::pipeline::{save_image, Pipeline};
use boardcal::report::{format_calibration, format_detection};
use boardcal::BoardcalConfig;
use clap::{ArgAction, Parser};
use log::LevelFilter;

/// Checkerboard camera calibration CLI.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Detect a checkerboard, calibrate the camera and show the undistorted image"
)]
struct Args {
    /// Input images. Every image with a complete board is one calibration view.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Optional JSON config (detector, board and calibration settings).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not open the result window.
    #[arg(long)]
    no_display: bool,

    /// Write the undistorted image to this path.
    #[arg(long)]
    save_undistorted: Option<PathBuf>,

    /// Write the image with the detection overlay to this path.
    #[arg(long)]
    save_annotated: Option<PathBuf>,

    /// Print a JSON report instead of text.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: u8) -> Result<(), Box<dyn Error>> {
    boardcal::core::init_tracing(false, level_for(verbose));
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) -> Result<(), Box<dyn Error>> {
    boardcal::core::init_with_level(level_for(verbose))?;
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;
    log::debug!("log level {}", level_for(args.verbose));

    let config = match &args.config {
        Some(path) => BoardcalConfig::from_json_file(path)?,
        None => BoardcalConfig::default(),
    };
    let pipeline = Pipeline::new(config)?;
    let multiple = args.images.len() > 1;
    let outcome = pipeline.run_with(&args.images, |view| {
        if args.json {
            return;
        }
        if multiple {
            println!("{}:", view.path.display());
        }
        println!("{}", format_detection(view.found(), &view.detection.image_points()));
        if !view.found() {
            println!("not found");
        }
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    }

    let Some(calibrated) = &outcome.calibration else {
        return Ok(());
    };

    if !args.json {
        println!("{}", format_calibration(&calibrated.result));
    }
    if let Some(path) = &args.save_annotated {
        save_image(&calibrated.annotated, path)?;
    }
    if let Some(path) = &args.save_undistorted {
        save_image(&calibrated.undistorted, path)?;
    }

    if !args.no_display {
        show(&calibrated.undistorted)?;
    }
    Ok(())
}

#[cfg(feature = "display")]
fn show(img: &image::RgbImage) -> Result<(), Box<dyn Error>> {
    boardcal::display::show_image("boardcal", img)?;
    Ok(())
}

#[cfg(not(feature = "display"))]
fn show(_img: &image::RgbImage) -> Result<(), Box<dyn Error>> {
    log::warn!("built without the `display` feature, use --save-undistorted to keep the result");
    Ok(())
}
