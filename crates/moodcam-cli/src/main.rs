use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use moodcam_core::FaceEmotionAnalyzer;
use moodcam_hw::{Camera, StillImage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod report;

use config::Config;
use engine::Outcome;
use report::Report;

#[derive(Parser)]
#[command(name = "moodcam", about = "Capture one camera frame and report the dominant emotion")]
struct Cli {
    /// Config file (default: $MOODCAM_CONFIG or ~/.config/moodcam/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print a JSON report instead of the plain result
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one frame and classify it (default)
    Detect {
        /// Camera index or device path (e.g., "0", "/dev/video2")
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Classify a still image instead of a camera frame
    Image {
        /// Image file (PNG, JPEG, ...)
        path: PathBuf,
    },
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Detect { device: None }) {
        Commands::Detect { device } => {
            if let Some(device) = device {
                config.camera_device = device;
            }
            let device_path = config.camera_path();
            let mut analyzer = load_analyzer(&config)?;

            let captured_at = Utc::now();
            let outcome = engine::capture_and_classify(|| Camera::open(&device_path), &mut analyzer)
                .with_context(|| format!("capture from {device_path} failed"))?;
            print_outcome(&outcome, &device_path, captured_at, cli.json)?;
        }
        Commands::Image { path } => {
            let source = path.display().to_string();
            let mut analyzer = load_analyzer(&config)?;

            let captured_at = Utc::now();
            let outcome = engine::capture_and_classify(|| StillImage::open(&path), &mut analyzer)
                .with_context(|| format!("classifying {source} failed"))?;
            print_outcome(&outcome, &source, captured_at, cli.json)?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if cli.json {
                let list: Vec<_> = devices
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "path": &d.path,
                            "name": &d.name,
                            "driver": &d.driver,
                            "bus": &d.bus,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if devices.is_empty() {
                println!("No V4L2 capture devices found");
            } else {
                for d in &devices {
                    println!("{}\t{} ({}, {})", d.path, d.name, d.driver, d.bus);
                }
            }
        }
    }

    Ok(())
}

fn load_analyzer(config: &Config) -> Result<FaceEmotionAnalyzer> {
    let detector_path = config.detector_model_path();
    let emotion_path = config.emotion_model_path();
    FaceEmotionAnalyzer::load(
        &detector_path,
        config.face_confidence,
        &emotion_path,
        config.emotion.clone(),
    )
    .with_context(|| format!("failed to load models from {}", config.model_dir.display()))
}

fn print_outcome(
    outcome: &Outcome,
    source: &str,
    captured_at: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    if json {
        let report = Report::new(outcome, source, captured_at);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{outcome}");
    }
    Ok(())
}
