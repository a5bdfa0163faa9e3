use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecam_core::{FrameMatcher, Gallery, OnnxOracle};
use facecam_hw::Camera;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod display;
mod live;

use config::Config;
use display::HighguiWindow;
use live::LiveSession;

#[derive(Parser)]
#[command(name = "facecam", about = "Live webcam face recognition against a folder of known faces")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder of reference images (`<Name>[_suffix].<ext>`)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Requested capture width
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Requested capture height
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Run recognition every N frames
    #[arg(long, global = true)]
    every: Option<u32>,

    /// Camera index (/dev/videoN)
    #[arg(long, global = true)]
    camera: Option<u32>,

    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    /// Maximum embedding distance accepted as a match
    #[arg(long, global = true)]
    tolerance: Option<f32>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Open the camera and label faces live (default)
    Run,
    /// Encode the reference folder and list the identities found
    Gallery,
    /// List V4L2 capture devices
    Devices,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(images) = &self.images {
            config.image_folder = images.clone();
        }
        if let Some(models) = &self.models {
            config.model_dir = models.clone();
        }
        config.width = self.width.unwrap_or(config.width);
        config.height = self.height.unwrap_or(config.height);
        config.process_every_n_frames = self.every.unwrap_or(config.process_every_n_frames);
        config.camera_index = self.camera.unwrap_or(config.camera_index);
        config.tolerance = self.tolerance.unwrap_or(config.tolerance);

        config.validate()?;
        tracing::debug!(?config, "effective configuration");
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config()?),
        Commands::Gallery => show_gallery(&cli.config()?),
        Commands::Devices => {
            list_devices();
            Ok(())
        }
    }
}

fn load_gallery(config: &Config, oracle: &mut OnnxOracle) -> Result<Gallery> {
    Gallery::load(&config.image_folder, oracle).with_context(|| {
        format!("failed to load gallery from {}", config.image_folder.display())
    })
}

fn run(config: &Config) -> Result<()> {
    let mut oracle = OnnxOracle::load(&config.model_dir).context("failed to load models")?;
    let gallery = load_gallery(config, &mut oracle)?;
    if gallery.is_empty() {
        tracing::warn!("gallery is empty; every face will be labelled Unknown");
    }

    let matcher = FrameMatcher::new(&gallery, oracle)
        .with_frame_resizing(config.frame_resizing)
        .with_tolerance(config.tolerance);

    let camera = Camera::open(config.camera_index, config.width, config.height)
        .with_context(|| format!("failed to open camera {}", config.camera_index))?;
    tracing::info!(
        device = %camera.device_path,
        width = camera.width,
        height = camera.height,
        fourcc = %camera.fourcc,
        format = ?camera.pixel_format(),
        "camera ready"
    );

    let window = HighguiWindow::open(&config.window_title)?;

    println!("Press Esc in the preview window to quit.");
    let frames = LiveSession::new(camera, matcher, window, config.process_every_n_frames)
        .run()
        .context("live session failed")?;
    tracing::info!(frames, "exiting");
    Ok(())
}

fn show_gallery(config: &Config) -> Result<()> {
    let mut oracle = OnnxOracle::load(&config.model_dir).context("failed to load models")?;
    let gallery = load_gallery(config, &mut oracle)?;

    if gallery.is_empty() {
        println!("No identities found in {}", config.image_folder.display());
        return Ok(());
    }

    println!("{} identities in {}:", gallery.len(), config.image_folder.display());
    for entry in gallery.entries() {
        println!(
            "  {:<20} images: {:<3} dim: {}",
            entry.name,
            entry.samples,
            entry.embedding.values.len()
        );
    }
    Ok(())
}

fn list_devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
        return;
    }
    for dev in devices {
        println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
    }
}
