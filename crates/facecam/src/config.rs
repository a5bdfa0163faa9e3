use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Application configuration.
///
/// Layered as: built-in defaults, then an optional TOML file, then
/// `FACECAM_*` environment variables, then command-line flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Folder of reference images named `<Name>[_suffix].<ext>`.
    pub image_folder: PathBuf,
    /// Requested capture width (advisory).
    pub width: u32,
    /// Requested capture height (advisory).
    pub height: u32,
    /// Run recognition on every Nth frame; other frames reuse the last result.
    pub process_every_n_frames: u32,
    /// V4L2 camera index (`/dev/videoN`).
    pub camera_index: u32,
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    /// Maximum embedding distance accepted as a match.
    pub tolerance: f32,
    /// Downsample factor applied before detection.
    pub frame_resizing: f32,
    pub window_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_folder: PathBuf::from("images/"),
            width: 400,
            height: 400,
            process_every_n_frames: 4,
            camera_index: 0,
            model_dir: facecam_core::default_model_dir(),
            tolerance: facecam_core::matcher::DEFAULT_TOLERANCE,
            frame_resizing: facecam_core::matcher::DEFAULT_FRAME_RESIZING,
            window_title: "Frame".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `file` (if given) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config = Self::from_toml_str(&text)?;
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay `FACECAM_*` variables read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FACECAM_IMAGE_FOLDER") {
            self.image_folder = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACECAM_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACECAM_WINDOW_TITLE") {
            self.window_title = v;
        }
        env_parse(&lookup, "FACECAM_WIDTH", &mut self.width);
        env_parse(&lookup, "FACECAM_HEIGHT", &mut self.height);
        env_parse(&lookup, "FACECAM_PROCESS_EVERY_N_FRAMES", &mut self.process_every_n_frames);
        env_parse(&lookup, "FACECAM_CAMERA_INDEX", &mut self.camera_index);
        env_parse(&lookup, "FACECAM_TOLERANCE", &mut self.tolerance);
        env_parse(&lookup, "FACECAM_FRAME_RESIZING", &mut self.frame_resizing);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_every_n_frames == 0 {
            return Err(ConfigError::Invalid(
                "process_every_n_frames must be at least 1".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "capture size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.frame_resizing > 0.0 && self.frame_resizing <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_resizing must be in (0, 1], got {}",
                self.frame_resizing
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment value"),
    }
}
