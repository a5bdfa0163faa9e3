//! facecam-core: gallery encoding and per-frame face matching.
//!
//! The heavy lifting (detection, alignment, embedding) sits behind the
//! [`FaceOracle`] trait. [`OnnxOracle`] implements it with SCRFD for
//! detection and ArcFace for recognition, both via ONNX Runtime.

pub mod alignment;
pub mod detector;
pub mod gallery;
pub mod matcher;
pub mod oracle;
pub mod recognizer;
pub mod types;

pub use detector::FaceDetector;
pub use gallery::{identity_name, Gallery, GalleryEntry, GalleryError};
pub use matcher::{FaceLabeler, FrameMatcher, UNKNOWN_NAME};
pub use oracle::{FaceOracle, OnnxOracle, OracleError};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, Embedding, FaceLocation, Recognition};

use std::path::PathBuf;

/// File name of the SCRFD detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the ArcFace recognition model inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Model directory used when none is configured.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}
