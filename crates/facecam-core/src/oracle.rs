//! The face recognition backend seen by the gallery encoder and frame matcher.
//!
//! [`FaceOracle`] is the call contract: locate faces, embed faces, and
//! score embeddings against a set of references. Callers must not rely on
//! the ordering of detections beyond "primary face first".

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use crate::{ARCFACE_MODEL_FILE, SCRFD_MODEL_FILE};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("recognition backend failed: {0}")]
    Backend(String),
}

pub trait FaceOracle {
    /// Face boxes in `image` pixel space, primary face first.
    fn face_locations(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, OracleError>;

    /// One embedding per face. With `known = None` the faces are located first.
    fn face_encodings(
        &mut self,
        image: &RgbImage,
        known: Option<&[BoundingBox]>,
    ) -> Result<Vec<Embedding>, OracleError>;

    /// Distance from `probe` to each of `known`, in order. Lower is closer.
    fn face_distance(&self, known: &[Embedding], probe: &Embedding) -> Vec<f32>;

    /// Match flag per `known` entry: distance within `tolerance`.
    ///
    /// Overrides must stay consistent with `face_distance`; the matcher picks
    /// the nearest entry by distance and then takes its flag from here.
    fn compare_faces(&self, known: &[Embedding], probe: &Embedding, tolerance: f32) -> Vec<bool> {
        self.face_distance(known, probe)
            .into_iter()
            .map(|d| d <= tolerance)
            .collect()
    }
}

/// SCRFD + ArcFace backend. Distances are cosine distances.
pub struct OnnxOracle {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxOracle {
    /// Load both models from `model_dir` (`det_10g.onnx`, `w600k_r50.onnx`).
    pub fn load(model_dir: &Path) -> Result<Self, OracleError> {
        let scrfd_path = model_dir.join(SCRFD_MODEL_FILE);
        let arcface_path = model_dir.join(ARCFACE_MODEL_FILE);

        let detector = FaceDetector::load(&scrfd_path.to_string_lossy())?;
        let recognizer = FaceRecognizer::load(&arcface_path.to_string_lossy())?;

        tracing::info!(model_dir = %model_dir.display(), "recognition backend ready");
        Ok(Self { detector, recognizer })
    }
}

impl FaceOracle for OnnxOracle {
    fn face_locations(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, OracleError> {
        Ok(self.detector.detect(image)?)
    }

    fn face_encodings(
        &mut self,
        image: &RgbImage,
        known: Option<&[BoundingBox]>,
    ) -> Result<Vec<Embedding>, OracleError> {
        let located;
        let faces = match known {
            Some(faces) => faces,
            None => {
                located = self.detector.detect(image)?;
                &located[..]
            }
        };

        faces
            .iter()
            .map(|face| self.recognizer.extract(image, face).map_err(OracleError::from))
            .collect()
    }

    fn face_distance(&self, known: &[Embedding], probe: &Embedding) -> Vec<f32> {
        known.iter().map(|k| k.cosine_distance(probe)).collect()
    }
}
