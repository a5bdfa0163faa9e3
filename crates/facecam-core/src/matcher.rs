//! Per-frame face matching against an immutable [`Gallery`].

use crate::gallery::Gallery;
use crate::oracle::{FaceOracle, OracleError};
use crate::types::{Embedding, Recognition};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Label for faces with no gallery identity within tolerance.
pub const UNKNOWN_NAME: &str = "Unknown";

pub const DEFAULT_FRAME_RESIZING: f32 = 0.25;
pub const DEFAULT_TOLERANCE: f32 = 0.35;

/// Anything that can label the faces in a full-size frame.
pub trait FaceLabeler {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Recognition>, OracleError>;
}

/// Downsample, detect, embed, and assign the nearest gallery name.
pub struct FrameMatcher<'g, O> {
    gallery: &'g Gallery,
    oracle: O,
    frame_resizing: f32,
    tolerance: f32,
}

impl<'g, O: FaceOracle> FrameMatcher<'g, O> {
    pub fn new(gallery: &'g Gallery, oracle: O) -> Self {
        Self {
            gallery,
            oracle,
            frame_resizing: DEFAULT_FRAME_RESIZING,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Scale factor applied before detection; must be in (0, 1].
    pub fn with_frame_resizing(mut self, frame_resizing: f32) -> Self {
        self.frame_resizing = frame_resizing;
        self
    }

    /// Maximum distance accepted as a match.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Name for one probe embedding: the closest identity if the oracle's
    /// `compare_faces` accepts it, otherwise [`UNKNOWN_NAME`].
    pub fn name_for(&self, probe: &Embedding) -> String {
        let known = self.gallery.embeddings();
        let distances = self.oracle.face_distance(known, probe);

        let best = distances
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx);

        let matches = self.oracle.compare_faces(known, probe, self.tolerance);
        match best {
            Some(idx) if matches.get(idx).copied().unwrap_or(false) => {
                self.gallery.names()[idx].clone()
            }
            _ => UNKNOWN_NAME.to_string(),
        }
    }

    fn downsample(&self, frame: &RgbImage) -> RgbImage {
        let scaled = |v: u32| ((v as f32 * self.frame_resizing).round() as u32).max(1);
        imageops::resize(
            frame,
            scaled(frame.width()),
            scaled(frame.height()),
            FilterType::Triangle,
        )
    }
}

impl<O: FaceOracle> FaceLabeler for FrameMatcher<'_, O> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Recognition>, OracleError> {
        let small = self.downsample(frame);

        let boxes = self.oracle.face_locations(&small)?;
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self.oracle.face_encodings(&small, Some(&boxes))?;

        let results: Vec<Recognition> = boxes
            .iter()
            .zip(encodings.iter())
            .map(|(bbox, encoding)| Recognition {
                location: bbox.to_location(self.frame_resizing),
                name: self.name_for(encoding),
            })
            .collect();

        tracing::debug!(
            faces = results.len(),
            known = results.iter().filter(|r| r.name != UNKNOWN_NAME).count(),
            "frame matched"
        );
        Ok(results)
    }
}
