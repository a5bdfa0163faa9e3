/// Bounding box for a detected face, with optional facial landmarks.
///
/// Coordinates are in the pixel space of the image the detector ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Map this box back to the full-size frame after detecting on an image
    /// downsampled by `scale`, truncating each edge toward zero.
    pub fn to_location(&self, scale: f32) -> FaceLocation {
        let rescale = |v: f32| (v / scale) as i32;
        FaceLocation {
            top: rescale(self.y),
            right: rescale(self.x + self.width),
            bottom: rescale(self.y + self.height),
            left: rescale(self.x),
        }
    }
}

/// Integer face rectangle in original-frame pixels, ordered (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// One labelled face in a processed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub location: FaceLocation,
    pub name: String,
}

/// Face embedding vector (typically 512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Zero vectors score 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Cosine distance `1 - similarity`, in [0, 2].
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - self.similarity(other)
    }

    /// Euclidean distance, used by the test backends.
    #[cfg(test)]
    pub(crate) fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Elementwise mean of a set of embeddings.
    ///
    /// The dimension is taken from the first embedding. Returns `None` for an
    /// empty set. `model_version` is kept only if every input agrees on it.
    pub fn mean<'a, I>(embeddings: I) -> Option<Embedding>
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut iter = embeddings.into_iter();
        let first = iter.next()?;

        let mut sum = first.values.clone();
        let mut model_version = first.model_version.clone();
        let mut count = 1usize;

        for emb in iter {
            for (acc, v) in sum.iter_mut().zip(emb.values.iter()) {
                *acc += v;
            }
            if model_version != emb.model_version {
                model_version = None;
            }
            count += 1;
        }

        let n = count as f32;
        Some(Embedding {
            values: sum.into_iter().map(|v| v / n).collect(),
            model_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding { values: values.to_vec(), model_version: None }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = emb(&[1.0, 0.0, 0.0]);
        let b = emb(&[1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
        assert!(a.cosine_distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
        assert!((a.cosine_distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_cosine_distance_ignores_magnitude() {
        let a = emb(&[0.5, 0.5]);
        let b = emb(&[4.0, 4.0]);
        assert!(a.cosine_distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_elementwise() {
        let a = emb(&[1.0, 2.0, 3.0]);
        let b = emb(&[3.0, 4.0, 5.0]);
        let m = Embedding::mean([&a, &b]).unwrap();
        assert_eq!(m.values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert!(Embedding::mean(std::iter::empty()).is_none());
    }

    #[test]
    fn test_mean_model_version() {
        let a = Embedding { values: vec![1.0], model_version: Some("w600k_r50".into()) };
        let b = Embedding { values: vec![3.0], model_version: Some("w600k_r50".into()) };
        let c = Embedding { values: vec![5.0], model_version: None };
        assert_eq!(Embedding::mean([&a, &b]).unwrap().model_version.as_deref(), Some("w600k_r50"));
        assert_eq!(Embedding::mean([&a, &c]).unwrap().model_version, None);
    }

    #[test]
    fn test_to_location_rescales_and_truncates() {
        // (top, right, bottom, left) = (10, 50, 40, 5) in the quarter-size image
        let bbox = BoundingBox {
            x: 5.0, y: 10.0, width: 45.0, height: 30.0,
            confidence: 0.9, landmarks: None,
        };
        let loc = bbox.to_location(0.25);
        assert_eq!(loc, FaceLocation { top: 40, right: 200, bottom: 160, left: 20 });
    }

    #[test]
    fn test_to_location_fractional_truncates_toward_zero() {
        let bbox = BoundingBox {
            x: 2.3, y: 1.1, width: 10.0, height: 10.0,
            confidence: 0.9, landmarks: None,
        };
        let loc = bbox.to_location(0.25);
        // 1.1 / 0.25 = 4.4, 2.3 / 0.25 = 9.2, 12.3 / 0.25 = 49.2, 11.1 / 0.25 = 44.4
        assert_eq!(loc, FaceLocation { top: 4, right: 49, bottom: 44, left: 9 });
    }
}
