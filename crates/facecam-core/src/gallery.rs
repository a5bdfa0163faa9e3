//! Known-identity gallery, built once from a folder of reference images.
//!
//! Each image contributes at most one embedding, filed under the name taken
//! from its file name (`Kelly_1.jpg` → `Kelly`). Embeddings sharing a name are
//! averaged into one representative vector. The gallery is immutable after
//! construction.

use crate::oracle::FaceOracle;
use crate::types::Embedding;
use image::{ImageReader, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery folder {}: {source}", .path.display())]
    FolderAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Borrowed view of one identity.
#[derive(Debug, Clone, Copy)]
pub struct GalleryEntry<'a> {
    pub name: &'a str,
    pub embedding: &'a Embedding,
    /// Number of reference images averaged into `embedding`.
    pub samples: usize,
}

/// Name → representative embedding table, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    names: Vec<String>,
    embeddings: Vec<Embedding>,
    samples: Vec<usize>,
}

impl Gallery {
    /// A gallery with no identities; every face matches as unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Group `(name, embedding)` samples by name and average each group.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (String, Embedding)>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Embedding>> = HashMap::new();

        for (name, embedding) in samples {
            grouped
                .entry(name.clone())
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(embedding);
        }

        let mut gallery = Self::empty();
        for name in order {
            let Some(group) = grouped.remove(&name) else {
                continue;
            };
            let Some(mean) = Embedding::mean(&group) else {
                continue;
            };
            gallery.names.push(name);
            gallery.embeddings.push(mean);
            gallery.samples.push(group.len());
        }
        gallery
    }

    /// Encode every image in `folder` (non-recursive) and build the gallery.
    ///
    /// Unreadable images, images without a face, and images the backend fails
    /// on are skipped with a warning. Only failure to list the folder is an error.
    pub fn load<O>(folder: &Path, oracle: &mut O) -> Result<Self, GalleryError>
    where
        O: FaceOracle + ?Sized,
    {
        let paths = list_images(folder)?;
        tracing::info!(folder = %folder.display(), count = paths.len(), "encoding images found");

        let mut samples = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = match decode_rgb(path) {
                Ok(img) => img,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not load image; skipping");
                    continue;
                }
            };

            let encodings = match oracle.face_encodings(&image, None) {
                Ok(encodings) => encodings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "encoding failed; skipping");
                    continue;
                }
            };

            let found = encodings.len();
            let Some(primary) = encodings.into_iter().next() else {
                tracing::warn!(path = %path.display(), "no face found; skipping");
                continue;
            };
            if found > 1 {
                tracing::debug!(path = %path.display(), faces = found, "multiple faces; using the first");
            }

            samples.push((identity_name(path), primary));
        }

        let gallery = Self::from_samples(samples);
        tracing::info!(
            identities = gallery.len(),
            images = gallery.samples.iter().sum::<usize>(),
            "encoding images loaded"
        );
        Ok(gallery)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Representative embeddings, index-aligned with [`names`](Self::names).
    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn get(&self, name: &str) -> Option<GalleryEntry<'_>> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.entry(idx)
    }

    pub fn entry(&self, idx: usize) -> Option<GalleryEntry<'_>> {
        Some(GalleryEntry {
            name: self.names.get(idx)?,
            embedding: self.embeddings.get(idx)?,
            samples: self.samples.get(idx).copied()?,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = GalleryEntry<'_>> + '_ {
        (0..self.len()).filter_map(|i| self.entry(i))
    }
}

/// Identity name for a reference image: the file stem up to the first `_`.
///
/// A stem that starts with `_` keeps the whole stem rather than an empty name.
pub fn identity_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.split('_').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => stem,
    }
}

/// Regular, non-hidden files directly inside `folder`, sorted by path.
fn list_images(folder: &Path) -> Result<Vec<PathBuf>, GalleryError> {
    let access = |source| GalleryError::FolderAccess {
        path: folder.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(access)? {
        let path = entry.map_err(access)?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if !hidden && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decode by content sniffing, falling back to the extension.
fn decode_rgb(path: &Path) -> Result<RgbImage, image::ImageError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::types::BoundingBox;
    use image::{ImageFormat, Rgb};

    /// Backend that "recognises" an image by its top-left pixel: red channel 0
    /// means no face, otherwise one embedding per unit of the green channel.
    struct PixelOracle;

    impl FaceOracle for PixelOracle {
        fn face_locations(&mut self, _: &RgbImage) -> Result<Vec<BoundingBox>, OracleError> {
            Ok(Vec::new())
        }

        fn face_encodings(
            &mut self,
            image: &RgbImage,
            _: Option<&[BoundingBox]>,
        ) -> Result<Vec<Embedding>, OracleError> {
            let Rgb([r, g, b]) = *image.get_pixel(0, 0);
            if r == 0 {
                return Ok(Vec::new());
            }
            Ok((0..g.max(1))
                .map(|i| Embedding {
                    values: vec![r as f32 + i as f32 * 100.0, b as f32],
                    model_version: None,
                })
                .collect())
        }

        fn face_distance(&self, known: &[Embedding], probe: &Embedding) -> Vec<f32> {
            known.iter().map(|k| k.euclidean_distance(probe)).collect()
        }
    }

    fn write_png(dir: &Path, name: &str, pixel: [u8; 3]) {
        RgbImage::from_pixel(4, 4, Rgb(pixel))
            .save_with_format(dir.join(name), ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_identity_name() {
        assert_eq!(identity_name(Path::new("Alice_2.png")), "Alice");
        assert_eq!(identity_name(Path::new("Bob.png")), "Bob");
        assert_eq!(identity_name(Path::new("images/Kelly_1.jpg")), "Kelly");
        assert_eq!(identity_name(Path::new("Mary_Jane_3.jpg")), "Mary");
        assert_eq!(identity_name(Path::new("Carl")), "Carl");
        assert_eq!(identity_name(Path::new("_odd.jpg")), "_odd");
    }

    #[test]
    fn test_from_samples_averages_shared_names() {
        let e = |v: f32| Embedding { values: vec![v, v * 2.0], model_version: None };
        let gallery = Gallery::from_samples(vec![
            ("Kelly".to_string(), e(1.0)),
            ("Bob".to_string(), e(10.0)),
            ("Kelly".to_string(), e(3.0)),
        ]);

        assert_eq!(gallery.names(), &["Kelly".to_string(), "Bob".to_string()]);
        let kelly = gallery.get("Kelly").unwrap();
        assert_eq!(kelly.embedding.values, vec![2.0, 4.0]);
        assert_eq!(kelly.samples, 2);
        assert_eq!(gallery.get("Bob").unwrap().samples, 1);
        assert!(gallery.get("Nobody").is_none());
    }

    #[test]
    fn test_load_groups_and_averages() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Kelly_1.png", [10, 1, 20]);
        write_png(dir.path(), "Kelly_2.png", [30, 1, 40]);
        write_png(dir.path(), "Bob.png", [50, 1, 60]);

        let gallery = Gallery::load(dir.path(), &mut PixelOracle).unwrap();

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.names(), &["Bob".to_string(), "Kelly".to_string()]);
        assert_eq!(gallery.get("Kelly").unwrap().embedding.values, vec![20.0, 30.0]);
        assert_eq!(gallery.get("Bob").unwrap().embedding.values, vec![50.0, 60.0]);
        assert_eq!(gallery.entries().map(|e| e.samples).sum::<usize>(), 3);
    }

    #[test]
    fn test_load_skips_unreadable_and_faceless() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Alice_1.png", [10, 1, 10]);
        write_png(dir.path(), "Ghost_1.png", [0, 1, 0]);
        std::fs::write(dir.path().join("Broken_1.jpg"), b"not an image").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        write_png(dir.path(), ".Hidden_1.png", [99, 1, 99]);
        std::fs::create_dir(dir.path().join("Nested_1.png")).unwrap();

        let gallery = Gallery::load(dir.path(), &mut PixelOracle).unwrap();

        assert_eq!(gallery.names(), &["Alice".to_string()]);
    }

    #[test]
    fn test_load_sniffs_format_from_content() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Dana_1.jpg", [10, 1, 10]);
        write_png(dir.path(), "Eve_1.photo", [20, 1, 20]);
        write_png(dir.path(), "Carl", [30, 1, 30]);

        let gallery = Gallery::load(dir.path(), &mut PixelOracle).unwrap();

        assert_eq!(
            gallery.names(),
            &["Carl".to_string(), "Dana".to_string(), "Eve".to_string()]
        );
    }

    #[test]
    fn test_load_keeps_first_of_multiple_faces() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Group_1.png", [7, 3, 8]);

        let gallery = Gallery::load(dir.path(), &mut PixelOracle).unwrap();

        assert_eq!(gallery.get("Group").unwrap().embedding.values, vec![7.0, 8.0]);
    }

    #[test]
    fn test_load_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::load(dir.path(), &mut PixelOracle).unwrap();
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_load_missing_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Gallery::load(&missing, &mut PixelOracle).unwrap_err();
        assert!(matches!(err, GalleryError::FolderAccess { .. }));
    }
}
