//! Preview window: overlay drawing and key polling via OpenCV highgui.

use facecam_core::{FaceLocation, Recognition};
use image::RgbImage;
use opencv::core::{Mat, Point, Rect, Scalar, CV_8UC3};
use opencv::prelude::*;
use opencv::{highgui, imgproc};
use thiserror::Error;

/// Key code returned by highgui for Escape.
pub const ESCAPE_KEY: i32 = 27;

const KEY_POLL_MS: i32 = 1;
const LABEL_OFFSET: i32 = 6;
const LABEL_FONT_SCALE: f64 = 2.0;
const LINE_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Where rendered frames go and where key presses come from.
pub trait Viewer {
    fn show(&mut self, frame: &RgbImage, faces: &[Recognition]) -> Result<(), ViewerError>;

    /// Key pressed since the last poll, if any. Waits at most ~1 ms.
    fn poll_key(&mut self) -> Result<Option<i32>, ViewerError>;

    /// Tear down every window.
    fn close(&mut self);
}

/// Baseline-left origin of a face's name label, just above its top-left corner.
pub fn label_origin(location: &FaceLocation) -> (i32, i32) {
    (location.left + LABEL_OFFSET, location.top - LABEL_OFFSET)
}

/// Outline rectangle as (x, y, width, height).
pub fn outline(location: &FaceLocation) -> (i32, i32, i32, i32) {
    (
        location.left,
        location.top,
        location.right - location.left,
        location.bottom - location.top,
    )
}

/// A single titled highgui window.
pub struct HighguiWindow {
    title: String,
}

impl HighguiWindow {
    pub fn open(title: &str) -> Result<Self, ViewerError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        tracing::debug!(title, "preview window created");
        Ok(Self { title: title.to_string() })
    }

    /// Copy an RGB frame into a BGR `Mat` owned by OpenCV.
    fn to_bgr_mat(frame: &RgbImage) -> Result<Mat, ViewerError> {
        // SAFETY: `rgb` borrows `frame`'s buffer (rows * cols * 3 bytes, tightly
        // packed) and is dropped before this function returns; `cvt_color_def`
        // writes into a separately allocated `bgr`.
        let rgb = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                frame.height() as i32,
                frame.width() as i32,
                CV_8UC3,
                frame.as_raw().as_ptr() as *mut _,
                opencv::core::Mat_AUTO_STEP,
            )
        }?;

        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
        Ok(bgr)
    }

    fn draw_overlay(canvas: &mut Mat, faces: &[Recognition]) -> Result<(), ViewerError> {
        let black = Scalar::new(0.0, 0.0, 0.0, 0.0);
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);

        for face in faces {
            let (lx, ly) = label_origin(&face.location);
            imgproc::put_text(
                canvas,
                &face.name,
                Point::new(lx, ly),
                imgproc::FONT_HERSHEY_PLAIN,
                LABEL_FONT_SCALE,
                black,
                LINE_THICKNESS,
                imgproc::LINE_8,
                false,
            )?;

            let (x, y, w, h) = outline(&face.location);
            imgproc::rectangle(
                canvas,
                Rect::new(x, y, w, h),
                green,
                LINE_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;
        }
        Ok(())
    }
}

impl Viewer for HighguiWindow {
    fn show(&mut self, frame: &RgbImage, faces: &[Recognition]) -> Result<(), ViewerError> {
        let mut canvas = Self::to_bgr_mat(frame)?;
        Self::draw_overlay(&mut canvas, faces)?;
        highgui::imshow(&self.title, &canvas)?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<i32>, ViewerError> {
        let key = highgui::wait_key(KEY_POLL_MS)?;
        Ok((key >= 0).then_some(key))
    }

    fn close(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            tracing::warn!(error = %e, "failed to close preview windows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> FaceLocation {
        FaceLocation { top: 40, right: 200, bottom: 160, left: 20 }
    }

    #[test]
    fn test_label_sits_above_top_left() {
        assert_eq!(label_origin(&location()), (26, 34));
    }

    #[test]
    fn test_label_near_top_edge_goes_negative() {
        let loc = FaceLocation { top: 2, right: 30, bottom: 20, left: 0 };
        assert_eq!(label_origin(&loc), (6, -4));
    }

    #[test]
    fn test_outline() {
        assert_eq!(outline(&location()), (20, 40, 180, 120));
    }
}
