//! Raw V4L2 buffer → RGB frame conversion.

use image::{GrayImage, ImageFormat, RgbImage};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("MJPG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), FrameError> {
    if buf.len() < expected {
        return Err(FrameError::InvalidLength { expected, actual: buf.len() });
    }
    Ok(())
}

/// Convert packed YUYV (4:2:2) to RGB with BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let pixels = (width * height) as usize;
    check_len(yuyv, pixels * 2)?;

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in yuyv[..pixels * 2].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            rgb.push((y + 1.402 * v).round().clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344_136 * u - 0.714_136 * v).round().clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).round().clamp(0.0, 255.0) as u8);
        }
    }
    // Odd pixel counts leave one trailing pixel without a chunk.
    rgb.resize(pixels * 3, 0);

    Ok(RgbImage::from_raw(width, height, rgb).unwrap_or_else(|| RgbImage::new(width, height)))
}

/// Packed 24-bit RGB (V4L2 `RGB3`).
pub fn rgb24_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 3) as usize;
    check_len(buf, expected)?;
    Ok(RgbImage::from_raw(width, height, buf[..expected].to_vec())
        .unwrap_or_else(|| RgbImage::new(width, height)))
}

/// 8-bit grayscale replicated into three channels.
pub fn grey_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    check_len(buf, expected)?;
    let gray = GrayImage::from_raw(width, height, buf[..expected].to_vec())
        .unwrap_or_else(|| GrayImage::new(width, height));
    Ok(image::DynamicImage::ImageLuma8(gray).to_rgb8())
}

/// Motion-JPEG: each buffer is a complete JPEG image.
pub fn mjpeg_to_rgb(buf: &[u8]) -> Result<RgbImage, FrameError> {
    Ok(image::load_from_memory_with_format(buf, ImageFormat::Jpeg)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_yuyv_gray_pixels() {
        // Neutral chroma → R = G = B = Y
        let yuyv = vec![100, 128, 200, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // Strong V pushes red up and green down.
        let yuyv = vec![128, 128, 128, 228];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        let Rgb([r, g, b]) = *rgb.get_pixel(0, 0);
        assert!(r > 250, "r = {r}");
        assert!(g < 70, "g = {g}");
        assert_eq!(b, 128);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let result = yuyv_to_rgb(&[100, 128], 2, 1);
        assert!(matches!(result, Err(FrameError::InvalidLength { expected: 4, actual: 2 })));
    }

    #[test]
    fn test_grey_to_rgb() {
        let rgb = grey_to_rgb(&[0, 50, 255, 7], 2, 2).unwrap();
        assert_eq!(rgb.dimensions(), (2, 2));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([50, 50, 50]));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([7, 7, 7]));
    }

    #[test]
    fn test_rgb24_to_rgb() {
        let buf = [1, 2, 3, 4, 5, 6, 99];
        let rgb = rgb24_to_rgb(&buf, 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([4, 5, 6]));
        assert!(rgb24_to_rgb(&buf[..5], 2, 1).is_err());
    }

    #[test]
    fn test_mjpeg_roundtrip_dimensions() {
        let source = RgbImage::from_pixel(8, 6, Rgb([10, 200, 30]));
        let mut jpeg = std::io::Cursor::new(Vec::new());
        source.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();

        let decoded = mjpeg_to_rgb(jpeg.get_ref()).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
    }

    #[test]
    fn test_mjpeg_garbage_is_error() {
        assert!(matches!(mjpeg_to_rgb(b"definitely not jpeg"), Err(FrameError::Decode(_))));
    }
}
