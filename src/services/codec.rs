use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat};

/// Decode a base64-encoded PNG into an image.
///
/// Accepts grayscale and RGB(A) palettes; anything else is rejected so the
/// error surfaces at submission time rather than inside the worker.
pub fn decode_base64_image(content: &str) -> Result<DynamicImage, CodecError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content.trim())
        .map_err(CodecError::Base64)?;

    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .map_err(CodecError::Image)?;

    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Ok(image),
        other => Err(CodecError::UnsupportedMode(format!("{:?}", other.color()))),
    }
}

/// Re-encode an image as PNG bytes for storage.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(CodecError::Image)?;
    Ok(buf.into_inner())
}

/// Run-length encode a set of foreground pixel coordinates.
///
/// Pixels are linearized row-major (`y * width + x`) and emitted as
/// space-separated `start length` pairs, one pair per contiguous run.
/// An empty coordinate set encodes to an empty string.
pub fn rle_encode(coords: &[(u32, u32)], width: u32, height: u32) -> String {
    let mut indices: Vec<u64> = coords
        .iter()
        .filter(|(x, y)| *x < width && *y < height)
        .map(|(x, y)| u64::from(*y) * u64::from(width) + u64::from(*x))
        .collect();
    indices.sort_unstable();
    indices.dedup();

    let mut runs: Vec<(u64, u64)> = Vec::new();
    for idx in indices {
        match runs.last_mut() {
            Some((start, len)) if *start + *len == idx => *len += 1,
            _ => runs.push((idx, 1)),
        }
    }

    runs.iter()
        .map(|(start, len)| format!("{} {}", start, len))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid PNG image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported image mode: {0}. Expected grayscale or RGB")]
    UnsupportedMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn gray_png_base64(pixels: &[u8], width: u32, height: u32) -> String {
        let img = GrayImage::from_raw(width, height, pixels.to_vec()).unwrap();
        let bytes = encode_png(&DynamicImage::ImageLuma8(img)).unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn decode_roundtrip_grayscale() {
        let content = gray_png_base64(&[0, 0, 255, 255], 2, 2);
        let image = decode_base64_image(&content).unwrap();
        assert_eq!(image.to_luma8().into_raw(), vec![0, 0, 255, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_base64_image("not base64 at all!!!"),
            Err(CodecError::Base64(_))
        ));

        let not_png = base64::engine::general_purpose::STANDARD.encode(b"hello");
        assert!(matches!(
            decode_base64_image(&not_png),
            Err(CodecError::Image(_))
        ));
    }

    #[test]
    fn rle_empty() {
        assert_eq!(rle_encode(&[], 3, 3), "");
    }

    #[test]
    fn rle_one_pixel() {
        assert_eq!(rle_encode(&[(1, 1)], 3, 3), "4 1");
    }

    #[test]
    fn rle_two_disjoint_pixels() {
        assert_eq!(rle_encode(&[(0, 0), (2, 2)], 3, 3), "0 1 8 1");
    }

    #[test]
    fn rle_two_full_lines() {
        let coords = [(0, 0), (1, 0), (2, 0), (0, 2), (1, 2), (2, 2)];
        assert_eq!(rle_encode(&coords, 3, 3), "0 3 6 3");
    }

    #[test]
    fn rle_middle_line() {
        assert_eq!(rle_encode(&[(0, 1), (1, 1), (2, 1)], 3, 3), "3 3");
    }

    #[test]
    fn rle_ignores_out_of_bounds_and_duplicates() {
        assert_eq!(rle_encode(&[(1, 1), (1, 1), (5, 5)], 3, 3), "4 1");
    }
}
