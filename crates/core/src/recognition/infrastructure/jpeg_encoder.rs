use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

use crate::recognition::domain::encoded_image::EncodedImage;
use crate::shared::frame::Frame;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encodes a frame as a JPEG data URL, the form every endpoint expects.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<EncodedImage, EncodeError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(
        frame.data(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;

    let data_url = format!("{DATA_URL_PREFIX}{}", BASE64.encode(&bytes));
    Ok(EncodedImage::new(
        data_url,
        bytes.len(),
        frame.width(),
        frame.height(),
    ))
}

/// Loads any supported image file and re-encodes it for the wire.
pub fn encode_file(path: &Path, quality: u8) -> Result<EncodedImage, EncodeError> {
    let img = image::open(path)?.to_rgb8();
    encode_jpeg(&Frame::from_rgb_image(img, 0), quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn solid_frame(w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 0)
    }

    fn jpeg_bytes(data_url: &str) -> Vec<u8> {
        let payload = data_url.strip_prefix(DATA_URL_PREFIX).unwrap();
        BASE64.decode(payload).unwrap()
    }

    #[test]
    fn test_encode_produces_jpeg_data_url() {
        let encoded = encode_jpeg(&solid_frame(16, 8, 120), 90).unwrap();
        assert!(encoded.data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!((encoded.width(), encoded.height()), (16, 8));

        let bytes = jpeg_bytes(encoded.data_url());
        assert_eq!(bytes.len(), encoded.byte_len());
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encoded_bytes_decode_to_same_size() {
        let encoded = encode_jpeg(&solid_frame(20, 10, 200), 80).unwrap();
        let bytes = jpeg_bytes(encoded.data_url());
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[test]
    fn test_encode_file_reencodes_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("face.png");
        RgbImage::from_pixel(12, 9, Rgb([1, 2, 3])).save(&path).unwrap();

        let encoded = encode_file(&path, 90).unwrap();
        assert_eq!((encoded.width(), encoded.height()), (12, 9));
    }

    #[test]
    fn test_encode_missing_file_fails() {
        assert!(encode_file(Path::new("/nonexistent/face.png"), 90).is_err());
    }
}
