use image::{imageops::FilterType, ImageFormat, RgbImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Unrecognized image format: {0}")]
    UnknownFormat(std::io::Error),
    #[error("Error decoding image: {0}")]
    Corrupt(#[from] image::ImageError),
}

#[derive(Error, Debug)]
#[error("Error encoding image: {0}")]
pub struct EncodeError(#[from] image::ImageError);

/// Decodes raw bytes into a three-channel image, whatever the source layout.
pub fn decode_image(data: &[u8]) -> Result<RgbImage, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image_reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(DecodeError::UnknownFormat)?;

    let decoded = image_reader.decode()?;
    Ok(decoded.to_rgb8())
}

pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;
    Ok(buffer)
}

pub fn resize_preview(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    image::imageops::resize(img, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb([255, 0, 0]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    #[test]
    fn test_decode_then_reencode_keeps_dimensions() {
        for (width, height) in [(1, 1), (64, 64), (321, 17)] {
            let decoded = decode_image(&png_bytes(width, height)).unwrap();
            let jpeg = encode_jpeg(&decoded).unwrap();
            let redecoded = decode_image(&jpeg).unwrap();
            assert_eq!(redecoded.dimensions(), (width, height));
        }
    }

    #[test]
    fn test_rgba_is_normalized_to_rgb() {
        let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_pixel(8, 4, Rgba([0, 255, 0, 128]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&data).unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(decode_image(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_non_image_bytes_fail() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn test_truncated_png_fails() {
        let data = png_bytes(64, 64);
        assert!(decode_image(&data[..data.len() / 2]).is_err());
    }

    #[test]
    fn test_resize_preview() {
        let decoded = decode_image(&png_bytes(100, 50)).unwrap();
        assert_eq!(resize_preview(&decoded, 340, 340).dimensions(), (340, 340));
    }
}
