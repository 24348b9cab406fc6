use std::fmt;
use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

pub const MEBIBYTE: usize = 1024 * 1024;
pub const MAX_IMAGE_SIZE: usize = 10 * MEBIBYTE;

#[derive(Debug)]
pub enum ImageError {
    Empty,
    TooLarge(usize),
    Decode(image::ImageError),
    Encode(image::ImageError),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty file uploaded"),
            Self::TooLarge(_) => write!(f, "File too large. Max size: 10MB"),
            Self::Decode(err) => write!(f, "Invalid image file: {err}"),
            Self::Encode(err) => write!(f, "failed to encode image: {err}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Returns the payload of a data URI, or the input unchanged when it has no `,` separator.
pub fn strip_data_uri(data: &str) -> &str {
    data.split_once(',').map_or(data, |(_, payload)| payload)
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = strip_data_uri(data)
        .chars()
        .filter(|char| !char.is_ascii_whitespace())
        .collect::<String>();

    STANDARD.decode(payload)
}

pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn validate_size(data: &[u8]) -> Result<(), ImageError> {
    if data.is_empty() {
        return Err(ImageError::Empty);
    }

    if data.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(data.len()));
    }

    Ok(())
}

/// Decodes `data` into an opaque RGB bitmap. Transparent pixels are composited onto white.
pub fn normalize(data: &[u8]) -> Result<RgbImage, ImageError> {
    let image = image::load_from_memory(data).map_err(ImageError::Decode)?;

    Ok(flatten(image))
}

pub fn flatten(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(image) => image,
        image if image.color().has_alpha() => composite_on_white(&image.into_rgba8()),
        image => image.into_rgb8(),
    }
}

pub fn composite_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        Rgb([blend_white(r, a), blend_white(g, a), blend_white(b, a)])
    })
}

/// Linear blend of a channel over white, rounded to the nearest integer.
pub fn blend_white(channel: u8, alpha: u8) -> u8 {
    let channel = u32::from(channel);
    let alpha = u32::from(alpha);
    let blended = (channel * alpha + 255 * (255 - alpha) + 127) / 255;

    u8::try_from(blended).unwrap_or(u8::MAX)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).map_err(ImageError::Encode)?;

    Ok(buffer.into_inner())
}
