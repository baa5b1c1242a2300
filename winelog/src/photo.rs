//! Photo downscaling
//!
//! Photos are embedded in entries as data urls, so their size counts against
//! the storage quota. [`shrink_data_url`] caps the width and re-encodes as
//! jpeg at decreasing quality until the estimated size fits a byte budget.
//!
//! Any decode or encode failure returns the input unchanged.

use std::{io::Cursor, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, imageops::FilterType};
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::{Result, error::ImageSnafu};

/// Constraints for [`shrink_data_url`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkOptions {
    /// Output is never wider than this. Smaller images are not upscaled.
    pub max_width: u32,
    /// Target size of the decoded image bytes
    pub max_bytes: usize,
    /// First jpeg quality tried, 0.0 - 1.0
    pub start_quality: f32,
    /// Lowest quality tried. Used even if the budget is not met.
    pub min_quality: f32,
    pub step: f32,
}

impl ShrinkOptions {
    /// Limits for photos attached to a form
    pub fn form() -> Self {
        Self {
            max_width: 1600,
            max_bytes: 400 * 1024,
            start_quality: 0.85,
            min_quality: 0.5,
            step: 0.1,
        }
    }

    /// Tighter limits for the public snapshot
    pub fn public() -> Self {
        Self {
            max_width: 900,
            max_bytes: 150 * 1024,
            start_quality: 0.8,
            min_quality: 0.4,
            step: 0.1,
        }
    }
}

impl Default for ShrinkOptions {
    fn default() -> Self {
        Self::form()
    }
}

/// Encodes bytes as a base64 data url
pub fn data_url_from_bytes(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 data url into mime type and decoded bytes
pub fn parse_data_url(input: &str) -> Option<(String, Vec<u8>)> {
    let rest = input.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

/// Mime type for an image file, from its extension
pub fn guess_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Decoded size of a data url's payload, from the base64 length
pub fn estimated_bytes(data_url: &str) -> usize {
    let payload = data_url.split_once(',').map_or(data_url, |(_, p)| p);
    (payload.len() * 3).div_ceil(4)
}

/// Downscales and re-encodes a photo data url.
///
/// Returns a jpeg data url no wider than `max_width`, encoded at the highest
/// quality step (from `start_quality` down) whose estimated size is within
/// `max_bytes`, or at `min_quality` if none is. Returns `input` unchanged when
/// it cannot be decoded.
pub fn shrink_data_url(input: &str, opts: &ShrinkOptions) -> String {
    let Some((_, bytes)) = parse_data_url(input) else {
        debug!("photo is not a base64 data url, leaving unchanged");
        return input.to_string();
    };
    let image = match decode_image(&bytes) {
        Ok(image) => image,
        Err(err) => {
            warn!("photo decode failed, leaving unchanged: {err}");
            return input.to_string();
        }
    };
    let scaled = scale_to_width(&image, opts.max_width);

    let min = opts.min_quality.clamp(0.01, 1.0);
    let step = if opts.step > 0.0 { opts.step } else { 0.1 };
    let mut quality = opts.start_quality.clamp(min, 1.0);
    loop {
        let url = match encode_jpeg(&scaled, quality) {
            Ok(url) => url,
            Err(err) => {
                warn!("photo encode failed, leaving unchanged: {err}");
                return input.to_string();
            }
        };
        let size = estimated_bytes(&url);
        if size <= opts.max_bytes || quality <= min + f32::EPSILON {
            debug!(
                width = scaled.width(),
                height = scaled.height(),
                quality,
                size,
                "photo shrunk"
            );
            return url;
        }
        quality = (quality - step).max(min);
    }
}

/// Uniformly scales `image` so its width is at most `max_width`
fn scale_to_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if max_width == 0 || width <= max_width {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }
    let scale = f64::from(max_width) / f64::from(width);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_height = ((f64::from(height) * scale).round() as u32).max(1);
    DynamicImage::ImageRgb8(
        image
            .resize_exact(max_width, new_height, FilterType::Triangle)
            .to_rgb8(),
    )
}

/// Decodes png, jpeg, gif, webp or bmp bytes
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context(ImageSnafu)
}

fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<String> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    image.write_with_encoder(encoder).context(ImageSnafu)?;
    Ok(data_url_from_bytes(buf.get_ref(), "image/jpeg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .expect("encode png");
        data_url_from_bytes(buf.get_ref(), "image/png")
    }

    fn decoded_dims(data_url: &str) -> (u32, u32) {
        let (_, bytes) = parse_data_url(data_url).expect("data url");
        let img = image::load_from_memory(&bytes).expect("decode");
        (img.width(), img.height())
    }

    #[test]
    fn wide_square_image_is_capped() {
        let input = png_data_url(2000, 2000);
        let opts = ShrinkOptions {
            max_width: 900,
            ..ShrinkOptions::public()
        };
        let out = shrink_data_url(&input, &opts);
        assert!(out.starts_with("data:image/jpeg;base64,"));
        let (w, h) = decoded_dims(&out);
        assert!(w <= 900);
        assert_eq!(w, h);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let input = png_data_url(40, 20);
        let out = shrink_data_url(&input, &ShrinkOptions::form());
        assert_eq!(decoded_dims(&out), (40, 20));
    }

    #[test]
    fn undecodable_input_is_returned_unchanged() {
        for input in [
            "not a data url",
            "data:image/png;base64,!!!!",
            "data:image/png;base64,aGVsbG8=",
        ] {
            assert_eq!(shrink_data_url(input, &ShrinkOptions::form()), input);
        }
    }

    #[test]
    fn decode_failure_is_image_error() {
        let err = decode_image(b"hello").expect_err("not an image");
        assert!(matches!(err, crate::error::WinelogError::Image { .. }));
    }

    #[test]
    fn unreachable_budget_ends_at_min_quality() {
        let input = png_data_url(300, 300);
        let opts = ShrinkOptions {
            max_bytes: 1,
            ..ShrinkOptions::form()
        };
        let out = shrink_data_url(&input, &opts);
        assert!(estimated_bytes(&out) > 1);
        assert_eq!(decoded_dims(&out), (300, 300));
    }

    #[test]
    fn estimate_matches_decoded_length() {
        let url = data_url_from_bytes(&[1, 2, 3, 4, 5], "image/png");
        let (_, bytes) = parse_data_url(&url).expect("parse");
        assert_eq!(bytes.len(), 5);
        // padding makes the estimate round up
        assert!(estimated_bytes(&url) >= 5);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("x.png")), "image/png");
        assert_eq!(guess_mime(Path::new("x")), "application/octet-stream");
    }
}
