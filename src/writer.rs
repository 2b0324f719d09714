//! Format-correct encoding of the final raster.
//!
//! Encoding targets an in-memory buffer so a failing item never leaves a
//! partial file on disk; the exporter writes the buffer in one shot only
//! after the whole pipeline for that item succeeded.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbImage};

use crate::error::Result;
use crate::settings::OutputFormat;

/// Encode an image per the output format rules.
///
/// JPEG cannot carry alpha: any alpha channel is flattened onto an opaque
/// white background before encoding at the requested quality. PNG encodes
/// RGB/RGBA directly and preserves alpha exactly.
///
/// # Errors
///
/// Returns [`crate::Error::Image`] when encoding fails.
pub fn encode(image: &DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = if image.color().has_alpha() {
                flatten_onto_white(image)
            } else {
                image.to_rgb8()
            };
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        }
    }
    Ok(buffer)
}

/// Alpha-composite over solid white and drop the alpha channel.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
        let a = u32::from(src[3]);
        for ch in 0..3 {
            let c = u32::from(src[ch]);
            #[allow(clippy::cast_possible_truncation)]
            {
                dst[ch] = ((c * a + 255 * (255 - a) + 127) / 255) as u8;
            }
        }
    }
    rgb
}
