//! Base-image scaling stage.

use image::{imageops::FilterType, DynamicImage};

use crate::settings::ResizeMode;

/// Scale the base image per the resize policy.
///
/// Width/height modes preserve the aspect ratio; percent scales both axes
/// and never collapses below 1px. Resampling is Lanczos3. Indexed and
/// 1-bit sources are already expanded to RGB/RGBA by the decoder before
/// they reach this stage.
#[must_use]
pub fn resize(image: DynamicImage, mode: ResizeMode) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let (new_w, new_h) = match mode {
        ResizeMode::None => return image,
        ResizeMode::Width(v) => (v, round_ratio(h, v, w)),
        ResizeMode::Height(v) => (round_ratio(w, v, h), v),
        ResizeMode::Percent(v) => (round_percent(w, v), round_percent(h, v)),
    };
    if (new_w, new_h) == (w, h) {
        return image;
    }
    image.resize_exact(new_w.max(1), new_h.max(1), FilterType::Lanczos3)
}

/// `round(side * value / other)`, at least 1.
fn round_ratio(side: u32, value: u32, other: u32) -> u32 {
    if other == 0 {
        return 1;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (f64::from(side) * f64::from(value) / f64::from(other)).round() as u32;
    scaled.max(1)
}

fn round_percent(side: u32, percent: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (f64::from(side) * f64::from(percent) / 100.0).round() as u32;
    scaled.max(1)
}
