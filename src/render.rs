//! Watermark tile rendering: text rasterization, asset scaling, opacity,
//! and rotation.
//!
//! A tile is an ephemeral straight-alpha RGBA raster holding one rendered
//! layer. Tiles are built fresh per item (percent scaling is relative to
//! the base image being processed) and discarded after compositing.

use ab_glyph::PxScale;
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::fonts::ResolvedFont;
use crate::settings::{clamp_percent, ImageWatermark, TextWatermark, WatermarkScale};

/// Padding around the glyph bounding box in a plain text tile.
///
/// Canonical constant: 4px plain, 6px when a shadow or outline is drawn
/// (covers the +2,+2 shadow offset and the 1px outline stamps).
const TEXT_PADDING: u32 = 4;
const DECORATED_PADDING: u32 = 6;

/// Shadow offset from the glyph origin, both axes.
const SHADOW_OFFSET: i32 = 2;

/// Canonical shadow alpha: 0.6x the fill alpha.
const SHADOW_ALPHA_FACTOR: f32 = 0.6;

/// Rasterize a text watermark into a tile.
///
/// Returns `None` for empty/whitespace text or a degenerate glyph box.
/// Draw order, bottom to top: shadow, outline, fill. Bold is synthesized
/// with a second fill stamp at +1px only when the resolved font file is
/// not itself a bold face.
#[must_use]
pub fn text_tile(spec: &TextWatermark, font: &ResolvedFont) -> Option<RgbaImage> {
    if spec.text.trim().is_empty() {
        return None;
    }

    let synthesize_bold = spec.bold && !font.bold_face;
    let font = &font.font;
    let scale = PxScale::from(spec.font_size.max(1.0));
    let (text_w, text_h) = text_size(scale, font, &spec.text);
    if text_w == 0 || text_h == 0 {
        return None;
    }

    let decorated = spec.shadow || spec.outline;
    let pad = if decorated {
        DECORATED_PADDING
    } else {
        TEXT_PADDING
    };
    let mut tile = RgbaImage::new(text_w + 2 * pad, text_h + 2 * pad);

    #[allow(clippy::cast_possible_wrap)]
    let origin = pad as i32;
    let [r, g, b, a] = spec.color;

    if spec.shadow {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shadow_alpha = (f32::from(a) * SHADOW_ALPHA_FACTOR).round() as u8;
        draw_text_mut(
            &mut tile,
            Rgba([0, 0, 0, shadow_alpha]),
            origin + SHADOW_OFFSET,
            origin + SHADOW_OFFSET,
            scale,
            font,
            &spec.text,
        );
    }

    if spec.outline {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                draw_text_mut(
                    &mut tile,
                    Rgba([0, 0, 0, a]),
                    origin + dx,
                    origin + dy,
                    scale,
                    font,
                    &spec.text,
                );
            }
        }
    }

    draw_text_mut(&mut tile, Rgba([r, g, b, a]), origin, origin, scale, font, &spec.text);
    if synthesize_bold {
        draw_text_mut(
            &mut tile,
            Rgba([r, g, b, a]),
            origin + 1,
            origin,
            scale,
            font,
            &spec.text,
        );
    }

    Some(tile)
}

/// Scale and opacity-adjust a preloaded watermark asset into a tile.
///
/// Percent scaling targets a fraction of the CURRENT base width and keeps
/// the asset's aspect ratio; absolute scaling uses exact dimensions.
/// Returns `None` when the target collapses to zero on either axis.
#[must_use]
pub fn image_tile(spec: &ImageWatermark, asset: &RgbaImage, base_w: u32) -> Option<RgbaImage> {
    let (src_w, src_h) = asset.dimensions();
    if src_w == 0 || src_h == 0 {
        return None;
    }

    let (target_w, target_h) = match spec.scale {
        WatermarkScale::Percent(p) => {
            #[allow(clippy::cast_possible_truncation)]
            let target_w = (u64::from(base_w) * u64::from(p) / 100) as u32;
            if target_w == 0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let target_h =
                ((f64::from(src_h) * f64::from(target_w) / f64::from(src_w)).round() as u32).max(1);
            (target_w, target_h)
        }
        WatermarkScale::Absolute(w, h) => (w, h),
    };
    if target_w == 0 || target_h == 0 {
        return None;
    }

    let mut tile = if (target_w, target_h) == (src_w, src_h) {
        asset.clone()
    } else {
        imageops::resize(asset, target_w, target_h, imageops::FilterType::Lanczos3)
    };
    scale_alpha(&mut tile, spec.opacity);
    Some(tile)
}

/// Multiply every pixel's alpha by `opacity / 100`.
///
/// Monotonically non-increasing; opacity 100 leaves the tile untouched.
pub fn scale_alpha(tile: &mut RgbaImage, opacity: u8) {
    let opacity = clamp_percent(opacity);
    if opacity == 100 {
        return;
    }
    for pixel in tile.pixels_mut() {
        #[allow(clippy::cast_possible_truncation)]
        let scaled = (u16::from(pixel[3]) * u16::from(opacity) / 100) as u8;
        pixel[3] = scaled;
    }
}

/// Rotate a tile clockwise with bounding-box expansion.
///
/// Exposed pure so a preview surface and the exporter share the exact same
/// geometry. Uncovered regions are fully transparent; sampling is bilinear
/// with alpha-weighted color to avoid dark fringes at the edges.
#[must_use]
pub fn rotate_tile(tile: &RgbaImage, degrees: f32) -> RgbaImage {
    let deg = degrees.rem_euclid(360.0);
    if deg.abs() < 1e-3 || (deg - 360.0).abs() < 1e-3 {
        return tile.clone();
    }
    if (deg - 90.0).abs() < 1e-3 {
        return imageops::rotate90(tile);
    }
    if (deg - 180.0).abs() < 1e-3 {
        return imageops::rotate180(tile);
    }
    if (deg - 270.0).abs() < 1e-3 {
        return imageops::rotate270(tile);
    }

    let (w, h) = tile.dimensions();
    let theta = f64::from(deg).to_radians();
    let (sin, cos) = theta.sin_cos();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out_w = (f64::from(w) * cos.abs() + f64::from(h) * sin.abs()).ceil() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out_h = (f64::from(w) * sin.abs() + f64::from(h) * cos.abs()).ceil() as u32;

    let cx_src = f64::from(w) / 2.0;
    let cy_src = f64::from(h) / 2.0;
    let cx_dst = f64::from(out_w) / 2.0;
    let cy_dst = f64::from(out_h) / 2.0;

    let mut out = RgbaImage::new(out_w, out_h);
    for dy in 0..out_h {
        for dx in 0..out_w {
            let u = f64::from(dx) + 0.5 - cx_dst;
            let v = f64::from(dy) + 0.5 - cy_dst;
            // Inverse of the clockwise rotation (y axis points down).
            let sx = cos * u + sin * v + cx_src;
            let sy = -sin * u + cos * v + cy_src;
            out.put_pixel(dx, dy, sample_bilinear(tile, sx, sy));
        }
    }
    out
}

/// Bilinear sample at a continuous source position (pixel-center space).
/// Out-of-bounds neighbors contribute full transparency; colors are
/// alpha-weighted so transparent neighbors never darken the result.
fn sample_bilinear(img: &RgbaImage, sx: f64, sy: f64) -> Rgba<u8> {
    let gx = sx - 0.5;
    let gy = sy - 0.5;
    #[allow(clippy::cast_possible_truncation)]
    let x0 = gx.floor() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let y0 = gy.floor() as i64;
    #[allow(clippy::cast_precision_loss)]
    let fx = gx - x0 as f64;
    #[allow(clippy::cast_precision_loss)]
    let fy = gy - y0 as f64;

    let weights = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let (iw, ih) = img.dimensions();
    let mut acc_a = 0.0f64;
    let mut acc_r = 0.0f64;
    let mut acc_g = 0.0f64;
    let mut acc_b = 0.0f64;
    for (x, y, weight) in weights {
        if x < 0 || y < 0 || x >= i64::from(iw) || y >= i64::from(ih) {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let px = img.get_pixel(x as u32, y as u32);
        let a = f64::from(px[3]);
        let wa = weight * a;
        acc_a += wa;
        acc_r += wa * f64::from(px[0]);
        acc_g += wa * f64::from(px[1]);
        acc_b += wa * f64::from(px[2]);
    }

    if acc_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_u8 = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Rgba([
        to_u8(acc_r / acc_a),
        to_u8(acc_g / acc_a),
        to_u8(acc_b / acc_a),
        to_u8(acc_a),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;

    fn spec(text: &str) -> TextWatermark {
        TextWatermark {
            text: text.to_string(),
            font_family: "DejaVu Sans".to_string(),
            font_size: 32.0,
            bold: false,
            italic: false,
            color: [255, 255, 255, 128],
            shadow: false,
            outline: false,
        }
    }

    #[test]
    fn empty_text_yields_no_tile() {
        // Skip when the test environment has no fonts at all.
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        assert!(text_tile(&spec(""), &font).is_none());
        assert!(text_tile(&spec("   "), &font).is_none());
    }

    #[test]
    fn text_tile_has_padding_around_glyph_box() {
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        let plain = text_tile(&spec("Watermark"), &font).unwrap();
        let mut decorated_spec = spec("Watermark");
        decorated_spec.shadow = true;
        let decorated = text_tile(&decorated_spec, &font).unwrap();

        // Decorated padding is 2px wider on each side.
        assert_eq!(decorated.width(), plain.width() + 4);
        assert_eq!(decorated.height(), plain.height() + 4);
        assert!(plain.width() > 8);
    }

    #[test]
    fn text_tile_carries_fill_alpha() {
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        let tile = text_tile(&spec("W"), &font).unwrap();
        let max_alpha = tile.pixels().map(|p| p[3]).max().unwrap();
        // Glyph interior should reach (close to) the requested fill alpha
        // and never exceed it.
        assert!(max_alpha > 100);
        assert!(max_alpha <= 128);
    }

    #[test]
    fn shadow_pixels_are_black_at_reduced_alpha() {
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        let mut shadowed = spec("W");
        shadowed.color = [255, 255, 255, 250];
        shadowed.shadow = true;
        let tile = text_tile(&shadowed, &font).unwrap();

        // Shadow alpha is 0.6 x fill: 250 -> 150. Where the +2,+2 shadow
        // trails out from under the fill, the pixel is pure shadow: black
        // at no more than that alpha.
        let found = tile.pixels().any(|p| {
            p[0] < 30 && p[1] < 30 && p[2] < 30 && (90..=165).contains(&p[3])
        });
        assert!(found, "expected uncovered shadow pixels at 0.6x fill alpha");

        // And nothing exceeds the fill alpha itself.
        assert!(tile.pixels().all(|p| p[3] <= 250));
    }

    #[test]
    fn outline_stamps_dark_ring_around_glyphs() {
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        let mut outlined = spec("W");
        outlined.color = [255, 255, 255, 255];
        outlined.outline = true;
        let outlined_tile = text_tile(&outlined, &font).unwrap();

        let mut plain = spec("W");
        plain.color = [255, 255, 255, 255];
        let plain_tile = text_tile(&plain, &font).unwrap();

        // A white fill alone produces no dark opaque pixels; the 8-neighbor
        // outline ring does.
        let dark = |t: &RgbaImage| {
            t.pixels()
                .filter(|p| p[0] < 60 && p[1] < 60 && p[2] < 60 && p[3] > 150)
                .count()
        };
        assert_eq!(dark(&plain_tile), 0);
        assert!(dark(&outlined_tile) > 0);
    }

    #[test]
    fn real_bold_face_is_not_double_stamped() {
        let Some(font) = fonts::load_font("DejaVu Sans", true, false) else {
            return;
        };
        if !font.bold_face {
            return;
        }
        let mut bold = spec("Watermark");
        bold.bold = true;
        let mut plain = bold.clone();
        plain.bold = false;

        // With a genuine bold file resolved, the bold flag must not widen
        // strokes further: both tiles come from a single stamp.
        assert_eq!(text_tile(&bold, &font), text_tile(&plain, &font));
    }

    #[test]
    fn synthetic_bold_widens_strokes_on_a_regular_face() {
        let Some(font) = fonts::load_font("DejaVu Sans", false, false) else {
            return;
        };
        if font.bold_face {
            return;
        }
        let mut bold = spec("Watermark");
        bold.color = [255, 255, 255, 255];
        bold.bold = true;
        let mut plain = bold.clone();
        plain.bold = false;

        let coverage = |t: &RgbaImage| t.pixels().filter(|p| p[3] > 200).count();
        let bold_tile = text_tile(&bold, &font).unwrap();
        let plain_tile = text_tile(&plain, &font).unwrap();
        assert!(coverage(&bold_tile) > coverage(&plain_tile));
    }

    #[test]
    fn percent_scale_tracks_base_width() {
        let asset = RgbaImage::from_pixel(100, 50, Rgba([10, 20, 30, 255]));
        let wm = ImageWatermark {
            path: "wm.png".into(),
            scale: WatermarkScale::Percent(25),
            opacity: 100,
        };
        let tile = image_tile(&wm, &asset, 400).unwrap();
        assert_eq!(tile.dimensions(), (100, 50));

        let tile = image_tile(&wm, &asset, 800).unwrap();
        assert_eq!(tile.dimensions(), (200, 100));
    }

    #[test]
    fn absolute_scale_ignores_aspect() {
        let asset = RgbaImage::from_pixel(100, 50, Rgba([10, 20, 30, 255]));
        let wm = ImageWatermark {
            path: "wm.png".into(),
            scale: WatermarkScale::Absolute(64, 64),
            opacity: 100,
        };
        let tile = image_tile(&wm, &asset, 4000).unwrap();
        assert_eq!(tile.dimensions(), (64, 64));
    }

    #[test]
    fn opacity_halves_existing_alpha() {
        let mut tile = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 200]));
        scale_alpha(&mut tile, 50);
        assert_eq!(tile.get_pixel(0, 0)[3], 100);

        let mut opaque = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        scale_alpha(&mut opaque, 0);
        assert_eq!(opaque.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn rotate_zero_is_identity() {
        let tile = RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 4]));
        let rotated = rotate_tile(&tile, 0.0);
        assert_eq!(rotated, tile);
        let rotated = rotate_tile(&tile, 360.0);
        assert_eq!(rotated, tile);
    }

    #[test]
    fn rotate_quarter_turns_swap_dimensions() {
        let tile = RgbaImage::new(7, 3);
        assert_eq!(rotate_tile(&tile, 90.0).dimensions(), (3, 7));
        assert_eq!(rotate_tile(&tile, 180.0).dimensions(), (7, 3));
        assert_eq!(rotate_tile(&tile, 270.0).dimensions(), (3, 7));
        // Negative angles normalize into [0, 360).
        assert_eq!(rotate_tile(&tile, -90.0).dimensions(), (3, 7));
    }

    #[test]
    fn rotate_45_expands_bounding_box() {
        let tile = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let rotated = rotate_tile(&tile, 45.0);
        let (w, h) = rotated.dimensions();
        // 100 * sqrt(2) = 141.4
        assert!((141..=143).contains(&w));
        assert!((141..=143).contains(&h));
        // Corners of the expanded box are uncovered, so transparent.
        assert_eq!(rotated.get_pixel(0, 0)[3], 0);
        // Center stays opaque.
        assert_eq!(rotated.get_pixel(w / 2, h / 2)[3], 255);
    }
}
