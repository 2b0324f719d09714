//! Straight-alpha "over" compositing of a tile onto a base image.
//!
//! Color channels are NOT premultiplied, so the blend divides by the
//! resulting alpha explicitly. The image-watermark layer is composited
//! before the text layer (ordering enforced by the exporter) so text stays
//! legible atop an image watermark occupying the same region.

use image::RgbaImage;

/// Alpha-blend `tile` onto `base` with its top-left corner at `(x, y)`.
///
/// The tile is clipped to the base bounds; offsets may be negative or push
/// the tile past the far edge without error. Pixels with zero tile alpha
/// leave the base untouched.
pub fn composite_over(base: &mut RgbaImage, tile: &RgbaImage, x: i64, y: i64) {
    let (base_w, base_h) = base.dimensions();
    let (tile_w, tile_h) = tile.dimensions();

    // Clip the tile rectangle to the base bounds.
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(tile_w)).min(i64::from(base_w));
    let y1 = (y + i64::from(tile_h)).min(i64::from(base_h));
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for by in y0..y1 {
        for bx in x0..x1 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let tp = *tile.get_pixel((bx - x) as u32, (by - y) as u32);
            if tp[3] == 0 {
                continue;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bp = base.get_pixel_mut(bx as u32, by as u32);
            if tp[3] == 255 {
                *bp = tp;
                continue;
            }

            let ta = f32::from(tp[3]) / 255.0;
            let ba = f32::from(bp[3]) / 255.0;
            let out_a = ta + ba * (1.0 - ta);
            for ch in 0..3 {
                let tc = f32::from(tp[ch]);
                let bc = f32::from(bp[ch]);
                let blended = (tc * ta + bc * ba * (1.0 - ta)) / out_a;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    bp[ch] = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                bp[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
