//! Placement math for watermark tiles.
//!
//! Pure geometry, no file I/O: an interactive preview and the batch
//! exporter both call [`compute_layout`], so the two can never drift.
//! All formulas operate on the tile's post-rotation bounding dimensions;
//! rotate first (see [`crate::render::rotate_tile`]), then lay out.

use crate::settings::{clamp_normalized, Anchor, LayoutSettings};

/// Which watermark layer a placement is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The text watermark layer.
    Text,
    /// The image watermark layer.
    Image,
}

/// A fully-resolved placement request for one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Snap to one of the nine preset grid cells.
    Anchor(Anchor),
    /// Normalized top-left coordinates in the unit square.
    Manual {
        /// Horizontal position, 0.0 = left edge, 1.0 = right edge.
        nx: f32,
        /// Vertical position, 0.0 = top edge, 1.0 = bottom edge.
        ny: f32,
    },
}

/// Edge margin for preset anchors: 1% of the short base side, at least 8px.
#[must_use]
pub fn margin_for(base_w: u32, base_h: u32) -> u32 {
    (base_w.min(base_h) / 100).max(8)
}

/// Resolve the placement for one layer from the shared layout settings.
///
/// Resolution order: the legacy shared manual point overrides everything,
/// then the layer's own manual point, then the shared preset anchor.
#[must_use]
pub fn placement_for(layout: &LayoutSettings, layer: Layer) -> Placement {
    let manual = layout.shared_manual.or(match layer {
        Layer::Text => layout.text_manual,
        Layer::Image => layout.image_manual,
    });
    match manual {
        Some((nx, ny)) => Placement::Manual { nx, ny },
        None => Placement::Anchor(layout.anchor),
    }
}

/// Top-left offset for a tile snapped to a preset anchor.
///
/// Center axes use the integer-floor midpoint. A tile larger than the base
/// pins to offset 0 on that axis instead of going negative.
#[must_use]
pub fn anchor_offset(
    base_w: u32,
    base_h: u32,
    tile_w: u32,
    tile_h: u32,
    anchor: Anchor,
    margin: u32,
) -> (i64, i64) {
    let left = i64::from(margin);
    let top = i64::from(margin);
    let right = (i64::from(base_w) - i64::from(tile_w) - i64::from(margin)).max(0);
    let bottom = (i64::from(base_h) - i64::from(tile_h) - i64::from(margin)).max(0);
    let mid_x = ((i64::from(base_w) - i64::from(tile_w)) / 2).max(0);
    let mid_y = ((i64::from(base_h) - i64::from(tile_h)) / 2).max(0);

    match anchor {
        Anchor::TopLeft => (left, top),
        Anchor::TopCenter => (mid_x, top),
        Anchor::TopRight => (right, top),
        Anchor::CenterLeft => (left, mid_y),
        Anchor::Center => (mid_x, mid_y),
        Anchor::CenterRight => (right, mid_y),
        Anchor::BottomLeft => (left, bottom),
        Anchor::BottomCenter => (mid_x, bottom),
        Anchor::BottomRight => (right, bottom),
    }
}

/// Top-left offset for a manually placed tile.
///
/// Normalized inputs clamp to [0,1] before scaling; the resulting pixel
/// offset clamps to `[0, base - tile]` per axis. When the tile exceeds the
/// base on an axis the offset is 0 and the tile clips at composite time.
#[must_use]
pub fn manual_offset(
    base_w: u32,
    base_h: u32,
    tile_w: u32,
    tile_h: u32,
    nx: f32,
    ny: f32,
) -> (i64, i64) {
    let (nx, ny) = clamp_normalized(nx, ny);
    #[allow(clippy::cast_possible_truncation)]
    let x = (nx * base_w as f32).floor() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let y = (ny * base_h as f32).floor() as i64;
    let max_x = (i64::from(base_w) - i64::from(tile_w)).max(0);
    let max_y = (i64::from(base_h) - i64::from(tile_h)).max(0);
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

/// Compute the placement offset for a tile of `tile_size` against a base of
/// `base_size`.
///
/// The tile dimensions must already include any rotation expansion.
#[must_use]
pub fn compute_layout(
    base_size: (u32, u32),
    tile_size: (u32, u32),
    placement: &Placement,
) -> (i64, i64) {
    let (base_w, base_h) = base_size;
    let (tile_w, tile_h) = tile_size;
    match *placement {
        Placement::Anchor(anchor) => {
            let margin = margin_for(base_w, base_h);
            anchor_offset(base_w, base_h, tile_w, tile_h, anchor, margin)
        }
        Placement::Manual { nx, ny } => manual_offset(base_w, base_h, tile_w, tile_h, nx, ny),
    }
}
