//! Immutable job description consumed by the export pipeline.
//!
//! One [`ExportSettings`] value is constructed per export (or preview)
//! request and passed explicitly into every core call; the pipeline never
//! reads implicit or global state and never mutates the settings.

use std::path::PathBuf;

/// Output encoding for every item in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossy JPEG; alpha is flattened onto white before encoding.
    Jpeg,
    /// Lossless PNG; alpha is preserved exactly.
    Png,
}

impl OutputFormat {
    /// File extension forced onto every output name.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Policy mapping a source base name to a destination base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingRule {
    /// Keep the source stem unchanged.
    Keep,
    /// Prepend the value to the source stem.
    Prefix(String),
    /// Append the value to the source stem.
    Suffix(String),
}

/// Base-image scaling policy. The value travels inside the variant, so a
/// mode can never be selected without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Pass the base image through untouched.
    None,
    /// Scale to an exact width, height follows the aspect ratio.
    Width(u32),
    /// Scale to an exact height, width follows the aspect ratio.
    Height(u32),
    /// Scale both axes by a percentage (100 = unchanged).
    Percent(u32),
}

/// How an image watermark is sized against the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkScale {
    /// Target width is this percentage of the base width; height follows
    /// the watermark's own aspect ratio. Tile size varies per item.
    Percent(u32),
    /// Exact pixel dimensions; aspect ratio is not preserved.
    Absolute(u32, u32),
}

/// Text watermark layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermark {
    /// The string to rasterize. Empty or whitespace-only yields no tile.
    pub text: String,
    /// Requested font family; an unavailable family substitutes a default
    /// system font rather than failing the export.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Prefer a bold face; synthesized when no bold file is found.
    pub bold: bool,
    /// Prefer an italic face.
    pub italic: bool,
    /// Fill color, straight RGBA.
    pub color: [u8; 4],
    /// Draw a drop shadow under the text.
    pub shadow: bool,
    /// Stamp a 1px outline around the text.
    pub outline: bool,
}

/// Image watermark layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWatermark {
    /// Path to the watermark asset. Unreadable assets skip the layer.
    pub path: PathBuf,
    /// Sizing policy.
    pub scale: WatermarkScale,
    /// Opacity 0-100; values below 100 scale every pixel's alpha down.
    pub opacity: u8,
}

/// One of the nine preset grid placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Top-left corner.
    TopLeft,
    /// Top edge midpoint.
    TopCenter,
    /// Top-right corner.
    TopRight,
    /// Left edge midpoint.
    CenterLeft,
    /// Dead center.
    Center,
    /// Right edge midpoint.
    CenterRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom edge midpoint.
    BottomCenter,
    /// Bottom-right corner.
    BottomRight,
}

impl Anchor {
    /// Parse a grid key like `"top-left"` or `"center"`.
    ///
    /// Unknown keys fall back to [`Anchor::BottomRight`].
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key.to_ascii_lowercase().as_str() {
            "top-left" => Anchor::TopLeft,
            "top-center" => Anchor::TopCenter,
            "top-right" => Anchor::TopRight,
            "center-left" => Anchor::CenterLeft,
            "center" => Anchor::Center,
            "center-right" => Anchor::CenterRight,
            "bottom-left" => Anchor::BottomLeft,
            "bottom-center" => Anchor::BottomCenter,
            _ => Anchor::BottomRight,
        }
    }
}

/// Shared layout state for both watermark layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSettings {
    /// Clockwise rotation in degrees, applied to both layers' tiles before
    /// any position math runs.
    pub rotation_deg: f32,
    /// Preset anchor used by any layer not in manual mode.
    pub anchor: Anchor,
    /// Normalized top-left for the text layer; `None` uses the anchor.
    pub text_manual: Option<(f32, f32)>,
    /// Normalized top-left for the image layer; `None` uses the anchor.
    pub image_manual: Option<(f32, f32)>,
    /// Legacy shared manual point; when set it overrides both layers.
    pub shared_manual: Option<(f32, f32)>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            rotation_deg: 0.0,
            anchor: Anchor::BottomRight,
            text_manual: None,
            image_manual: None,
            shared_manual: None,
        }
    }
}

/// Immutable description of one batch export job.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Ordered source files; uniqueness is not required, each path is
    /// processed independently.
    pub input_paths: Vec<PathBuf>,
    /// Destination directory. Must exist and must not be any source's
    /// parent directory (validated once, before the batch starts).
    pub output_dir: PathBuf,
    /// Output encoding for every item.
    pub output_format: OutputFormat,
    /// JPEG quality 1-100; ignored for PNG output.
    pub jpeg_quality: u8,
    /// Destination base-name policy.
    pub naming_rule: NamingRule,
    /// Base-image scaling policy.
    pub resize_mode: ResizeMode,
    /// Text watermark layer, if enabled.
    pub text: Option<TextWatermark>,
    /// Image watermark layer, if enabled.
    pub image: Option<ImageWatermark>,
    /// Shared layout state for both layers.
    pub layout: LayoutSettings,
}

impl ExportSettings {
    /// JPEG quality clamped to the encoder's valid 1-100 range.
    #[must_use]
    pub fn clamped_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Clamp a 0-100 percentage.
#[must_use]
pub fn clamp_percent(value: u8) -> u8 {
    value.min(100)
}

/// Clamp a normalized coordinate pair into the unit square.
#[must_use]
pub fn clamp_normalized(nx: f32, ny: f32) -> (f32, f32) {
    (nx.clamp(0.0, 1.0), ny.clamp(0.0, 1.0))
}
