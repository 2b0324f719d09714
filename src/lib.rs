//! Batch-apply positioned, scaled, rotated text and image watermarks.
//!
//! Given an immutable [`ExportSettings`] job description, the pipeline
//! resizes each base image, renders and places up to two watermark layers
//! (text and image) via a 9-point anchor grid or normalized manual
//! coordinates, rotates each layer, alpha-blends it onto the base, and
//! writes a format-correct JPEG (alpha flattened onto white) or PNG
//! (alpha preserved) into the output directory.
//!
//! # Quick Start
//!
//! ```no_run
//! use batchmark::{export_all, ExportSettings, LayoutSettings, NamingRule, OutputFormat, ResizeMode};
//!
//! let settings = ExportSettings {
//!     input_paths: vec!["photo.jpg".into()],
//!     output_dir: "out".into(),
//!     output_format: OutputFormat::Jpeg,
//!     jpeg_quality: 90,
//!     naming_rule: NamingRule::Suffix("_watermarked".into()),
//!     resize_mode: ResizeMode::Width(1920),
//!     text: None,
//!     image: None,
//!     layout: LayoutSettings::default(),
//! };
//! let summary = export_all(&settings).expect("invalid configuration");
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! ```
//!
//! # Preview consistency
//!
//! [`compute_layout`] and [`rotate_tile`] are pure and file-I/O-free so an
//! interactive preview can reuse them directly; preview placement and
//! export placement can never drift apart.
//!
//! A single failing item never aborts the batch: it is counted in
//! [`ExportSummary::failed`] and the loop continues. Job-level
//! configuration problems (missing output directory, exporting into a
//! source's parent) are rejected once, before any item is processed.

#![deny(missing_docs)]

pub mod compose;
pub mod error;
mod export;
pub mod fonts;
pub mod layout;
pub mod naming;
pub mod render;
pub mod resize;
mod settings;
pub mod writer;

pub use error::{Error, Result};
pub use export::{export_all, export_all_until, ExportSummary, ItemResult};
pub use layout::{compute_layout, Layer, Placement};
pub use render::rotate_tile;
pub use settings::{
    Anchor, ExportSettings, ImageWatermark, LayoutSettings, NamingRule, OutputFormat, ResizeMode,
    TextWatermark, WatermarkScale,
};
