//! Batch export orchestration.
//!
//! Job-level preconditions are validated once, before any item runs; every
//! per-item error is caught, logged, and tallied without aborting the
//! batch. The font and the watermark asset are resolved once per job; the
//! tiles themselves are rendered per item because percent scaling is
//! relative to each base image.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use crate::compose;
use crate::error::{Error, Result};
use crate::fonts::{self, ResolvedFont};
use crate::layout::{self, Layer};
use crate::naming;
use crate::render;
use crate::resize;
use crate::settings::ExportSettings;
use crate::writer;

/// Outcome of one item in the batch.
#[derive(Debug)]
pub struct ItemResult {
    /// Source path of the item.
    pub path: PathBuf,
    /// Destination path, present only on success.
    pub output: Option<PathBuf>,
    /// Whether the full pipeline succeeded for this item.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Tally and per-item records for a finished batch.
#[derive(Debug)]
pub struct ExportSummary {
    /// Items that produced an output file.
    pub succeeded: usize,
    /// Items that failed anywhere in their pipeline.
    pub failed: usize,
    /// One record per processed item, in input order.
    pub results: Vec<ItemResult>,
}

impl ExportSummary {
    fn from_results(results: Vec<ItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            succeeded,
            failed,
            results,
        }
    }
}

/// Per-job state resolved once and shared read-only across items.
struct Job<'a> {
    settings: &'a ExportSettings,
    font: Option<ResolvedFont>,
    asset: Option<RgbaImage>,
}

impl<'a> Job<'a> {
    fn prepare(settings: &'a ExportSettings) -> Result<Self> {
        validate(settings)?;

        let font = settings.text.as_ref().and_then(|spec| {
            let font = fonts::load_font(&spec.font_family, spec.bold, spec.italic);
            if font.is_none() {
                warn!(
                    family = %spec.font_family,
                    "no usable font found, text watermark layer disabled"
                );
            }
            font
        });

        let asset = settings.image.as_ref().and_then(|wm| {
            match image::open(&wm.path) {
                Ok(img) => Some(img.to_rgba8()),
                Err(e) => {
                    let err = Error::WatermarkAssetUnreadable {
                        path: wm.path.clone(),
                        source: e,
                    };
                    warn!(error = %err, "image watermark layer disabled");
                    None
                }
            }
        });

        Ok(Self {
            settings,
            font,
            asset,
        })
    }

    /// Run the full pipeline for one source file.
    fn process_item(&self, source: &Path) -> Result<PathBuf> {
        let settings = self.settings;
        let img = image::open(source).map_err(|e| Error::SourceUnreadable {
            path: source.to_path_buf(),
            source: e,
        })?;

        let img = resize::resize(img, settings.resize_mode);
        let base_size = (img.width(), img.height());
        let rotation = settings.layout.rotation_deg;

        // Image layer first so text stays legible on top of it.
        let mut tiles: Vec<(RgbaImage, (i64, i64))> = Vec::new();
        if let (Some(wm), Some(asset)) = (&settings.image, &self.asset) {
            if let Some(tile) = render::image_tile(wm, asset, base_size.0) {
                tiles.push(place(tile, rotation, base_size, settings, Layer::Image));
            }
        }
        if let (Some(spec), Some(font)) = (&settings.text, &self.font) {
            if let Some(tile) = render::text_tile(spec, font) {
                tiles.push(place(tile, rotation, base_size, settings, Layer::Text));
            }
        }

        let img = if tiles.is_empty() {
            img
        } else {
            let mut base = img.to_rgba8();
            for (tile, (x, y)) in &tiles {
                compose::composite_over(&mut base, tile, *x, *y);
            }
            DynamicImage::ImageRgba8(base)
        };

        let name = naming::output_file_name(source, &settings.naming_rule, settings.output_format);
        let out_path = settings.output_dir.join(name);

        // Encode fully in memory first; a failing item leaves no artifact.
        let bytes = writer::encode(&img, settings.output_format, settings.clamped_quality())?;
        std::fs::write(&out_path, bytes).map_err(|e| Error::WriteFailure {
            path: out_path.clone(),
            source: e,
        })?;
        Ok(out_path)
    }

    fn run_item(&self, source: &Path) -> ItemResult {
        match self.process_item(source) {
            Ok(out_path) => {
                debug!(source = %source.display(), output = %out_path.display(), "exported");
                ItemResult {
                    path: source.to_path_buf(),
                    output: Some(out_path),
                    success: true,
                    message: "exported".to_string(),
                }
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "item failed");
                ItemResult {
                    path: source.to_path_buf(),
                    output: None,
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Rotate a tile and resolve its placement against the base.
fn place(
    tile: RgbaImage,
    rotation: f32,
    base_size: (u32, u32),
    settings: &ExportSettings,
    layer: Layer,
) -> (RgbaImage, (i64, i64)) {
    // Rotation expands the bounding box BEFORE any position math runs.
    let tile = if rotation.rem_euclid(360.0).abs() < 1e-3 {
        tile
    } else {
        render::rotate_tile(&tile, rotation)
    };
    let placement = layout::placement_for(&settings.layout, layer);
    let pos = layout::compute_layout(base_size, tile.dimensions(), &placement);
    (tile, pos)
}

/// Resolve the output directory, rejecting anything that is not an
/// existing, resolvable directory. Every failure here is a job-level
/// configuration error, never an I/O error.
fn canonical_output_dir(out: &Path) -> Result<PathBuf> {
    if !out.is_dir() {
        return Err(Error::ConfigurationInvalid(format!(
            "output directory {} does not exist",
            out.display()
        )));
    }
    out.canonicalize().map_err(|e| {
        Error::ConfigurationInvalid(format!(
            "cannot resolve output directory {}: {e}",
            out.display()
        ))
    })
}

/// Validate job-level preconditions once, before the per-item loop.
fn validate(settings: &ExportSettings) -> Result<()> {
    let out = &settings.output_dir;
    let canonical_out = canonical_output_dir(out)?;

    for input in &settings.input_paths {
        let Some(parent) = input.parent() else {
            continue;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(canonical_parent) = parent.canonicalize() {
            if canonical_parent == canonical_out {
                return Err(Error::ConfigurationInvalid(format!(
                    "output directory {} is the parent of source {}; \
                     refusing to overwrite originals",
                    out.display(),
                    input.display()
                )));
            }
        }
    }
    Ok(())
}

/// Run the batch, polling `cancel` before each item.
///
/// Items not yet started when the flag flips are neither processed nor
/// counted. Per-item failures are tallied and never abort the batch.
///
/// # Errors
///
/// Returns [`Error::ConfigurationInvalid`] when a job-level precondition
/// fails; no item is processed in that case.
pub fn export_all_until(settings: &ExportSettings, cancel: &AtomicBool) -> Result<ExportSummary> {
    let job = Job::prepare(settings)?;

    #[cfg(feature = "cli")]
    let results: Vec<ItemResult> = {
        use rayon::prelude::*;
        settings
            .input_paths
            .par_iter()
            .filter_map(|path| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(job.run_item(path))
            })
            .collect()
    };

    #[cfg(not(feature = "cli"))]
    let results: Vec<ItemResult> = {
        let mut results = Vec::with_capacity(settings.input_paths.len());
        for path in &settings.input_paths {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            results.push(job.run_item(path));
        }
        results
    };

    Ok(ExportSummary::from_results(results))
}

/// Run the whole batch to completion.
///
/// # Errors
///
/// Returns [`Error::ConfigurationInvalid`] when a job-level precondition
/// fails; no item is processed in that case.
pub fn export_all(settings: &ExportSettings) -> Result<ExportSummary> {
    export_all_until(settings, &AtomicBool::new(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{
        LayoutSettings, NamingRule, OutputFormat, ResizeMode, WatermarkScale,
    };
    use image::{Rgba, RgbaImage};

    fn settings(inputs: Vec<PathBuf>, output_dir: PathBuf) -> ExportSettings {
        ExportSettings {
            input_paths: inputs,
            output_dir,
            output_format: OutputFormat::Png,
            jpeg_quality: 90,
            naming_rule: NamingRule::Keep,
            resize_mode: ResizeMode::None,
            text: None,
            image: None,
            layout: LayoutSettings::default(),
        }
    }

    fn write_png(path: &Path, w: u32, h: u32, color: Rgba<u8>) {
        RgbaImage::from_pixel(w, h, color).save(path).unwrap();
    }

    #[test]
    fn missing_output_dir_is_a_configuration_error() {
        let result = export_all(&settings(vec![], PathBuf::from("/no/such/dir")));
        assert!(matches!(result, Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn output_dir_resolution_never_reports_plain_io_errors() {
        // Unresolvable paths surface as the job-level taxonomy entry, not
        // as Error::Io.
        let err = canonical_output_dir(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, Error::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("/no/such/dir"));

        let dir = tempfile::tempdir().unwrap();
        let resolved = canonical_output_dir(dir.path()).unwrap();
        assert!(resolved.is_dir());
    }

    #[test]
    fn exporting_into_a_source_parent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.png");
        write_png(&src, 4, 4, Rgba([1, 2, 3, 255]));

        let result = export_all(&settings(vec![src], dir.path().to_path_buf()));
        assert!(matches!(result, Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn one_bad_item_does_not_abort_the_batch() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        let mut inputs = Vec::new();
        for i in 0..4u8 {
            let path = src_dir.path().join(format!("img{i}.png"));
            write_png(&path, 8, 8, Rgba([i * 10, 0, 0, 255]));
            inputs.push(path);
        }
        inputs.insert(2, src_dir.path().join("deleted.png"));

        let summary = export_all(&settings(inputs, out_dir.path().to_path_buf())).unwrap();
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);

        let produced = std::fs::read_dir(out_dir.path()).unwrap().count();
        assert_eq!(produced, 4);

        let failure = summary.results.iter().find(|r| !r.success).unwrap();
        assert!(failure.path.ends_with("deleted.png"));
        assert!(failure.output.is_none());
    }

    #[test]
    fn passthrough_png_is_pixel_identical() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        let mut original = RgbaImage::new(20, 10);
        for (i, px) in original.pixels_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let v = (i % 256) as u8;
            *px = Rgba([v, v.wrapping_add(80), v.wrapping_mul(2), 255]);
        }
        let src = src_dir.path().join("photo.png");
        original.save(&src).unwrap();

        let summary = export_all(&settings(vec![src], out_dir.path().to_path_buf())).unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 0));

        let out = image::open(out_dir.path().join("photo.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(out, original);
    }

    #[test]
    fn naming_rule_and_format_shape_the_output_path() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("photo.png");
        write_png(&src, 8, 8, Rgba([0, 0, 0, 255]));

        let mut s = settings(vec![src], out_dir.path().to_path_buf());
        s.output_format = OutputFormat::Jpeg;
        s.naming_rule = NamingRule::Prefix("wm_".to_string());

        let summary = export_all(&s).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(out_dir.path().join("wm_photo.jpg").is_file());
    }

    #[test]
    fn image_watermark_layer_composites_onto_the_base() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let wm_dir = tempfile::tempdir().unwrap();

        let src = src_dir.path().join("base.png");
        write_png(&src, 100, 100, Rgba([0, 0, 0, 255]));
        let wm = wm_dir.path().join("mark.png");
        write_png(&wm, 10, 10, Rgba([255, 255, 255, 255]));

        let mut s = settings(vec![src], out_dir.path().to_path_buf());
        s.image = Some(crate::settings::ImageWatermark {
            path: wm,
            scale: WatermarkScale::Absolute(10, 10),
            opacity: 100,
        });
        s.layout.image_manual = Some((0.0, 0.0));

        let summary = export_all(&s).unwrap();
        assert_eq!(summary.succeeded, 1);

        let out = image::open(out_dir.path().join("base.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(*out.get_pixel(5, 5), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(50, 50), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn unreadable_watermark_asset_skips_the_layer_not_the_item() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("base.png");
        write_png(&src, 16, 16, Rgba([9, 9, 9, 255]));

        let mut s = settings(vec![src], out_dir.path().to_path_buf());
        s.image = Some(crate::settings::ImageWatermark {
            path: PathBuf::from("/no/such/watermark.png"),
            scale: WatermarkScale::Percent(30),
            opacity: 100,
        });

        let summary = export_all(&s).unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 0));
    }

    #[test]
    fn preset_cancel_processes_nothing() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("img.png");
        write_png(&src, 8, 8, Rgba([0, 0, 0, 255]));

        let s = settings(vec![src], out_dir.path().to_path_buf());
        let cancel = AtomicBool::new(true);
        let summary = export_all_until(&s, &cancel).unwrap();
        assert!(summary.results.is_empty());
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn resize_applies_before_compositing() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("big.png");
        write_png(&src, 200, 100, Rgba([50, 60, 70, 255]));

        let mut s = settings(vec![src], out_dir.path().to_path_buf());
        s.resize_mode = ResizeMode::Percent(50);

        export_all(&s).unwrap();
        let out = image::open(out_dir.path().join("big.png")).unwrap();
        assert_eq!((out.width(), out.height()), (100, 50));
    }
}
