use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use batchmark::{
    export_all, Anchor, ExportSettings, ImageWatermark, ItemResult, LayoutSettings, NamingRule,
    OutputFormat, ResizeMode, TextWatermark, WatermarkScale,
};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Jpeg,
    Png,
}

#[derive(Parser)]
#[command(
    name = "batchmark",
    about = "Batch-apply positioned text and image watermarks to images",
    version,
    after_help = "Simple usage: batchmark photos/*.jpg -o out --text \"(c) 2026\"\n\n\
                  Watermark layers are placed on a 9-point grid (--position) or at\n\
                  normalized coordinates (--text-at/--image-at, e.g. 0.5,0.25).\n\
                  The output directory must not be a source directory."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (must exist, must not contain any input)
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "jpeg")]
    format: Format,

    /// JPEG quality (1-100, ignored for PNG)
    #[arg(long, default_value = "90")]
    quality: u8,

    /// Prepend this to every output file name
    #[arg(long, conflicts_with = "suffix")]
    prefix: Option<String>,

    /// Append this to every output file name
    #[arg(long)]
    suffix: Option<String>,

    /// Resize to this width, keeping aspect ratio
    #[arg(long, conflicts_with_all = ["resize_height", "resize_percent"])]
    resize_width: Option<u32>,

    /// Resize to this height, keeping aspect ratio
    #[arg(long, conflicts_with = "resize_percent")]
    resize_height: Option<u32>,

    /// Resize both axes by this percentage
    #[arg(long)]
    resize_percent: Option<u32>,

    /// Text watermark string
    #[arg(long)]
    text: Option<String>,

    /// Font family for the text watermark
    #[arg(long, default_value = "DejaVu Sans")]
    font_family: String,

    /// Font size in pixels
    #[arg(long, default_value = "32")]
    font_size: f32,

    /// Prefer a bold face
    #[arg(long)]
    bold: bool,

    /// Prefer an italic face
    #[arg(long)]
    italic: bool,

    /// Text fill color: #RRGGBB, #RRGGBBAA, or a basic color name
    #[arg(long, default_value = "#FFFFFF80", value_parser = parse_color)]
    color: [u8; 4],

    /// Draw a drop shadow under the text
    #[arg(long)]
    shadow: bool,

    /// Stamp a 1px outline around the text
    #[arg(long)]
    outline: bool,

    /// Image watermark file
    #[arg(long)]
    image: Option<PathBuf>,

    /// Image watermark width as a percentage of each base image's width
    #[arg(long, default_value = "30", conflicts_with_all = ["image_width", "image_height"])]
    image_scale: u32,

    /// Image watermark width in pixels (aspect not preserved)
    #[arg(long, requires = "image_height")]
    image_width: Option<u32>,

    /// Image watermark height in pixels (aspect not preserved)
    #[arg(long, requires = "image_width")]
    image_height: Option<u32>,

    /// Image watermark opacity (0-100)
    #[arg(long, default_value = "60")]
    image_opacity: u8,

    /// Preset grid position: top-left, top-center, top-right, center-left,
    /// center, center-right, bottom-left, bottom-center, bottom-right
    #[arg(long, default_value = "bottom-right")]
    position: String,

    /// Clockwise rotation in degrees, applied to both layers
    #[arg(long, default_value = "0")]
    rotate: f32,

    /// Manual text placement as normalized nx,ny in [0,1]
    #[arg(long, value_parser = parse_point)]
    text_at: Option<(f32, f32)>,

    /// Manual image placement as normalized nx,ny in [0,1]
    #[arg(long, value_parser = parse_point)]
    image_at: Option<(f32, f32)>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

/// Parse `#RRGGBB`, `#RRGGBBAA`, or a basic color name into RGBA.
fn parse_color(s: &str) -> Result<[u8; 4], String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return Err(format!("expected #RRGGBB or #RRGGBBAA, got {s}"));
        }
        let parse = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| e.to_string())
        };
        return match hex.len() {
            6 => Ok([parse(0..2)?, parse(2..4)?, parse(4..6)?, 255]),
            8 => Ok([parse(0..2)?, parse(2..4)?, parse(4..6)?, parse(6..8)?]),
            _ => Err(format!("expected #RRGGBB or #RRGGBBAA, got {s}")),
        };
    }
    match s.to_ascii_lowercase().as_str() {
        "white" => Ok([255, 255, 255, 255]),
        "black" => Ok([0, 0, 0, 255]),
        "red" => Ok([255, 0, 0, 255]),
        "green" => Ok([0, 128, 0, 255]),
        "blue" => Ok([0, 0, 255, 255]),
        "yellow" => Ok([255, 255, 0, 255]),
        other => Err(format!("unknown color: {other}")),
    }
}

/// Parse a normalized coordinate pair like `0.5,0.25`.
fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected nx,ny, got {s}"))?;
    let nx: f32 = x.trim().parse().map_err(|_| format!("bad number: {x}"))?;
    let ny: f32 = y.trim().parse().map_err(|_| format!("bad number: {y}"))?;
    Ok((nx, ny))
}

fn settings_from_cli(cli: &Cli) -> ExportSettings {
    let naming_rule = if let Some(p) = &cli.prefix {
        NamingRule::Prefix(p.clone())
    } else if let Some(s) = &cli.suffix {
        NamingRule::Suffix(s.clone())
    } else {
        NamingRule::Keep
    };

    let resize_mode = if let Some(w) = cli.resize_width {
        ResizeMode::Width(w)
    } else if let Some(h) = cli.resize_height {
        ResizeMode::Height(h)
    } else if let Some(p) = cli.resize_percent {
        ResizeMode::Percent(p)
    } else {
        ResizeMode::None
    };

    let text = cli.text.as_ref().map(|text| TextWatermark {
        text: text.clone(),
        font_family: cli.font_family.clone(),
        font_size: cli.font_size,
        bold: cli.bold,
        italic: cli.italic,
        color: cli.color,
        shadow: cli.shadow,
        outline: cli.outline,
    });

    let image = cli.image.as_ref().map(|path| ImageWatermark {
        path: path.clone(),
        scale: match (cli.image_width, cli.image_height) {
            (Some(w), Some(h)) => WatermarkScale::Absolute(w, h),
            _ => WatermarkScale::Percent(cli.image_scale),
        },
        opacity: cli.image_opacity,
    });

    ExportSettings {
        input_paths: cli.inputs.clone(),
        output_dir: cli.output_dir.clone(),
        output_format: match cli.format {
            Format::Jpeg => OutputFormat::Jpeg,
            Format::Png => OutputFormat::Png,
        },
        jpeg_quality: cli.quality,
        naming_rule,
        resize_mode,
        text,
        image,
        layout: LayoutSettings {
            rotation_deg: cli.rotate,
            anchor: Anchor::from_key(&cli.position),
            text_manual: cli.text_at,
            image_manual: cli.image_at,
            shared_manual: None,
        },
    }
}

fn print_result(result: &ItemResult, quiet: bool) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !(1..=100).contains(&cli.quality) {
        eprintln!("Error: Quality must be between 1 and 100");
        process::exit(1);
    }

    let settings = settings_from_cli(&cli);

    let summary = match export_all(&settings) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    for result in &summary.results {
        print_result(result, cli.quiet);
    }

    if !cli.quiet && summary.results.len() > 1 {
        eprintln!();
        eprintln!(
            "[Summary] Exported: {}, Failed: {} (Total: {})",
            summary.succeeded,
            summary.failed,
            summary.results.len()
        );
    }

    if summary.failed > 0 {
        process::exit(1);
    }
}
