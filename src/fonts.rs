//! System font discovery for the text watermark layer.
//!
//! Families are matched against font file names after normalization
//! (case and separators stripped), with a preference for files whose name
//! carries the requested bold/italic markers. A family that cannot be
//! found substitutes the first resolvable default family; only when no
//! font exists at all does the caller skip the text layer.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use tracing::debug;
use walkdir::WalkDir;

/// Families tried, in order, when the requested one cannot be found.
const FALLBACK_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
    "FreeSans",
];

/// Platform directories scanned for font files.
fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
    }
    dirs
}

/// Lowercase and strip separators so "DejaVu Sans" matches "DejaVuSans.ttf".
fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf")
    )
}

/// Whether a normalized file name names a genuine bold face.
fn has_bold_marker(normalized_name: &str) -> bool {
    normalized_name.contains("bold")
}

/// Score a candidate file name against the requested style. Higher wins.
fn style_score(normalized_name: &str, bold: bool, italic: bool) -> i32 {
    let has_bold = has_bold_marker(normalized_name);
    let has_italic =
        normalized_name.contains("italic") || normalized_name.contains("oblique");
    let mut score = 0;
    if has_bold == bold {
        score += 2;
    }
    if has_italic == italic {
        score += 2;
    }
    if !bold && !italic && normalized_name.contains("regular") {
        score += 1;
    }
    score
}

/// Pick the best-scoring font file for a family, if any exists. The flag
/// reports whether the chosen file name carries a bold marker.
fn find_family_file(family: &str, bold: bool, italic: bool) -> Option<(PathBuf, bool)> {
    let wanted = normalize(family);
    if wanted.is_empty() {
        return None;
    }

    let mut best: Option<(i32, usize, PathBuf, bool)> = None;
    for dir in font_dirs() {
        for entry in WalkDir::new(&dir)
            .follow_links(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_font_file(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = normalize(stem);
            if !name.contains(&wanted) {
                continue;
            }
            let score = style_score(&name, bold, italic);
            // Shorter names break ties: "DejaVuSans" beats "DejaVuSansMono".
            let better = match &best {
                Some((s, len, _, _)) => score > *s || (score == *s && name.len() < *len),
                None => true,
            };
            if better {
                best = Some((score, name.len(), path.to_path_buf(), has_bold_marker(&name)));
            }
        }
    }
    best.map(|(_, _, path, bold_face)| (path, bold_face))
}

/// A loaded font plus what the resolver learned about the file behind it.
pub struct ResolvedFont {
    /// Parsed font data.
    pub font: FontVec,
    /// Whether the file itself is a bold face. When a bold face was
    /// requested but this is false, the renderer synthesizes bold instead.
    pub bold_face: bool,
}

/// Load the closest match for a font family, falling back through default
/// system families. Returns `None` only when no usable font exists.
#[must_use]
pub fn load_font(family: &str, bold: bool, italic: bool) -> Option<ResolvedFont> {
    let mut candidates = vec![family];
    candidates.extend(FALLBACK_FAMILIES);

    for candidate in candidates {
        let Some((path, bold_face)) = find_family_file(candidate, bold, italic) else {
            continue;
        };
        match std::fs::read(&path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!(family = candidate, path = %path.display(), "resolved font");
                    return Some(ResolvedFont { font, bold_face });
                }
                Err(e) => debug!(path = %path.display(), error = %e, "unparseable font"),
            },
            Err(e) => debug!(path = %path.display(), error = %e, "unreadable font"),
        }
    }
    None
}
