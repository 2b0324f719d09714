//! Destination file naming.

use std::path::Path;

use crate::settings::{NamingRule, OutputFormat};

/// Derive the destination file name for a source path.
///
/// The source extension is stripped and replaced by the output format's
/// extension regardless of what it was; the naming rule rewrites only the
/// stem.
#[must_use]
pub fn output_file_name(source: &Path, rule: &NamingRule, format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let renamed = match rule {
        NamingRule::Keep => stem,
        NamingRule::Prefix(value) => format!("{value}{stem}"),
        NamingRule::Suffix(value) => format!("{stem}{value}"),
    };
    format!("{renamed}.{}", format.extension())
}
