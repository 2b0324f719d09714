//! Error types for the batchmark crate.

use std::path::PathBuf;

/// Errors that can occur while validating a job or processing an item.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A job-level precondition was violated; the batch never starts.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// A source image could not be opened or decoded.
    #[error("failed to read source image {path}: {source}")]
    SourceUnreadable {
        /// Path of the source image.
        path: PathBuf,
        /// Underlying decode error.
        source: image::ImageError,
    },

    /// The image-watermark asset could not be opened or decoded.
    /// The layer is skipped for the run; this never fails an item.
    #[error("failed to read watermark asset {path}: {source}")]
    WatermarkAssetUnreadable {
        /// Path of the watermark asset.
        path: PathBuf,
        /// Underlying decode error.
        source: image::ImageError,
    },

    /// The destination file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image processing (decode, encode, resample).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
