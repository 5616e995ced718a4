//! Error taxonomy for the icon pipeline.
//!
//! Per-unit errors ([`Error::Decode`], [`Error::InvalidDimensions`],
//! [`Error::MissingAlphaChannel`], [`Error::Encode`]) are logged and the
//! offending icon or artifact is skipped. Everything else aborts the
//! owning job directory: no later stage can produce meaningful output
//! without its predecessor or without the static assets.

use std::path::PathBuf;

use thiserror::Error;

use crate::mask::Direction;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures the pipeline can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A file exists but could not be decoded into a pixel buffer.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A source icon is not exactly 32x32 with 4 channels.
    #[error("{name} is ({width}, {height}, {channels}), not (32, 32, 4)")]
    InvalidDimensions {
        name: String,
        width: u32,
        height: u32,
        channels: u8,
    },

    /// An icon lacks an alpha channel and cannot be masked.
    #[error("{name} does not have an alpha channel")]
    MissingAlphaChannel { name: String },

    /// A composed buffer could not be serialized to the target format.
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    /// A stage ran without its predecessor's output present.
    #[error("stage `{stage}` has no output yet; pipeline stages must run in order")]
    StageOrdering { stage: &'static str },

    /// Two direction templates claim the same visible pixels, which would
    /// break the additive composition in the combine stage.
    #[error("visible regions of the {a} and {b} mask templates overlap on {pixels} pixel(s)")]
    MaskOverlap {
        a: Direction,
        b: Direction,
        pixels: usize,
    },

    /// Filesystem failure on the scratch store or a source directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error only affects a single icon or artifact
    /// and the rest of the batch should continue.
    pub fn is_per_unit(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. }
                | Error::InvalidDimensions { .. }
                | Error::MissingAlphaChannel { .. }
                | Error::Encode { .. }
        )
    }
}
