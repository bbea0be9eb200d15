//! Error types for image composition.

use std::path::PathBuf;

use spiflash_layout::RegionKind;

/// Errors that abort image production.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// An artifact path does not exist.
    #[error("{region} file not found: {}", path.display())]
    MissingArtifact {
        /// Region the artifact was meant for.
        region: RegionKind,
        /// The path that was not found.
        path: PathBuf,
    },

    /// An artifact does not fit its region.
    #[error("{region} is {len} bytes but must be smaller than its {capacity}-byte region")]
    OversizeArtifact {
        /// Offending region.
        region: RegionKind,
        /// Artifact length in bytes.
        len: u64,
        /// Region capacity in bytes.
        capacity: u64,
    },

    /// A forced image size is smaller than the content already placed.
    #[error("forced image size {requested} is smaller than the {written} bytes of content")]
    SizeMismatch {
        /// Requested image length.
        requested: u64,
        /// Bytes occupied by gateware, BIOS and firmware.
        written: u64,
    },

    /// The image does not fit on the flash device.
    #[error("image overflows the {total}-byte flash by {overflow} bytes")]
    FlashOverflow {
        /// Bytes past the end of flash.
        overflow: u64,
        /// Flash device size.
        total: u64,
    },

    /// The platform layout cannot hold an image.
    #[error("invalid platform layout: {detail}")]
    InvalidPlatform {
        /// Description of the problem.
        detail: String,
    },

    /// A forced-size literal is neither a flag nor a byte count.
    #[error("invalid image size '{value}': expected 'true', '1', or a byte count")]
    InvalidForceSize {
        /// The rejected literal.
        value: String,
    },

    /// The image cannot be held in memory.
    #[error("image length {len} bytes cannot be allocated (check the forced image size)")]
    ImageTooLarge {
        /// Requested image length.
        len: u64,
    },

    /// I/O error reading artifacts or writing the image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The finished image could not be moved into place.
    #[error("failed to persist image: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;
