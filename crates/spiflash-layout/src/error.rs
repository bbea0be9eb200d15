//! Error types for platform layout operations.

use std::path::PathBuf;

/// Errors that can occur while loading or validating platform layouts.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading platform files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform file not found.
    #[error("platform file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Validation error in a platform definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
