//! TOML parsing, serialization, validation, and discovery for platform layouts.
//!
//! Custom boards are described by `.platform.toml` files in the `platforms/`
//! directory of a project. This module provides functions to load, validate,
//! serialize, and discover these files.

use std::path::{Path, PathBuf};

use crate::error::{LayoutError, Result};
use crate::platform::{PlatformLayout, BIOS_SIZE};

/// Flash erase sector size; region boundaries should line up with it.
pub const ERASE_SECTOR_SIZE: u64 = 0x10000;

/// Suffix identifying platform definition files.
pub const PLATFORM_FILE_SUFFIX: &str = ".platform.toml";

/// A validation issue found in a platform definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: String) -> Self {
        Self {
            severity: "error",
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: "warning",
            message,
        }
    }

    /// Whether this issue makes the layout unusable.
    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }
}

/// Load a platform from a `.platform.toml` file.
pub fn load_platform_toml(path: &Path) -> Result<PlatformLayout> {
    if !path.exists() {
        return Err(LayoutError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_platform_toml(&content)
}

/// Parse a platform from a TOML string.
pub fn parse_platform_toml(toml_str: &str) -> Result<PlatformLayout> {
    let platform: PlatformLayout = toml::from_str(toml_str)?;
    Ok(platform)
}

/// Serialize a platform to pretty TOML.
pub fn platform_to_toml(platform: &PlatformLayout) -> Result<String> {
    let toml_str = toml::to_string_pretty(platform)?;
    Ok(toml_str)
}

/// Validate a platform layout.
///
/// Returns `Ok(())` if there are no issues, or `Err(issues)` otherwise.
/// Warnings alone do not make a layout unusable; check
/// [`ValidationIssue::is_error`].
pub fn validate_platform(platform: &PlatformLayout) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if platform.gateware_size == 0 {
        issues.push(ValidationIssue::error("gateware-size must be non-zero".into()));
    }

    if platform.spiflash_total_size == 0 {
        issues.push(ValidationIssue::error(
            "spiflash-total-size must be non-zero".into(),
        ));
    }

    // Gateware and BIOS should both fit on the chip
    match platform.gateware_size.checked_add(BIOS_SIZE) {
        None => issues.push(ValidationIssue::error(format!(
            "gateware-size 0x{:X} leaves no room for the BIOS region",
            platform.gateware_size
        ))),
        // Builds still succeed; the image just reports negative remaining space.
        Some(firmware_offset) if firmware_offset > platform.spiflash_total_size => {
            issues.push(ValidationIssue::warning(format!(
                "firmware offset 0x{:X} exceeds spiflash-total-size 0x{:X}",
                firmware_offset, platform.spiflash_total_size
            )))
        }
        Some(_) => {}
    }

    if platform.gateware_size % ERASE_SECTOR_SIZE != 0 {
        issues.push(ValidationIssue::warning(format!(
            "gateware-size 0x{:X} is not a multiple of the 0x{:X} erase sector",
            platform.gateware_size, ERASE_SECTOR_SIZE
        )));
    }

    if platform.spiflash_total_size != 0 && !platform.spiflash_total_size.is_power_of_two() {
        issues.push(ValidationIssue::warning(format!(
            "spiflash-total-size {} is not a power of two",
            platform.spiflash_total_size
        )));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Check a layout and turn any error-severity issue into a [`LayoutError`].
pub fn ensure_valid(platform: &PlatformLayout) -> Result<()> {
    if let Err(issues) = validate_platform(platform) {
        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.message.as_str())
            .collect();
        if !errors.is_empty() {
            return Err(LayoutError::Validation {
                detail: format!("platform '{}': {}", platform.name, errors.join("; ")),
            });
        }
    }
    Ok(())
}

/// Generate a template `.platform.toml` for a new board.
///
/// Seeds from opsis with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut platform = PlatformLayout::opsis();
    platform.name = name.into();
    platform.description = None;
    platform_to_toml(&platform)
}

/// Discover all `.platform.toml` files in a project's `platforms/` directory.
///
/// Returns a list of (platform_name, file_path) pairs.
pub fn discover_platforms(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let platforms_dir = project_dir.join("platforms");
    if !platforms_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut platforms = Vec::new();
    for entry in std::fs::read_dir(&platforms_dir)? {
        let path = entry?.path();
        if let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(PLATFORM_FILE_SUFFIX))
        {
            platforms.push((name.to_string(), path));
        }
    }
    platforms.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(platforms)
}
