//! Forced image length.

use std::fmt;
use std::str::FromStr;

use spiflash_layout::PlatformLayout;

use crate::error::ComposeError;

/// Pad the image with erased bytes up to a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceSize {
    /// Pad to the full size of the flash device.
    FlashSize,
    /// Pad to an explicit byte count.
    Bytes(u64),
}

impl ForceSize {
    /// Resulting image length for a platform.
    pub fn resolve(self, platform: &PlatformLayout) -> u64 {
        match self {
            ForceSize::FlashSize => platform.spiflash_total_size,
            ForceSize::Bytes(n) => n,
        }
    }
}

impl FromStr for ForceSize {
    type Err = ComposeError;

    /// `true` or `1` selects the flash size; anything else must be a byte
    /// count, decimal or `0x`-prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("true") || s == "1" {
            return Ok(ForceSize::FlashSize);
        }
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed.map(ForceSize::Bytes).map_err(|_| ComposeError::InvalidForceSize {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for ForceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceSize::FlashSize => f.write_str("true"),
            ForceSize::Bytes(n) => write!(f, "{n}"),
        }
    }
}
