//! Flash regions and their offsets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three artifact slots of a flash image, in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    /// FPGA configuration bitstream.
    Gateware,
    /// Second-stage bootloader.
    Bios,
    /// Application payload loaded by the BIOS.
    Firmware,
}

impl RegionKind {
    /// All regions in the order they appear in flash.
    pub const ALL: [RegionKind; 3] = [RegionKind::Gateware, RegionKind::Bios, RegionKind::Firmware];

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            RegionKind::Gateware => "Gateware",
            RegionKind::Bios => "BIOS",
            RegionKind::Firmware => "Firmware",
        }
    }

    /// What kind of artifact lives in this region.
    pub fn description(self) -> &'static str {
        match self {
            RegionKind::Gateware => "Xilinx FPGA Bitstream",
            RegionKind::Bios => "LiteX BIOS with CRC",
            RegionKind::Firmware => "HDMI2USB Firmware in FBI format (loaded into DRAM)",
        }
    }

    /// Conventional location of the artifact relative to a build directory.
    pub fn default_path(self) -> &'static str {
        match self {
            RegionKind::Gateware => "gateware/top.bin",
            RegionKind::Bios => "software/bios/bios.bin",
            RegionKind::Firmware => "software/firmware/firmware.fbi",
        }
    }

    /// Lower-case identifier used in command-line flags (`--override-<flag>`).
    pub fn flag(self) -> &'static str {
        match self {
            RegionKind::Gateware => "gateware",
            RegionKind::Bios => "bios",
            RegionKind::Firmware => "firmware",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Start offsets of every region within the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOffsets {
    pub gateware: u64,
    pub bios: u64,
    pub firmware: u64,
}

impl RegionOffsets {
    /// Offset of a single region.
    pub fn of(&self, kind: RegionKind) -> u64 {
        match kind {
            RegionKind::Gateware => self.gateware,
            RegionKind::Bios => self.bios,
            RegionKind::Firmware => self.firmware,
        }
    }
}

/// A fixed-offset byte range reserved for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Which artifact this region holds.
    pub kind: RegionKind,
    /// Byte offset within the flash image.
    pub offset: u64,
    /// Artifacts must be strictly smaller than this. `None` means unbounded.
    pub capacity: Option<u64>,
}

impl Region {
    /// Whether an artifact of `len` bytes fits this region.
    ///
    /// A region is never filled completely: `len == capacity` is rejected.
    pub fn fits(&self, len: u64) -> bool {
        match self.capacity {
            Some(cap) => len < cap,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_in_address_order() {
        assert_eq!(
            RegionKind::ALL,
            [RegionKind::Gateware, RegionKind::Bios, RegionKind::Firmware]
        );
    }

    #[test]
    fn capacity_is_exclusive() {
        let region = Region {
            kind: RegionKind::Bios,
            offset: 0x100000,
            capacity: Some(0x8000),
        };
        assert!(region.fits(0));
        assert!(region.fits(0x7fff));
        assert!(!region.fits(0x8000));
        assert!(!region.fits(0x8001));
    }

    #[test]
    fn unbounded_region_fits_anything() {
        let region = Region {
            kind: RegionKind::Firmware,
            offset: 0x108000,
            capacity: None,
        };
        assert!(region.fits(u64::MAX));
    }

    #[test]
    fn display_names() {
        assert_eq!(RegionKind::Gateware.to_string(), "Gateware");
        assert_eq!(RegionKind::Bios.to_string(), "BIOS");
        assert_eq!(RegionKind::Firmware.to_string(), "Firmware");
    }

    #[test]
    fn default_paths() {
        assert_eq!(RegionKind::Gateware.default_path(), "gateware/top.bin");
        assert_eq!(RegionKind::Bios.default_path(), "software/bios/bios.bin");
        assert_eq!(
            RegionKind::Firmware.default_path(),
            "software/firmware/firmware.fbi"
        );
    }
}
