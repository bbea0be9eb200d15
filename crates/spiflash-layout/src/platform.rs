//! Platform layout descriptors.
//!
//! Only two numbers vary between boards: how much flash the gateware
//! region reserves and how big the SPI flash chip is. Everything else
//! follows from the bootloader convention.

use serde::{Deserialize, Serialize};

use crate::region::{Region, RegionKind, RegionOffsets};

/// Size reserved for the BIOS region, fixed by the bootloader.
pub const BIOS_SIZE: u64 = 0x8000;

const MIB: u64 = 1024 * 1024;

/// Flash layout parameters for a target platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformLayout {
    /// Platform name (e.g., "opsis", "arty").
    pub name: String,
    /// Human-readable board description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bytes reserved for the gateware region.
    pub gateware_size: u64,
    /// Total addressable bytes of the SPI flash device.
    pub spiflash_total_size: u64,
}

impl PlatformLayout {
    /// Create a layout from its two size parameters.
    pub fn new(name: impl Into<String>, gateware_size: u64, spiflash_total_size: u64) -> Self {
        Self {
            name: name.into(),
            description: None,
            gateware_size,
            spiflash_total_size,
        }
    }

    fn described(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Start offset of each region.
    ///
    /// Saturates on overflow; [`validate_platform`](crate::parse::validate_platform)
    /// rejects such layouts.
    pub fn offsets(&self) -> RegionOffsets {
        RegionOffsets {
            gateware: 0,
            bios: self.gateware_size,
            firmware: self.gateware_size.saturating_add(BIOS_SIZE),
        }
    }

    /// Capacity of a region, if it has one.
    pub fn capacity(&self, kind: RegionKind) -> Option<u64> {
        match kind {
            RegionKind::Gateware => Some(self.gateware_size),
            RegionKind::Bios => Some(BIOS_SIZE),
            RegionKind::Firmware => None,
        }
    }

    /// A single region of this layout.
    pub fn region(&self, kind: RegionKind) -> Region {
        Region {
            kind,
            offset: self.offsets().of(kind),
            capacity: self.capacity(kind),
        }
    }

    /// All regions, in address order.
    pub fn regions(&self) -> [Region; 3] {
        RegionKind::ALL.map(|kind| self.region(kind))
    }

    /// Digilent Arty A7.
    pub fn arty() -> Self {
        Self::new("arty", 0x400000, 16 * MIB).described("Digilent Arty A7 (Artix-7, 128 Mbit flash)")
    }

    /// Digilent Atlys.
    pub fn atlys() -> Self {
        Self::new("atlys", 0x200000, 16 * MIB).described("Digilent Atlys (Spartan-6, 128 Mbit flash)")
    }

    /// Numato Mimas V2.
    pub fn mimasv2() -> Self {
        Self::new("mimasv2", 0x80000, 2 * MIB).described("Numato Mimas V2 (Spartan-6, 16 Mbit flash)")
    }

    /// Scarab miniSpartan6+.
    pub fn minispartan6() -> Self {
        Self::new("minispartan6", 0x80000, 8 * MIB)
            .described("Scarab miniSpartan6+ (Spartan-6, 64 Mbit flash)")
    }

    /// Digilent Nexys Video.
    pub fn nexys_video() -> Self {
        Self::new("nexys_video", 0x400000, 32 * MIB)
            .described("Digilent Nexys Video (Artix-7, 256 Mbit flash)")
    }

    /// Numato Opsis.
    pub fn opsis() -> Self {
        Self::new("opsis", 0x200000, 16 * MIB).described("Numato Opsis (Spartan-6, 128 Mbit flash)")
    }

    /// Saanlima Pipistrello.
    pub fn pipistrello() -> Self {
        Self::new("pipistrello", 0x200000, 16 * MIB)
            .described("Saanlima Pipistrello (Spartan-6, 128 Mbit flash)")
    }
}

/// All built-in platforms, sorted by name.
pub fn builtin_platforms() -> Vec<PlatformLayout> {
    vec![
        PlatformLayout::arty(),
        PlatformLayout::atlys(),
        PlatformLayout::mimasv2(),
        PlatformLayout::minispartan6(),
        PlatformLayout::nexys_video(),
        PlatformLayout::opsis(),
        PlatformLayout::pipistrello(),
    ]
}

/// Look up a built-in platform by name (case-insensitive).
pub fn builtin_platform(name: &str) -> Option<PlatformLayout> {
    builtin_platforms()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_gateware_size() {
        let p = PlatformLayout::new("custom", 0x100000, 0x1000000);
        let offsets = p.offsets();
        assert_eq!(offsets.gateware, 0);
        assert_eq!(offsets.bios, 0x100000);
        assert_eq!(offsets.firmware, 0x108000);
    }

    #[test]
    fn offsets_independent_of_flash_size() {
        let small = PlatformLayout::new("a", 0x80000, 2 * MIB);
        let large = PlatformLayout::new("b", 0x80000, 32 * MIB);
        assert_eq!(small.offsets(), large.offsets());
    }

    #[test]
    fn regions_are_strictly_increasing() {
        for p in builtin_platforms() {
            let [gw, bios, fw] = p.regions();
            assert!(gw.offset < bios.offset, "{}", p.name);
            assert!(bios.offset < fw.offset, "{}", p.name);
            assert_eq!(bios.offset, p.gateware_size);
            assert_eq!(fw.offset, p.gateware_size + BIOS_SIZE);
        }
    }

    #[test]
    fn capacities() {
        let p = PlatformLayout::opsis();
        assert_eq!(p.capacity(RegionKind::Gateware), Some(0x200000));
        assert_eq!(p.capacity(RegionKind::Bios), Some(BIOS_SIZE));
        assert_eq!(p.capacity(RegionKind::Firmware), None);
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        assert_eq!(builtin_platform("Opsis"), Some(PlatformLayout::opsis()));
        assert_eq!(builtin_platform("ARTY"), Some(PlatformLayout::arty()));
        assert!(builtin_platform("nonexistent").is_none());
    }

    #[test]
    fn builtins_sorted_and_unique() {
        let names: Vec<_> = builtin_platforms().into_iter().map(|p| p.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn overflowing_offsets_saturate() {
        let p = PlatformLayout::new("huge", u64::MAX, u64::MAX);
        assert_eq!(p.offsets().firmware, u64::MAX);
    }
}
