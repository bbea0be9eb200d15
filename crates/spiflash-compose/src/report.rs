//! Layout report for a composed image.
//!
//! The text form is scraped by downstream build logs, so region lines
//! always appear in address order followed by the space summary.

use std::fmt;

use serde::{Serialize, Serializer};
use spiflash_layout::RegionKind;

/// How many leading bytes of each artifact (and of the image) are dumped.
pub const HEAD_LEN: usize = 64;

const MIB: f64 = 1024.0 * 1024.0;

/// Render the first [`HEAD_LEN`] bytes as space-separated two-digit hex.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(HEAD_LEN)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_dump(bytes))
}

/// Placement of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionReport {
    pub kind: RegionKind,
    pub offset: u64,
    pub len: u64,
    /// Source path, or `Skipped`.
    pub label: String,
    pub description: String,
    /// Leading bytes of the artifact.
    #[serde(serialize_with = "serialize_hex")]
    pub head: Vec<u8>,
}

/// Flash usage after composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceSummary {
    /// Bytes left on the flash device after the firmware. Negative when the
    /// artifacts overflow the device.
    pub remaining: i64,
    /// Flash device size.
    pub total: u64,
    /// Final image length including padding.
    pub image_len: u64,
    /// Erased bytes appended to reach a forced size.
    pub padding: u64,
}

/// Everything the composer placed and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutReport {
    /// Platform the image was laid out for.
    pub platform: String,
    /// Regions in address order.
    pub regions: Vec<RegionReport>,
    pub summary: SpaceSummary,
}

impl LayoutReport {
    /// Report entry for a region.
    pub fn region(&self, kind: RegionKind) -> Option<&RegionReport> {
        self.regions.iter().find(|r| r.kind == kind)
    }
}

fn megabits(bytes: i64) -> i64 {
    (bytes as f64 * 8.0 / MIB) as i64
}

fn megabytes(bytes: i64) -> f64 {
    bytes as f64 / MIB
}

fn write_space(f: &mut fmt::Formatter<'_>, title: &str, bytes: i64) -> fmt::Result {
    writeln!(
        f,
        "{title:>22} {bytes:10} bytes ({} Megabits, {:.2} Megabytes)",
        megabits(bytes),
        megabytes(bytes),
    )
}

impl fmt::Display for RegionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>8} @ 0x{:08x} ({:10} bytes) {:<60} - {}",
            self.kind.name(),
            self.offset,
            self.len,
            self.label,
            self.description,
        )?;
        writeln!(f, "{}", hex_dump(&self.head))
    }
}

impl fmt::Display for LayoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in &self.regions {
            write!(f, "{region}")?;
        }
        writeln!(f, "{}", "-".repeat(40))?;
        write_space(f, "Remaining space", self.summary.remaining)?;
        write_space(f, "Total space", i64::try_from(self.summary.total).unwrap_or(i64::MAX))?;
        if self.summary.padding > 0 {
            writeln!(
                f,
                "{:>22} {:10} bytes ({} bytes of 0xff padding)",
                "Image size", self.summary.image_len, self.summary.padding,
            )?;
        }
        Ok(())
    }
}
