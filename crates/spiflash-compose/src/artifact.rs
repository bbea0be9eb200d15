//! Artifact inputs for each flash region.

use std::path::Path;

use spiflash_layout::RegionKind;

use crate::error::{ComposeError, Result};

/// Label reported for a region that was skipped.
pub const SKIPPED: &str = "Skipped";

/// The contents destined for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Raw bytes and a label naming where they came from.
    Present { label: String, data: Vec<u8> },
    /// The region is intentionally left empty.
    Absent,
}

impl Artifact {
    /// Read an artifact file.
    pub fn load(region: RegionKind, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ComposeError::MissingArtifact {
                region,
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path)?;
        tracing::debug!(%region, path = %path.display(), len = data.len(), "loaded artifact");
        Ok(Self::Present {
            label: path.display().to_string(),
            data,
        })
    }

    /// Wrap in-memory bytes.
    pub fn from_bytes(label: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Present {
            label: label.into(),
            data: data.into(),
        }
    }

    /// The artifact bytes; empty when absent.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Present { data, .. } => data,
            Self::Absent => &[],
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.data().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Source label for reports.
    pub fn label(&self) -> &str {
        match self {
            Self::Present { label, .. } => label,
            Self::Absent => SKIPPED,
        }
    }
}

/// One artifact per region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub gateware: Artifact,
    pub bios: Artifact,
    pub firmware: Artifact,
}

impl ArtifactSet {
    /// A set with every region skipped.
    pub fn empty() -> Self {
        Self {
            gateware: Artifact::Absent,
            bios: Artifact::Absent,
            firmware: Artifact::Absent,
        }
    }

    /// The artifact for a region.
    pub fn get(&self, kind: RegionKind) -> &Artifact {
        match kind {
            RegionKind::Gateware => &self.gateware,
            RegionKind::Bios => &self.bios,
            RegionKind::Firmware => &self.firmware,
        }
    }

    /// Replace the artifact for a region.
    pub fn set(&mut self, kind: RegionKind, artifact: Artifact) {
        match kind {
            RegionKind::Gateware => self.gateware = artifact,
            RegionKind::Bios => self.bios = artifact,
            RegionKind::Firmware => self.firmware = artifact,
        }
    }
}

impl Default for ArtifactSet {
    fn default() -> Self {
        Self::empty()
    }
}
