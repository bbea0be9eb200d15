//! Flash image composer.
//!
//! Takes up to three independently built artifacts and places them at the
//! offsets dictated by a [`PlatformLayout`]:
//!
//! ```text
//! [gateware][0x00..][bios][0x00..][firmware][0xFF.. to forced size]
//! ```
//!
//! Every size constraint is checked before the output buffer is built, and
//! [`write_image`] only replaces the destination once the whole image has
//! been written.

pub mod artifact;
pub mod compose;
pub mod error;
pub mod force;
pub mod output;
pub mod report;

pub use artifact::{Artifact, ArtifactSet};
pub use compose::{compose, ComposeConfig, ComposedImage, ERASED_BYTE};
pub use error::{ComposeError, Result};
pub use force::ForceSize;
pub use output::{read_image_head, write_image};
pub use report::{hex_dump, LayoutReport, RegionReport, SpaceSummary, HEAD_LEN};

pub use spiflash_layout::{PlatformLayout, RegionKind, BIOS_SIZE};
