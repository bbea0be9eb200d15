//! SPI flash region layout for FPGA boards.
//!
//! A flash image is split into three fixed regions:
//! - **Gateware:** the FPGA bitstream, starting at offset 0
//! - **BIOS:** the second-stage bootloader, a fixed [`BIOS_SIZE`] bytes
//! - **Firmware:** the application payload, filling the rest of the flash
//!
//! Where each region starts depends only on the platform's gateware
//! region size, described by a [`PlatformLayout`].

pub mod error;
pub mod parse;
pub mod platform;
pub mod region;

pub use error::{LayoutError, Result};
pub use platform::{builtin_platform, builtin_platforms, PlatformLayout, BIOS_SIZE};
pub use region::{Region, RegionKind, RegionOffsets};
