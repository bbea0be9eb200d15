//! Image assembly.

use spiflash_layout::{PlatformLayout, RegionKind, BIOS_SIZE};

use crate::artifact::ArtifactSet;
use crate::error::{ComposeError, Result};
use crate::force::ForceSize;
use crate::report::{LayoutReport, RegionReport, SpaceSummary, HEAD_LEN};

/// Value of an erased flash byte, used for forced-size padding.
pub const ERASED_BYTE: u8 = 0xFF;

/// Parameters for one composition run.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    /// Target platform layout.
    pub platform: PlatformLayout,
    /// Pad the image to a fixed length.
    pub force_size: Option<ForceSize>,
    /// Treat an image (content plus any forced padding) larger than the
    /// flash as an error.
    pub enforce_flash_size: bool,
}

impl ComposeConfig {
    /// Default configuration for a platform: no padding, overflow only warned.
    pub fn new(platform: PlatformLayout) -> Self {
        Self {
            platform,
            force_size: None,
            enforce_flash_size: false,
        }
    }
}

/// A fully assembled flash image.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    /// Image contents, ready to be written verbatim to flash.
    pub bytes: Vec<u8>,
    /// Where everything ended up.
    pub report: LayoutReport,
}

fn check_platform(platform: &PlatformLayout) -> Result<()> {
    if platform.gateware_size == 0 {
        return Err(ComposeError::InvalidPlatform {
            detail: format!("platform '{}' has a zero-sized gateware region", platform.name),
        });
    }
    if platform.spiflash_total_size == 0 {
        return Err(ComposeError::InvalidPlatform {
            detail: format!("platform '{}' has a zero-sized flash", platform.name),
        });
    }
    if platform.gateware_size.checked_add(BIOS_SIZE).is_none() {
        return Err(ComposeError::InvalidPlatform {
            detail: format!(
                "platform '{}' gateware size 0x{:X} overflows the address space",
                platform.name, platform.gateware_size
            ),
        });
    }
    Ok(())
}

/// Allocate the whole image up front so an impossible length is an error
/// instead of an allocation abort.
fn allocate_image(content_len: u64, image_len: u64) -> Result<Vec<u8>> {
    let too_large = || ComposeError::ImageTooLarge { len: image_len };
    let capacity = usize::try_from(image_len).map_err(|_| too_large())?;
    let content = usize::try_from(content_len).map_err(|_| too_large())?;

    let mut bytes = Vec::new();
    bytes.try_reserve_exact(capacity).map_err(|_| too_large())?;
    bytes.resize(content, 0);
    Ok(bytes)
}

/// Lay out `artifacts` according to `config.platform`.
///
/// All size constraints are checked before any bytes are copied, so an
/// error never yields a partial image. Gaps between regions are zero;
/// padding up to a forced size is [`ERASED_BYTE`].
pub fn compose(artifacts: &ArtifactSet, config: &ComposeConfig) -> Result<ComposedImage> {
    let platform = &config.platform;
    check_platform(platform)?;

    for region in platform.regions() {
        let len = artifacts.get(region.kind).len();
        if !region.fits(len) {
            return Err(ComposeError::OversizeArtifact {
                region: region.kind,
                len,
                capacity: region.capacity.unwrap_or(u64::MAX),
            });
        }
    }

    let firmware_offset = platform.offsets().firmware;
    let content_len = firmware_offset
        .checked_add(artifacts.firmware.len())
        .ok_or_else(|| ComposeError::InvalidPlatform {
            detail: "firmware end overflows the address space".into(),
        })?;

    let image_len = match config.force_size {
        Some(force) => {
            let requested = force.resolve(platform);
            if requested < content_len {
                return Err(ComposeError::SizeMismatch {
                    requested,
                    written: content_len,
                });
            }
            requested
        }
        None => content_len,
    };

    if config.enforce_flash_size && image_len > platform.spiflash_total_size {
        return Err(ComposeError::FlashOverflow {
            overflow: image_len - platform.spiflash_total_size,
            total: platform.spiflash_total_size,
        });
    }

    // Signed: negative when the artifacts run past the end of flash.
    let remaining = platform.spiflash_total_size as i128 - content_len as i128;
    if remaining < 0 {
        let overflow = remaining.unsigned_abs() as u64;
        tracing::warn!(
            platform = %platform.name,
            overflow,
            total = platform.spiflash_total_size,
            "image does not fit in flash"
        );
    }

    let mut bytes = allocate_image(content_len, image_len)?;
    let mut regions = Vec::with_capacity(RegionKind::ALL.len());
    for region in platform.regions() {
        let artifact = artifacts.get(region.kind);
        let data = artifact.data();
        // Offsets lie below content_len, which fits in usize.
        let start = region.offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
        tracing::debug!(
            region = %region.kind,
            offset = region.offset,
            len = data.len(),
            source = artifact.label(),
            "placed region"
        );

        regions.push(RegionReport {
            kind: region.kind,
            offset: region.offset,
            len: artifact.len(),
            label: artifact.label().to_string(),
            description: region.kind.description().to_string(),
            head: data[..data.len().min(HEAD_LEN)].to_vec(),
        });
    }

    let padding = image_len - content_len;
    bytes.resize(image_len as usize, ERASED_BYTE);
    if padding > 0 {
        tracing::debug!(padding, image_len, "padded image with erased bytes");
    }

    Ok(ComposedImage {
        bytes,
        report: LayoutReport {
            platform: platform.name.clone(),
            regions,
            summary: SpaceSummary {
                remaining: remaining.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                total: platform.spiflash_total_size,
                image_len,
                padding,
            },
        },
    })
}
