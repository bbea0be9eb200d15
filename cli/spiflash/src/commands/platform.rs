//! `spiflash platform` — platform listing, description, and validation.

use std::path::Path;

use anyhow::{bail, Result};
use spiflash_layout::parse::{platform_to_toml, validate_platform};
use spiflash_layout::PlatformLayout;

use crate::manifest::{available_platforms, resolve_platform, PlatformSource, SpiflashManifest};

fn source_label(source: &PlatformSource) -> String {
    match source {
        PlatformSource::Manifest => "spiflash.toml".to_string(),
        PlatformSource::File(path) => path.display().to_string(),
        PlatformSource::Builtin => "built-in".to_string(),
    }
}

/// List every platform visible from the project.
pub fn list(project_dir: &Path, manifest: Option<&SpiflashManifest>) -> Result<()> {
    println!("Platforms:");
    println!();
    for (platform, source) in available_platforms(project_dir, manifest)? {
        println!(
            "  {:<16} gateware 0x{:08X}  flash {:>9} bytes  [{}]",
            platform.name,
            platform.gateware_size,
            platform.spiflash_total_size,
            source_label(&source),
        );
    }
    println!();
    println!("Use 'spiflash platform describe <name>' for the region layout.");
    Ok(())
}

/// Render the region table for a platform.
pub fn describe_text(platform: &PlatformLayout) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Platform: {} ===\n", platform.name));
    if let Some(description) = &platform.description {
        out.push_str(&format!("{description}\n"));
    }
    out.push('\n');
    out.push_str("--- Regions ---\n");
    for region in platform.regions() {
        let capacity = match region.capacity {
            Some(cap) => format!("< {cap} bytes"),
            None => "unbounded".to_string(),
        };
        out.push_str(&format!(
            "  {:>8} @ 0x{:08x}  {:<18} {}\n",
            region.kind.name(),
            region.offset,
            capacity,
            region.kind.description(),
        ));
    }
    out.push('\n');
    out.push_str("--- Flash ---\n");
    out.push_str(&format!("  Total size: {} bytes\n", platform.spiflash_total_size));
    out.push_str(&format!(
        "  Firmware space: {} bytes\n",
        platform
            .spiflash_total_size
            .saturating_sub(platform.offsets().firmware)
    ));
    out
}

/// Describe a platform, as text or as a `.platform.toml` document.
pub fn describe(
    name: &str,
    project_dir: &Path,
    manifest: Option<&SpiflashManifest>,
    format: Option<&str>,
) -> Result<()> {
    let (platform, _) = resolve_platform(name, project_dir, manifest)?;
    match format {
        None | Some("text") => print!("{}", describe_text(&platform)),
        Some("toml") => print!("{}", platform_to_toml(&platform)?),
        Some(other) => bail!("unknown format: '{other}'. Choose: text, toml"),
    }
    Ok(())
}

/// Validate a platform and report every issue.
pub fn validate(name: &str, project_dir: &Path, manifest: Option<&SpiflashManifest>) -> Result<()> {
    let (platform, _) = resolve_platform(name, project_dir, manifest)?;
    match validate_platform(&platform) {
        Ok(()) => {
            println!("Platform '{}' is valid.", platform.name);
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                eprintln!("{}: {}", issue.severity, issue.message);
            }
            let errors = issues.iter().filter(|i| i.is_error()).count();
            if errors > 0 {
                bail!("platform '{}' has {errors} error(s)", platform.name);
            }
            println!("Platform '{}' is valid ({} warning(s)).", platform.name, issues.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_text_lists_regions() {
        let text = describe_text(&PlatformLayout::opsis());
        assert!(text.contains("=== Platform: opsis ==="));
        assert!(text.contains("Gateware @ 0x00000000"));
        assert!(text.contains("    BIOS @ 0x00200000"));
        assert!(text.contains("Firmware @ 0x00208000"));
        assert!(text.contains("unbounded"));
        assert!(text.contains("Firmware space: 14647296 bytes"));
    }

    #[test]
    fn describe_known_platform() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe("arty", dir.path(), None, None).is_ok());
        assert!(describe("arty", dir.path(), None, Some("toml")).is_ok());
    }

    #[test]
    fn describe_unknown_platform() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe("nonexistent", dir.path(), None, None).is_err());
    }

    #[test]
    fn describe_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe("arty", dir.path(), None, Some("yaml")).is_err());
    }

    #[test]
    fn validate_builtin() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate("opsis", dir.path(), None).is_ok());
    }

    #[test]
    fn validate_broken_manifest_platform() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SpiflashManifest::from_str(
            "[platforms.broken]\ngateware-size = 0\nspiflash-total-size = 0x100000\n",
        )
        .unwrap();
        assert!(validate("broken", dir.path(), Some(&manifest)).is_err());
    }

    #[test]
    fn validate_crowded_platform_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SpiflashManifest::from_str(
            "[platforms.crowded]\ngateware-size = 0x100000\nspiflash-total-size = 0x100000\n",
        )
        .unwrap();
        assert!(validate("crowded", dir.path(), Some(&manifest)).is_ok());
    }

    #[test]
    fn list_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list(dir.path(), None).is_ok());
    }
}
