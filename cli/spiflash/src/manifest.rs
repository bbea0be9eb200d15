//! `spiflash.toml` manifest parsing and platform resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use spiflash_compose::ForceSize;
use spiflash_layout::parse::{discover_platforms, load_platform_toml};
use spiflash_layout::{builtin_platform, builtin_platforms, PlatformLayout};

/// Name of the project manifest file.
pub const MANIFEST_FILE: &str = "spiflash.toml";

/// The top-level manifest structure of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpiflashManifest {
    /// Defaults for `spiflash image`.
    #[serde(default)]
    pub build: BuildConfig,
    /// Project-specific platform layouts, keyed by name.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformEntry>,
}

/// `[build]` section. Command-line flags take precedence over every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub cpu_variant: Option<String>,
    /// Build directory, relative to the manifest.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    /// Image file name, relative to the build directory.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub force_image_size: Option<ForceSetting>,
    #[serde(default)]
    pub fail_on_overflow: Option<bool>,
}

/// `force-image-size` accepts a boolean, a byte count, or the CLI literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForceSetting {
    Flag(bool),
    Bytes(u64),
    Literal(String),
}

impl ForceSetting {
    /// Convert to a composer setting; `false` disables padding.
    pub fn to_force_size(&self) -> Result<Option<ForceSize>> {
        match self {
            ForceSetting::Flag(true) => Ok(Some(ForceSize::FlashSize)),
            ForceSetting::Flag(false) => Ok(None),
            ForceSetting::Bytes(n) => Ok(Some(ForceSize::Bytes(*n))),
            ForceSetting::Literal(s) => Ok(Some(
                s.parse::<ForceSize>()
                    .with_context(|| format!("{MANIFEST_FILE}: build.force-image-size"))?,
            )),
        }
    }
}

/// A `[platforms.<name>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformEntry {
    pub gateware_size: u64,
    pub spiflash_total_size: u64,
    #[serde(default)]
    pub description: Option<String>,
}

impl PlatformEntry {
    fn to_layout(&self, name: &str) -> PlatformLayout {
        let mut layout = PlatformLayout::new(name, self.gateware_size, self.spiflash_total_size);
        layout.description = self.description.clone();
        layout
    }
}

impl SpiflashManifest {
    /// Search upward from `start_dir` for a `spiflash.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: SpiflashManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                tracing::debug!(path = %candidate.display(), "loaded manifest");
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing spiflash.toml")
    }

    /// Look up a project-defined platform.
    pub fn platform(&self, name: &str) -> Option<PlatformLayout> {
        self.platforms
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, entry)| entry.to_layout(key))
    }
}

/// Where a platform definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSource {
    Manifest,
    File(PathBuf),
    Builtin,
}

/// Resolve a platform name.
///
/// Manifest entries shadow `platforms/*.platform.toml` files, which shadow
/// the built-in table.
pub fn resolve_platform(
    name: &str,
    project_dir: &Path,
    manifest: Option<&SpiflashManifest>,
) -> Result<(PlatformLayout, PlatformSource)> {
    if let Some(layout) = manifest.and_then(|m| m.platform(name)) {
        return Ok((layout, PlatformSource::Manifest));
    }

    for (file_name, path) in discover_platforms(project_dir)? {
        if file_name.eq_ignore_ascii_case(name) {
            let layout =
                load_platform_toml(&path).with_context(|| format!("loading {}", path.display()))?;
            return Ok((layout, PlatformSource::File(path)));
        }
    }

    match builtin_platform(name) {
        Some(layout) => Ok((layout, PlatformSource::Builtin)),
        None => bail!("unknown platform: '{name}'. Use 'spiflash platform list' to see available platforms."),
    }
}

/// Every platform visible from a project, with its source.
pub fn available_platforms(
    project_dir: &Path,
    manifest: Option<&SpiflashManifest>,
) -> Result<Vec<(PlatformLayout, PlatformSource)>> {
    let mut platforms: Vec<(PlatformLayout, PlatformSource)> = Vec::new();

    if let Some(manifest) = manifest {
        for (name, entry) in &manifest.platforms {
            platforms.push((entry.to_layout(name), PlatformSource::Manifest));
        }
    }

    for (name, path) in discover_platforms(project_dir)? {
        if platforms.iter().any(|(p, _)| p.name.eq_ignore_ascii_case(&name)) {
            continue;
        }
        let layout =
            load_platform_toml(&path).with_context(|| format!("loading {}", path.display()))?;
        platforms.push((layout, PlatformSource::File(path)));
    }

    for layout in builtin_platforms() {
        if !platforms.iter().any(|(p, _)| p.name.eq_ignore_ascii_case(&layout.name)) {
            platforms.push((layout, PlatformSource::Builtin));
        }
    }

    Ok(platforms)
}
