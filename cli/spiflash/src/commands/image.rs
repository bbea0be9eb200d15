//! `spiflash image` — resolve artifacts, compose, write, report.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use spiflash_compose::{
    compose, hex_dump, read_image_head, write_image, Artifact, ArtifactSet, ComposeConfig,
    ComposeError, ForceSize, LayoutReport,
};
use spiflash_layout::parse::{ensure_valid, validate_platform};
use spiflash_layout::RegionKind;

use crate::manifest::{resolve_platform, SpiflashManifest};

pub const DEFAULT_PLATFORM: &str = "opsis";
pub const DEFAULT_TARGET: &str = "base";
pub const DEFAULT_CPU: &str = "lm32";
pub const DEFAULT_OUTPUT_FILE: &str = "flash.bin";

/// Value of an `--override-*` flag that skips the region.
const SKIP_SENTINEL: &str = "none";

/// Command-line options for `spiflash image`. `None` falls back to the
/// manifest, then to the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    pub platform: Option<String>,
    pub target: Option<String>,
    pub cpu: Option<String>,
    pub cpu_variant: Option<String>,
    pub build_dir: Option<PathBuf>,
    pub output_file: Option<String>,
    pub override_gateware: Option<String>,
    pub override_bios: Option<String>,
    pub override_firmware: Option<String>,
    pub force_image_size: Option<String>,
    pub fail_on_overflow: bool,
    pub report: Option<String>,
}

impl ImageOptions {
    fn override_for(&self, kind: RegionKind) -> Option<&str> {
        match kind {
            RegionKind::Gateware => self.override_gateware.as_deref(),
            RegionKind::Bios => self.override_bios.as_deref(),
            RegionKind::Firmware => self.override_firmware.as_deref(),
        }
    }
}

/// The build whose artifacts are being packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSelection {
    pub platform: String,
    pub target: String,
    pub cpu: String,
    pub cpu_variant: Option<String>,
}

impl BuildSelection {
    fn resolve(opts: &ImageOptions, manifest: Option<&SpiflashManifest>) -> Self {
        let build = manifest.map(|m| &m.build);
        let pick = |flag: &Option<String>, configured: Option<&Option<String>>, default: &str| {
            flag.clone()
                .or_else(|| configured.and_then(|c| c.clone()))
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            platform: pick(&opts.platform, build.map(|b| &b.platform), DEFAULT_PLATFORM),
            target: pick(&opts.target, build.map(|b| &b.target), DEFAULT_TARGET),
            cpu: pick(&opts.cpu, build.map(|b| &b.cpu), DEFAULT_CPU),
            cpu_variant: opts
                .cpu_variant
                .clone()
                .or_else(|| build.and_then(|b| b.cpu_variant.clone()))
                .filter(|v| !v.is_empty()),
        }
    }

    /// `<platform>_<target>_<cpu>[.<variant>]`, lower-cased.
    pub fn build_dir_name(&self) -> String {
        let cpu = match &self.cpu_variant {
            Some(variant) => format!("{}.{}", self.cpu, variant),
            None => self.cpu.clone(),
        };
        format!("{}_{}_{}", self.platform, self.target, cpu).to_lowercase()
    }
}

/// How one region's artifact is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactChoice {
    /// Conventional path under the build directory.
    Default,
    /// Leave the region empty.
    Skip,
    /// Explicit file.
    Path(PathBuf),
}

impl ArtifactChoice {
    /// Interpret an `--override-*` value.
    pub fn from_override(value: Option<&str>) -> Self {
        match value {
            None | Some("") => ArtifactChoice::Default,
            Some(v) if v.eq_ignore_ascii_case(SKIP_SENTINEL) => ArtifactChoice::Skip,
            Some(v) => ArtifactChoice::Path(PathBuf::from(v)),
        }
    }
}

/// Load the artifact for a region, failing with a hint when the file is missing.
pub fn resolve_artifact(kind: RegionKind, choice: &ArtifactChoice, build_dir: &Path) -> Result<Artifact> {
    let path = match choice {
        ArtifactChoice::Skip => {
            tracing::debug!(region = %kind, "region skipped");
            return Ok(Artifact::Absent);
        }
        ArtifactChoice::Path(path) => path.clone(),
        ArtifactChoice::Default => build_dir.join(kind.default_path()),
    };

    Artifact::load(kind, &path).map_err(|e| match e {
        ComposeError::MissingArtifact { .. } => anyhow!(
            "{e}. Use --override-{flag}={SKIP_SENTINEL} for no {name}.",
            flag = kind.flag(),
            name = kind.name(),
        ),
        other => anyhow::Error::new(other).context(format!("reading {}", path.display())),
    })
}

/// Resolve all three regions in address order.
pub fn resolve_artifacts(opts: &ImageOptions, build_dir: &Path) -> Result<ArtifactSet> {
    let mut artifacts = ArtifactSet::empty();
    for kind in RegionKind::ALL {
        let choice = ArtifactChoice::from_override(opts.override_for(kind));
        artifacts.set(kind, resolve_artifact(kind, &choice, build_dir)?);
    }
    Ok(artifacts)
}

fn resolve_build_dir(
    project_dir: &Path,
    opts: &ImageOptions,
    manifest: Option<&SpiflashManifest>,
    selection: &BuildSelection,
) -> PathBuf {
    if let Some(dir) = &opts.build_dir {
        return dir.clone();
    }
    if let Some(dir) = manifest.and_then(|m| m.build.build_dir.as_ref()) {
        return project_dir.join(dir);
    }
    project_dir.join("build").join(selection.build_dir_name())
}

fn resolve_force_size(
    opts: &ImageOptions,
    manifest: Option<&SpiflashManifest>,
) -> Result<Option<ForceSize>> {
    if let Some(literal) = &opts.force_image_size {
        let force = literal
            .parse::<ForceSize>()
            .context("--force-image-size")?;
        return Ok(Some(force));
    }
    match manifest.and_then(|m| m.build.force_image_size.as_ref()) {
        Some(setting) => setting.to_force_size(),
        None => Ok(None),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    output: String,
    #[serde(flatten)]
    layout: &'a LayoutReport,
    image_head: String,
}

/// Run `spiflash image`.
pub fn run(project_dir: &Path, manifest: Option<&SpiflashManifest>, opts: &ImageOptions) -> Result<()> {
    let report_mode = opts.report.as_deref().unwrap_or("human");
    if !matches!(report_mode, "human" | "json") {
        bail!("unknown report format: '{report_mode}'. Choose: human, json");
    }

    let selection = BuildSelection::resolve(opts, manifest);
    let build_dir = resolve_build_dir(project_dir, opts, manifest, &selection);
    tracing::debug!(build_dir = %build_dir.display(), "resolved build directory");

    let artifacts = resolve_artifacts(opts, &build_dir)?;

    let (platform, source) = resolve_platform(&selection.platform, project_dir, manifest)?;
    tracing::debug!(platform = %platform.name, ?source, "resolved platform");
    if let Err(issues) = validate_platform(&platform) {
        for issue in issues.iter().filter(|i| !i.is_error()) {
            tracing::warn!(platform = %platform.name, "{}", issue.message);
        }
    }
    ensure_valid(&platform)?;

    let config = ComposeConfig {
        platform,
        force_size: resolve_force_size(opts, manifest)?,
        enforce_flash_size: opts.fail_on_overflow
            || manifest
                .and_then(|m| m.build.fail_on_overflow)
                .unwrap_or(false),
    };

    let image = compose(&artifacts, &config)?;

    let output_file = opts
        .output_file
        .as_deref()
        .or_else(|| manifest.and_then(|m| m.build.output_file.as_deref()))
        .unwrap_or(DEFAULT_OUTPUT_FILE);
    let output = build_dir.join(output_file);
    write_image(&image, &output).with_context(|| format!("writing {}", output.display()))?;

    let head = read_image_head(&output).with_context(|| format!("reading back {}", output.display()))?;

    if report_mode == "json" {
        let json = JsonReport {
            output: output.display().to_string(),
            layout: &image.report,
            image_head: hex_dump(&head),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!();
        print!("{}", image.report);
        println!();
        println!("Flash image: {}", output.display());
        println!("{}", hex_dump(&head));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn skip_sentinel_is_case_insensitive() {
        assert_eq!(ArtifactChoice::from_override(Some("none")), ArtifactChoice::Skip);
        assert_eq!(ArtifactChoice::from_override(Some("NONE")), ArtifactChoice::Skip);
        assert_eq!(ArtifactChoice::from_override(None), ArtifactChoice::Default);
        assert_eq!(
            ArtifactChoice::from_override(Some("bios.bin")),
            ArtifactChoice::Path(PathBuf::from("bios.bin"))
        );
    }

    #[test]
    fn build_dir_name_defaults() {
        let selection = BuildSelection::resolve(&ImageOptions::default(), None);
        assert_eq!(selection.build_dir_name(), "opsis_base_lm32");
    }

    #[test]
    fn build_dir_name_with_variant_is_lowercased() {
        let opts = ImageOptions {
            platform: Some("Arty".into()),
            target: Some("NET".into()),
            cpu: Some("VexRiscv".into()),
            cpu_variant: Some("Lite".into()),
            ..Default::default()
        };
        let selection = BuildSelection::resolve(&opts, None);
        assert_eq!(selection.build_dir_name(), "arty_net_vexriscv.lite");
    }

    #[test]
    fn flags_override_manifest() {
        let manifest = SpiflashManifest::from_str(
            "[build]\nplatform = \"atlys\"\ntarget = \"video\"\n",
        )
        .unwrap();
        let opts = ImageOptions {
            platform: Some("arty".into()),
            ..Default::default()
        };
        let selection = BuildSelection::resolve(&opts, Some(&manifest));
        assert_eq!(selection.platform, "arty");
        assert_eq!(selection.target, "video");
        assert_eq!(selection.cpu, DEFAULT_CPU);
    }

    #[test]
    fn missing_default_artifact_has_hint() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_artifact(RegionKind::Gateware, &ArtifactChoice::Default, dir.path())
            .unwrap_err()
            .to_string();
        assert!(err.contains("Gateware file not found"));
        assert!(err.contains("--override-gateware=none"));
    }

    #[test]
    fn missing_override_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let choice = ArtifactChoice::Path(dir.path().join("nope.bin"));
        let err = resolve_artifact(RegionKind::Bios, &choice, dir.path()).unwrap_err();
        assert!(err.to_string().contains("--override-bios=none"));
    }

    #[test]
    fn resolve_artifacts_mixes_sources() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("gateware/top.bin"), &[0xaa; 4]);
        let fw = dir.path().join("custom.fbi");
        write(&fw, &[0x01; 2]);

        let opts = ImageOptions {
            override_bios: Some("None".into()),
            override_firmware: Some(fw.display().to_string()),
            ..Default::default()
        };
        let artifacts = resolve_artifacts(&opts, dir.path()).unwrap();
        assert_eq!(artifacts.gateware.len(), 4);
        assert!(artifacts.bios.is_absent());
        assert_eq!(artifacts.firmware.data(), &[0x01, 0x01]);
    }

    #[test]
    fn force_size_flag_beats_manifest() {
        let manifest = SpiflashManifest::from_str("[build]\nforce-image-size = 4096\n").unwrap();
        let opts = ImageOptions {
            force_image_size: Some("true".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_force_size(&opts, Some(&manifest)).unwrap(),
            Some(ForceSize::FlashSize)
        );
        assert_eq!(
            resolve_force_size(&ImageOptions::default(), Some(&manifest)).unwrap(),
            Some(ForceSize::Bytes(4096))
        );
        assert_eq!(resolve_force_size(&ImageOptions::default(), None).unwrap(), None);
    }

    #[test]
    fn bad_force_size_rejected() {
        let opts = ImageOptions {
            force_image_size: Some("huge".into()),
            ..Default::default()
        };
        assert!(resolve_force_size(&opts, None).is_err());
    }

    #[test]
    fn run_writes_image_to_build_dir() {
        let project = tempfile::tempdir().unwrap();
        let build_dir = project.path().join("build").join("mimasv2_base_lm32");
        write(&build_dir.join("gateware/top.bin"), &[0xaa; 500]);
        write(&build_dir.join("software/bios/bios.bin"), &[0xbb; 100]);
        write(&build_dir.join("software/firmware/firmware.fbi"), &[0x01; 10]);

        let opts = ImageOptions {
            platform: Some("mimasv2".into()),
            force_image_size: Some("1".into()),
            ..Default::default()
        };
        run(project.path(), None, &opts).unwrap();

        let bytes = std::fs::read(build_dir.join("flash.bin")).unwrap();
        assert_eq!(bytes.len(), 2 * 1024 * 1024);
        assert_eq!(&bytes[..500], &[0xaa; 500][..]);
        assert_eq!(&bytes[0x80000..0x80064], &[0xbb; 100][..]);
        assert_eq!(&bytes[0x88000..0x8800a], &[0x01; 10][..]);
        assert!(bytes[0x8800a..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn run_oversize_leaves_no_output() {
        let project = tempfile::tempdir().unwrap();
        let build_dir = project.path().join("out");
        write(&build_dir.join("bios.bin"), &vec![0u8; 0x8000]);

        let opts = ImageOptions {
            build_dir: Some(build_dir.clone()),
            override_gateware: Some("none".into()),
            override_bios: Some(build_dir.join("bios.bin").display().to_string()),
            override_firmware: Some("none".into()),
            ..Default::default()
        };
        let err = run(project.path(), None, &opts).unwrap_err();
        assert!(err.to_string().contains("BIOS"));
        assert!(!build_dir.join("flash.bin").exists());
    }

    #[test]
    fn run_builds_when_firmware_offset_is_past_flash_end() {
        let project = tempfile::tempdir().unwrap();
        let manifest = SpiflashManifest::from_str(
            r#"
[platforms.crowded]
gateware-size = 0x10000
spiflash-total-size = 0x10000
"#,
        )
        .unwrap();
        let build_dir = project.path().join("out");
        let opts = ImageOptions {
            platform: Some("crowded".into()),
            build_dir: Some(build_dir.clone()),
            override_gateware: Some("none".into()),
            override_bios: Some("none".into()),
            override_firmware: Some("none".into()),
            ..Default::default()
        };
        run(project.path(), Some(&manifest), &opts).unwrap();

        let bytes = std::fs::read(build_dir.join("flash.bin")).unwrap();
        assert_eq!(bytes.len(), 0x18000);
    }

    #[test]
    fn run_crowded_platform_fails_when_overflow_enforced() {
        let project = tempfile::tempdir().unwrap();
        let manifest = SpiflashManifest::from_str(
            "[platforms.crowded]\ngateware-size = 0x10000\nspiflash-total-size = 0x10000\n",
        )
        .unwrap();
        let build_dir = project.path().join("out");
        let opts = ImageOptions {
            platform: Some("crowded".into()),
            build_dir: Some(build_dir.clone()),
            override_gateware: Some("none".into()),
            override_bios: Some("none".into()),
            override_firmware: Some("none".into()),
            fail_on_overflow: true,
            ..Default::default()
        };
        let err = run(project.path(), Some(&manifest), &opts).unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert!(!build_dir.join("flash.bin").exists());
    }

    #[test]
    fn run_rejects_unknown_report_format() {
        let project = tempfile::tempdir().unwrap();
        let opts = ImageOptions {
            report: Some("xml".into()),
            ..Default::default()
        };
        assert!(run(project.path(), None, &opts).is_err());
    }

    #[test]
    fn run_uses_manifest_platform_and_output() {
        let project = tempfile::tempdir().unwrap();
        let manifest = SpiflashManifest::from_str(
            r#"
[build]
platform = "tiny"
build-dir = "artifacts"
output-file = "tiny.bin"
fail-on-overflow = true

[platforms.tiny]
gateware-size = 0x10000
spiflash-total-size = 0x20000
"#,
        )
        .unwrap();
        let build_dir = project.path().join("artifacts");
        write(&build_dir.join("software/firmware/firmware.fbi"), &[0x42; 16]);

        let opts = ImageOptions {
            override_gateware: Some("none".into()),
            override_bios: Some("none".into()),
            ..Default::default()
        };
        run(project.path(), Some(&manifest), &opts).unwrap();

        let bytes = std::fs::read(build_dir.join("tiny.bin")).unwrap();
        assert_eq!(bytes.len(), 0x18000 + 16);
        assert!(bytes[..0x18000].iter().all(|&b| b == 0));
    }
}
