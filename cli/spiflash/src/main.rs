//! spiflash CLI — composes SPI flash images from gateware, BIOS and firmware.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::image::ImageOptions;
use manifest::SpiflashManifest;

#[derive(Parser)]
#[command(name = "spiflash", version, about = "SPI flash contents tool")]
struct Cli {
    /// Log debug events to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a flash image from the build outputs
    Image {
        /// Target platform (e.g., opsis, arty)
        #[arg(long, env = "PLATFORM")]
        platform: Option<String>,
        /// Build target (e.g., base, video)
        #[arg(long, env = "TARGET")]
        target: Option<String>,
        /// Soft CPU (e.g., lm32, vexriscv)
        #[arg(long, env = "CPU")]
        cpu: Option<String>,
        /// Soft CPU variant
        #[arg(long, env = "CPU_VARIANT")]
        cpu_variant: Option<String>,
        /// Build directory (default: build/<platform>_<target>_<cpu>)
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Image file name, relative to the build directory (default: flash.bin)
        #[arg(long)]
        output_file: Option<String>,
        /// Gateware bitstream path, or "none" to skip
        #[arg(long)]
        override_gateware: Option<String>,
        /// BIOS binary path, or "none" to skip
        #[arg(long)]
        override_bios: Option<String>,
        /// Firmware path, or "none" to skip
        #[arg(long)]
        override_firmware: Option<String>,
        /// Pad with 0xff to the flash size ("true"/"1") or to a byte count
        #[arg(long)]
        force_image_size: Option<String>,
        /// Fail if the image is larger than the flash
        #[arg(long)]
        fail_on_overflow: bool,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// Inspect platform layouts
    Platform {
        #[command(subcommand)]
        action: PlatformAction,
    },
}

#[derive(Subcommand)]
enum PlatformAction {
    /// List available platforms
    List,
    /// Show the region layout of a platform
    Describe {
        /// Platform name
        name: String,
        /// Output format (text, toml)
        #[arg(long)]
        format: Option<String>,
    },
    /// Validate a platform layout
    Validate {
        /// Platform name
        name: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, project_dir) = load_manifest_optional(&cwd)?;
    let project_dir = project_dir.unwrap_or(cwd);

    match cli.command {
        Commands::Image {
            platform,
            target,
            cpu,
            cpu_variant,
            build_dir,
            output_file,
            override_gateware,
            override_bios,
            override_firmware,
            force_image_size,
            fail_on_overflow,
            report,
        } => {
            let opts = ImageOptions {
                platform,
                target,
                cpu,
                cpu_variant,
                build_dir,
                output_file,
                override_gateware,
                override_bios,
                override_firmware,
                force_image_size,
                fail_on_overflow,
                report,
            };
            commands::image::run(&project_dir, manifest.as_ref(), &opts)
        }

        Commands::Platform { action } => match action {
            PlatformAction::List => commands::platform::list(&project_dir, manifest.as_ref()),
            PlatformAction::Describe { name, format } => commands::platform::describe(
                &name,
                &project_dir,
                manifest.as_ref(),
                format.as_deref(),
            ),
            PlatformAction::Validate { name } => {
                commands::platform::validate(&name, &project_dir, manifest.as_ref())
            }
        },
    }
}

/// Load `spiflash.toml` if one exists at or above `cwd`.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<SpiflashManifest>, Option<PathBuf>)> {
    match SpiflashManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
