use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use vlcfetch::catalog::{BundledResources, DirectoryResources, ResourceLoader};
use vlcfetch::common::paths;
use vlcfetch::ui::{self, prelude::*};
use vlcfetch::{
    BootstrapConfig, NativeDiscovery, NativeFetcher, OsRelease, PackageCatalog, Platform,
    Resolution, Resolver,
};

/// Fetch, discover and resolve the native libVLC runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print one JSON event per line
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Download timeout in seconds (0 disables it)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retry transient download failures
    #[arg(long, global = true)]
    retry: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, discover, and print install hints if nothing is found
    Resolve {
        /// Install directory (defaults to the configured one)
        dir: Option<PathBuf>,
    },
    /// Download and install the prebuilt runtime
    Fetch { dir: Option<PathBuf> },
    /// Look for an installed runtime without downloading
    Discover { dir: Option<PathBuf> },
    /// Show the system packages that provide the runtime
    Packages {
        /// Distribution key (defaults to this host's)
        distro: Option<String>,
        /// Release to select, e.g. 20.04
        #[arg(long)]
        release: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }
    ui::set_debug_mode(cli.debug);

    if let Err(e) = run(cli).await {
        emit(
            Level::Error,
            "vlcfetch.error",
            &format!("{} {e:#}", char::from(NerdFont::Cross)),
            None,
        );
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => paths::config_path()?,
    };
    let mut config =
        BootstrapConfig::load_from_path(&config_path).context("Failed to load configuration")?;
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    if cli.retry {
        config.retry.enabled = true;
    }

    // The catalog is required by every command; a bad one is fatal
    let loader: Box<dyn ResourceLoader> = match &config.catalog_dir {
        Some(dir) => Box::new(DirectoryResources::new(dir)),
        None => Box::new(BundledResources),
    };
    let catalog = Arc::new(
        PackageCatalog::load(loader.as_ref()).context("Failed to load package catalog")?,
    );

    let platform = Platform::current()?;
    emit(
        Level::Debug,
        "vlcfetch.platform",
        &format!(
            "{} Platform {platform}, config {}",
            char::from(NerdFont::Gear),
            config_path.display()
        ),
        None,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            emit(
                Level::Warn,
                "vlcfetch.cancel",
                &format!("{} Cancelling...", char::from(NerdFont::Warning)),
                None,
            );
            on_signal.cancel();
        }
    });

    match cli.command.unwrap_or(Commands::Resolve { dir: None }) {
        Commands::Resolve { dir } => {
            let dir = dir.unwrap_or_else(|| config.install_dir());
            let fetcher = NativeFetcher::from_config(&config, platform)?;
            let discovery = NativeDiscovery::from_config(platform, &config);
            let resolution = Resolver::new(fetcher, discovery, catalog)
                .resolve(&dir, &cancel)
                .await?;
            report_resolution(&resolution);
            if !matches!(resolution, Resolution::Ready { .. }) {
                std::process::exit(2);
            }
        }
        Commands::Fetch { dir } => {
            let dir = dir.unwrap_or_else(|| config.install_dir());
            let outcome = NativeFetcher::from_config(&config, platform)?
                .download_libraries(&dir, &cancel)
                .await?;
            emit(
                Level::Info,
                "vlcfetch.fetch",
                &format!(
                    "{} {}",
                    char::from(NerdFont::Folder),
                    outcome.library().display()
                ),
                serde_json::to_value(&outcome).ok(),
            );
        }
        Commands::Discover { dir } => {
            let dir = dir.unwrap_or_else(|| config.install_dir());
            let result = NativeDiscovery::from_config(platform, &config).discover(&dir)?;
            match result.resolved_path() {
                Some(path) => emit(
                    Level::Success,
                    "vlcfetch.discover.found",
                    &format!("{} Found {}", char::from(NerdFont::Check), path.display()),
                    serde_json::to_value(&result).ok(),
                ),
                None => emit(
                    Level::Warn,
                    "vlcfetch.discover.missing",
                    &format!(
                        "{} No VLC library found for {}",
                        char::from(NerdFont::Warning),
                        dir.display()
                    ),
                    serde_json::to_value(&result).ok(),
                ),
            }
        }
        Commands::Packages { distro, release } => {
            // The host's VERSION_ID and ID_LIKE only apply to the host's own distribution
            let mut os = match distro {
                Some(id) => OsRelease {
                    id,
                    ..OsRelease::default()
                },
                None => OsRelease::detect()
                    .context("Could not detect the Linux distribution; pass one explicitly")?,
            };
            if release.is_some() {
                os.version_id = release;
            }
            let remediation = catalog.remediation(&os, Some(platform.arch))?;
            emit(
                Level::Info,
                "vlcfetch.packages",
                &format!(
                    "{} Packages for {} {}",
                    char::from(NerdFont::Info),
                    remediation.distribution,
                    remediation.release
                ),
                Some(serde_json::json!({
                    "distribution": remediation.distribution,
                    "release": remediation.release,
                })),
            );
            for package in &remediation.packages {
                emit(
                    Level::Info,
                    "vlcfetch.package",
                    &format!("{} {}", char::from(NerdFont::Package), package.install_hint()),
                    serde_json::to_value(package).ok(),
                );
            }
        }
    }

    Ok(())
}

fn report_resolution(resolution: &Resolution) {
    let data = serde_json::to_value(resolution).ok();
    match resolution {
        Resolution::Ready { library, .. } => emit(
            Level::Success,
            "vlcfetch.ready",
            &format!("{} VLC ready: {}", char::from(NerdFont::Check), library.display()),
            data,
        ),
        Resolution::Remediation(remediation) => {
            emit(
                Level::Warn,
                "vlcfetch.remediation",
                &format!(
                    "{} VLC not found. Install it with your package manager ({} {}):",
                    char::from(NerdFont::Warning),
                    remediation.distribution,
                    remediation.release
                ),
                data,
            );
            if ui::get_output_format() == OutputFormat::Text {
                separator();
                for hint in remediation.install_hints() {
                    println!("   {}", hint.bold());
                }
            }
        }
        Resolution::Missing => emit(
            Level::Error,
            "vlcfetch.missing",
            &format!(
                "{} VLC not found and no prebuilt runtime is available. Install VLC {}",
                char::from(NerdFont::Cross),
                "https://www.videolan.org/vlc/".bright_black()
            ),
            data,
        ),
    }
}
