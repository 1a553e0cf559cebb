mod common;
mod utils;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use common::TestEnvironment;
use tokio_util::sync::CancellationToken;
use vlcfetch::catalog::BundledResources;
use vlcfetch::fetch::{ArchiveTable, PlatformArchive};
use vlcfetch::{
    CpuArch, FetchOutcome, NativeDiscovery, NativeFetcher, OsFamily, OsRelease, PackageCatalog,
    Platform, Resolution, Resolver,
};

const LINUX: Platform = Platform::new(OsFamily::Linux, CpuArch::X86_64);

fn bundled_catalog() -> Arc<PackageCatalog> {
    Arc::new(PackageCatalog::load(&BundledResources).expect("bundled catalog is valid"))
}

#[cfg(unix)]
#[tokio::test]
async fn test_resolve_installs_and_finds_runtime() -> Result<()> {
    let env = TestEnvironment::new()?;
    let archive = utils::create_runtime_archive(&env)?;

    let table = ArchiveTable::new(
        "3.0.21",
        "https://mirror.invalid",
        vec![PlatformArchive::new(LINUX, "linux/libvlc-3.0.21-linux-x86_64.tar.gz")],
    );
    let fetcher = NativeFetcher::new(utils::LocalDownloader::new(archive), table, LINUX);
    let discovery = NativeDiscovery::new(LINUX).with_search_dirs(Vec::new());
    let resolver = Resolver::new(fetcher, discovery, bundled_catalog()).with_os_release(None);

    let resolution = resolver
        .resolve(&env.install_dir(), &CancellationToken::new())
        .await?;

    let Resolution::Ready { library, fetch } = resolution else {
        panic!("expected the runtime to be ready, got {resolution:?}");
    };
    assert_eq!(library.file_name().unwrap(), "libvlc.so.5.6.1");
    assert!(matches!(fetch, Some(FetchOutcome::Installed { .. })));
    assert!(env.install_dir().join("vlc/plugins/codec").is_dir());

    // Second run keeps the existing install
    let resolution = resolver
        .resolve(&env.install_dir(), &CancellationToken::new())
        .await?;
    assert!(matches!(
        resolution,
        Resolution::Ready {
            fetch: Some(FetchOutcome::AlreadyInstalled { .. }),
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_resolve_without_archive_suggests_packages() -> Result<()> {
    let env = TestEnvironment::new()?;
    let platform = Platform::new(OsFamily::Linux, CpuArch::Arm);
    let fetcher = NativeFetcher::new(
        utils::LocalDownloader::new(env.path().join("unused")),
        ArchiveTable::builtin(),
        platform,
    );
    let discovery = NativeDiscovery::new(platform).with_search_dirs(Vec::new());
    let raspbian = OsRelease::parse("ID=raspbian\nID_LIKE=debian\nVERSION_ID=\"11\"\n");
    let resolver =
        Resolver::new(fetcher, discovery, bundled_catalog()).with_os_release(Some(raspbian));

    let resolution = resolver
        .resolve(&env.install_dir(), &CancellationToken::new())
        .await?;

    let Resolution::Remediation(remediation) = resolution else {
        panic!("expected remediation, got {resolution:?}");
    };
    assert_eq!(remediation.distribution, "raspbian");
    assert!(
        remediation
            .packages
            .iter()
            .all(|p| p.arch.is_none() || p.arch == Some(CpuArch::Arm))
    );
    assert_eq!(remediation.install_hints().len(), 1);
    Ok(())
}

#[test]
fn test_packages_command_lists_release() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = utils::run_vlcfetch_command(&env, &["packages", "ubuntu", "--release", "18.04"])?;
    assert_eq!(output.exit_code, 0, "packages failed: {}", output.stderr);

    let packages: Vec<String> = output
        .events()
        .iter()
        .filter(|e| e["code"] == "vlcfetch.package")
        .filter_map(|e| e["data"]["package"].as_str().map(str::to_string))
        .collect();
    assert_eq!(packages, vec!["libvlc-dev", "libvlccore9", "vlc-plugin-base"]);
    Ok(())
}

#[test]
fn test_packages_command_ignores_host_release_for_other_distro() -> Result<()> {
    let env = TestEnvironment::new()?;
    for distro in ["debian", "centos"] {
        let output = utils::run_vlcfetch_command(&env, &["packages", distro])?;
        assert_eq!(output.exit_code, 0, "packages {distro} failed: {}", output.stderr);

        let events = output.events();
        let summary = events
            .iter()
            .find(|e| e["code"] == "vlcfetch.packages")
            .expect("summary event");
        assert_eq!(summary["data"]["distribution"], distro);
        assert_eq!(summary["data"]["release"], "LATEST");
    }
    Ok(())
}

#[test]
fn test_packages_command_unknown_distribution() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = utils::run_vlcfetch_command(&env, &["packages", "plan9"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.has_event("vlcfetch.error"));
    assert!(output.stderr.contains("Unknown Linux distribution"));
    Ok(())
}

#[test]
fn test_discover_command_empty_directory() -> Result<()> {
    let env = TestEnvironment::new()?;
    fs::create_dir_all(env.install_dir())?;
    let dir = env.install_dir();
    let output = utils::run_vlcfetch_command(&env, &["discover", dir.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "discover failed: {}", output.stderr);
    assert!(output.has_event("vlcfetch.discover.missing"));
    Ok(())
}

#[test]
fn test_malformed_catalog_is_fatal() -> Result<()> {
    let env = TestEnvironment::new()?;
    let catalog_dir = env.path().join("catalog");
    fs::create_dir_all(&catalog_dir)?;
    fs::write(
        catalog_dir.join("linux-package-installation.json"),
        r#"{"ubuntu": [{"manager": "apt"}]}"#,
    )?;
    env.write_config(&format!(
        "use_system_paths = false\ncatalog_dir = {:?}\n",
        catalog_dir.display().to_string()
    ))?;

    let output = utils::run_vlcfetch_command(&env, &["packages", "ubuntu"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Malformed package catalog"));
    Ok(())
}
