// ─── JDK acquisition ───
// When no installed JVM satisfies a server's range, a vendor archive is
// resolved to an Asset for the download engine and extracted next to
// where it lands. Temurin publishes a SHA-256 per asset; Corretto only
// an MD5 at a sibling URL, with the size taken from a HEAD probe.

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::download::Asset;
use crate::error::{CoreError, CoreResult};
use crate::util::archive::extract_archive;
use crate::util::hash::HashAlgo;

use super::discover::java_exec_from_root;

const ADOPTIUM_API: &str = "https://api.adoptium.net/v3/assets/latest";
const CORRETTO_BASE: &str = "https://corretto.aws/downloads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JdkDistribution {
    Temurin,
    Corretto,
}

impl JdkDistribution {
    /// Caller preference wins; otherwise macOS gets Corretto and every
    /// other platform Temurin.
    pub fn resolve(preference: Option<JdkDistribution>) -> JdkDistribution {
        preference.unwrap_or({
            if cfg!(target_os = "macos") {
                JdkDistribution::Corretto
            } else {
                JdkDistribution::Temurin
            }
        })
    }

    pub fn from_name(name: &str) -> CoreResult<JdkDistribution> {
        match name.to_ascii_lowercase().as_str() {
            "temurin" => Ok(JdkDistribution::Temurin),
            "corretto" => Ok(JdkDistribution::Corretto),
            other => Err(CoreError::UnknownDistribution(other.to_string())),
        }
    }
}

/// Resolve the archive Asset for `major` from the selected vendor.
pub async fn latest_jdk_asset(
    client: &Client,
    distribution: JdkDistribution,
    major: u64,
    data_dir: &Path,
) -> CoreResult<Asset> {
    match distribution {
        JdkDistribution::Temurin => latest_temurin_asset(client, major, data_dir).await,
        JdkDistribution::Corretto => latest_corretto_asset(client, major, data_dir).await,
    }
}

// ── Temurin ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TemurinEntry {
    binary: TemurinBinary,
    version: TemurinVersion,
}

#[derive(Debug, Deserialize)]
struct TemurinVersion {
    major: u64,
}

#[derive(Debug, Deserialize)]
struct TemurinBinary {
    os: String,
    architecture: String,
    image_type: String,
    package: TemurinPackage,
}

#[derive(Debug, Deserialize)]
struct TemurinPackage {
    link: String,
    name: String,
    size: u64,
    checksum: String,
}

async fn latest_temurin_asset(client: &Client, major: u64, data_dir: &Path) -> CoreResult<Asset> {
    let url = format!("{}/{}/hotspot?vendor=eclipse", ADOPTIUM_API, major);
    info!("Resolving Temurin {} from {}", major, url);

    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(CoreError::JdkAcquisitionFailed(format!(
            "Adoptium API returned HTTP {}",
            resp.status()
        )));
    }
    let entries: Vec<TemurinEntry> = resp.json().await?;

    let os = adoptium_os();
    let arch = vendor_arch();
    let entry = entries
        .into_iter()
        .find(|e| {
            e.version.major == major
                && e.binary.os == os
                && e.binary.image_type == "jdk"
                && e.binary.architecture == arch
        })
        .ok_or_else(|| {
            CoreError::JdkAcquisitionFailed(format!(
                "no Temurin {} jdk build for {}/{}",
                major, os, arch
            ))
        })?;

    let package = entry.binary.package;
    debug!("Temurin asset: {} ({} bytes)", package.name, package.size);

    Ok(Asset {
        id: package.name.clone(),
        url: package.link,
        size: package.size,
        hash: package.checksum,
        algo: HashAlgo::Sha256,
        path: runtime_dir(data_dir).join(package.name),
    })
}

// ── Corretto ────────────────────────────────────────────

async fn latest_corretto_asset(client: &Client, major: u64, data_dir: &Path) -> CoreResult<Asset> {
    let os = corretto_os();
    let arch = vendor_arch();
    let ext = if cfg!(target_os = "windows") {
        "zip"
    } else {
        "tar.gz"
    };

    let file = format!("amazon-corretto-{}-{}-{}-jdk.{}", major, arch, os, ext);
    let download_url = format!("{}/latest/{}", CORRETTO_BASE, file);
    let checksum_url = format!("{}/latest_checksum/{}", CORRETTO_BASE, file);
    info!("Resolving Corretto {} from {}", major, download_url);

    // Size comes from a HEAD probe; zero means the header was absent and
    // the asset is treated as opaque.
    let head = client.head(&download_url).send().await?;
    if !head.status().is_success() {
        return Err(CoreError::JdkAcquisitionFailed(format!(
            "Corretto HEAD returned HTTP {}",
            head.status()
        )));
    }
    let size = head.content_length().unwrap_or(0);

    let checksum_resp = client.get(&checksum_url).send().await?;
    if !checksum_resp.status().is_success() {
        return Err(CoreError::JdkAcquisitionFailed(format!(
            "Corretto checksum returned HTTP {}",
            checksum_resp.status()
        )));
    }
    let md5 = checksum_resp.text().await?.trim().to_string();

    Ok(Asset {
        id: file.clone(),
        url: download_url,
        size,
        hash: md5,
        algo: HashAlgo::Md5,
        path: runtime_dir(data_dir).join(file),
    })
}

// ── Extraction ──────────────────────────────────────────

/// An extracted, ready-to-probe JDK.
#[derive(Debug, Clone)]
pub struct JdkInstall {
    /// Installation root (the archive's single top-level directory).
    pub root: PathBuf,
    pub executable: PathBuf,
}

/// Unpack a downloaded JDK archive into its parent directory and derive
/// the executable path. The archive itself is removed on success.
pub async fn extract_jdk(archive_path: &Path) -> CoreResult<JdkInstall> {
    let dest = archive_path
        .parent()
        .ok_or_else(|| {
            CoreError::JdkAcquisitionFailed(format!("archive has no parent: {:?}", archive_path))
        })?
        .to_path_buf();

    let archive = archive_path.to_path_buf();
    let root_name = tokio::task::spawn_blocking(move || extract_archive(&archive, &dest))
        .await
        .map_err(|e| CoreError::JdkAcquisitionFailed(e.to_string()))??
        .ok_or_else(|| CoreError::MalformedArchive {
            path: archive_path.to_path_buf(),
            reason: "archive is empty".into(),
        })?;

    let root = archive_path
        .parent()
        .expect("parent checked above")
        .join(root_name);
    let executable = java_exec_from_root(&root);
    info!("Extracted JDK to {:?}", root);

    let _ = tokio::fs::remove_file(archive_path).await;

    Ok(JdkInstall { root, executable })
}

// ── End-to-end provisioning ─────────────────────────────

/// Make sure a JVM satisfying `range` exists, acquiring one when none is
/// installed: resolve the vendor asset, download it, extract it, and
/// probe the result through the regular filter pipeline.
pub async fn ensure_jvm(
    client: &Client,
    range: &semver::VersionReq,
    suggested_major: u64,
    data_dir: &Path,
    preference: Option<JdkDistribution>,
) -> CoreResult<super::rank::JvmDetails> {
    let runtime = runtime_dir(data_dir);
    if let Some(best) = super::rank::select_best(range, &runtime).await {
        return Ok(best);
    }

    let distribution = JdkDistribution::resolve(preference);
    info!(
        "No installed JVM satisfies {}; acquiring {:?} {}",
        range, distribution, suggested_major
    );

    let asset = latest_jdk_asset(client, distribution, suggested_major, data_dir).await?;
    let engine = crate::download::DownloadEngine::new(client.clone());
    engine.download_all(std::slice::from_ref(&asset), |_| {}).await?;

    let install = extract_jdk(&asset.path).await?;
    super::rank::validate_install(&install.root, range)
        .await
        .ok_or_else(|| CoreError::JavaNotFound(range.to_string()))
}

// ── Host mapping ────────────────────────────────────────

/// Directory under `<dataDir>` where acquired runtimes land, keyed by
/// the host architecture label.
pub fn runtime_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("runtime").join(host_arch_label())
}

fn host_arch_label() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "x64"
    }
}

fn vendor_arch() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else {
        "x64"
    }
}

fn adoptium_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "mac"
    } else {
        "linux"
    }
}

fn corretto_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else {
        "linux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_preference_is_honored() {
        assert_eq!(
            JdkDistribution::resolve(Some(JdkDistribution::Temurin)),
            JdkDistribution::Temurin
        );
        let default = JdkDistribution::resolve(None);
        if cfg!(target_os = "macos") {
            assert_eq!(default, JdkDistribution::Corretto);
        } else {
            assert_eq!(default, JdkDistribution::Temurin);
        }
    }

    #[test]
    fn distribution_names_parse() {
        assert_eq!(
            JdkDistribution::from_name("Temurin").unwrap(),
            JdkDistribution::Temurin
        );
        assert!(JdkDistribution::from_name("zulu").is_err());
    }

    #[test]
    fn temurin_entry_matching_shape() {
        let json = r#"[{
            "binary": {
                "os": "linux",
                "architecture": "x64",
                "image_type": "jdk",
                "package": {
                    "link": "https://example.com/jdk.tar.gz",
                    "name": "OpenJDK17U-jdk_x64_linux_hotspot_17.0.5_8.tar.gz",
                    "size": 191234567,
                    "checksum": "deadbeef"
                }
            },
            "version": { "major": 17 }
        }]"#;
        let entries: Vec<TemurinEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].version.major, 17);
        assert_eq!(entries[0].binary.package.size, 191234567);
    }

    #[tokio::test]
    async fn extract_jdk_finds_root_and_executable() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime_dir(dir.path());
        tokio::fs::create_dir_all(&runtime).await.unwrap();
        let archive_path = runtime.join("jdk-17.zip");

        {
            use std::io::Write;
            let file = std::fs::File::create(&archive_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            let exec_rel = if cfg!(target_os = "windows") {
                "jdk-17.0.5+8/bin/javaw.exe"
            } else if cfg!(target_os = "macos") {
                "jdk-17.0.5+8/Contents/Home/bin/java"
            } else {
                "jdk-17.0.5+8/bin/java"
            };
            writer.start_file(exec_rel, options).unwrap();
            writer.write_all(b"#!").unwrap();
            writer.finish().unwrap();
        }

        let install = extract_jdk(&archive_path).await.unwrap();
        assert_eq!(install.root, runtime.join("jdk-17.0.5+8"));
        assert!(install.executable.exists());
        // Archive is cleaned up after a successful unpack.
        assert!(!archive_path.exists());
    }
}
