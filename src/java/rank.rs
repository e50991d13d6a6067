// ─── Filtering and ranking ───
// Discovered roots are probed for their property dump, filtered against
// the host architecture and the caller's semver range, then ordered
// best-first. Selection is just "first of the ranked list".

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use semver::VersionReq;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::discover::{discover_all, java_exec_from_root, platform_discoverers};
use super::settings::{extract_settings, HotSpotSettings};
use super::version::JavaVersion;

/// A validated JVM installation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JvmDetails {
    pub semver: JavaVersion,
    pub semver_str: String,
    pub vendor: String,
    /// Root directory of the installation, not the executable.
    pub path: PathBuf,
}

/// Build details for one root iff its settings pass the filter policy:
/// 64-bit data model, native architecture on ARM64 hosts, and a version
/// inside `range`.
pub fn filter_details(
    root: &Path,
    settings: &HotSpotSettings,
    range: &VersionReq,
) -> Option<JvmDetails> {
    if settings.arch_data_model() != "64" {
        debug!("Rejecting {:?}: not a 64-bit JVM", root);
        return None;
    }

    // Rosetta-translated x64 JVMs report os.arch=x86_64 on Apple Silicon.
    if cfg!(target_arch = "aarch64") && settings.os_arch() != Some("aarch64") {
        debug!("Rejecting {:?}: non-native on an ARM64 host", root);
        return None;
    }

    let version_str = settings.java_version()?;
    let semver = JavaVersion::parse(version_str)?;
    if !semver.satisfies(range) {
        debug!("Rejecting {:?}: {} outside {}", root, semver, range);
        return None;
    }

    Some(JvmDetails {
        semver,
        semver_str: version_str.to_string(),
        vendor: settings.java_vendor().unwrap_or("unknown").to_string(),
        path: root.to_path_buf(),
    })
}

/// Order candidates best-first: higher (major, minor, patch), and on a
/// full tie prefer paths that look like a JDK over a bare JRE.
pub fn rank_details(mut details: Vec<JvmDetails>) -> Vec<JvmDetails> {
    details.sort_by(|a, b| {
        b.semver
            .cmp(&a.semver)
            .then_with(|| path_mentions_jdk(&b.path).cmp(&path_mentions_jdk(&a.path)))
    });
    details
}

fn path_mentions_jdk(path: &Path) -> bool {
    path.to_string_lossy().to_ascii_lowercase().contains("jdk")
}

/// Discover, probe, filter, rank, and return the best installation.
pub async fn select_best(range: &VersionReq, runtime_dir: &Path) -> Option<JvmDetails> {
    let discoverers = platform_discoverers(runtime_dir).await;
    let roots = discover_all(&discoverers).await;
    let best = probe_and_rank(roots, range).await.into_iter().next();

    match &best {
        Some(details) => info!(
            "Selected Java {} ({}) at {:?}",
            details.semver_str, details.vendor, details.path
        ),
        None => info!("No installed JVM satisfies {}", range),
    }
    best
}

/// Run the same pipeline over a single user-supplied root.
pub async fn validate_install(root: &Path, range: &VersionReq) -> Option<JvmDetails> {
    let mut singleton = HashSet::new();
    singleton.insert(root.to_path_buf());
    probe_and_rank(singleton, range).await.into_iter().next()
}

async fn probe_and_rank(roots: HashSet<PathBuf>, range: &VersionReq) -> Vec<JvmDetails> {
    let mut applicable = Vec::new();
    for root in roots {
        let exec = java_exec_from_root(&root);
        let Some(settings) = extract_settings(&exec).await else {
            continue;
        };
        if let Some(details) = filter_details(&root, &settings, range) {
            applicable.push(details);
        }
    }
    rank_details(applicable)
}
