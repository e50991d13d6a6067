// ─── JVM discovery ───
// A discoverer yields candidate installation roots; platform selection
// builds a flat list of variants rather than a type hierarchy. Roots are
// deduplicated by the caller before probing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

const ENV_CANDIDATES: [&str; 3] = ["JAVA_HOME", "JRE_HOME", "JDK_HOME"];

/// One strategy for locating JVM installation roots.
#[derive(Debug, Clone)]
pub enum JvmDiscoverer {
    /// Read installation roots from well-known environment variables.
    Environment,
    /// Treat each direct child of the seed directories as a candidate.
    Directory { roots: Vec<PathBuf> },
    /// Treat each seed itself as a candidate.
    Path { candidates: Vec<PathBuf> },
    /// Scan `HKLM\SOFTWARE\JavaSoft` on the 64-bit registry view.
    #[cfg(windows)]
    Registry,
}

impl JvmDiscoverer {
    /// Candidate installation roots, deduplicated.
    pub async fn discover(&self) -> HashSet<PathBuf> {
        match self {
            JvmDiscoverer::Environment => discover_environment(),
            JvmDiscoverer::Directory { roots } => discover_directories(roots).await,
            JvmDiscoverer::Path { candidates } => candidates
                .iter()
                .filter(|root| java_exec_from_root(root).exists())
                .cloned()
                .collect(),
            #[cfg(windows)]
            JvmDiscoverer::Registry => registry::discover_registry().await,
        }
    }
}

/// OS-specific Java executable below an installation root.
pub fn java_exec_from_root(root: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        root.join("bin").join("javaw.exe")
    } else if cfg!(target_os = "macos") {
        root.join("Contents").join("Home").join("bin").join("java")
    } else {
        root.join("bin").join("java")
    }
}

fn discover_environment() -> HashSet<PathBuf> {
    let mut found = HashSet::new();
    for var in ENV_CANDIDATES {
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        let root = strip_to_root(Path::new(&value));
        if root.is_dir() {
            debug!("{} -> {:?}", var, root);
            found.insert(root);
        }
    }
    found
}

/// Reduce an environment value to the installation root: strip
/// `Contents/Home` on macOS and a trailing `bin/java[.exe]` elsewhere.
fn strip_to_root(path: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        if path.ends_with("Contents/Home") {
            if let Some(root) = path.parent().and_then(Path::parent) {
                return root.to_path_buf();
            }
        }
        return path.to_path_buf();
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if matches!(file_name, "java" | "java.exe" | "javaw.exe") {
        if let Some(root) = path.parent().and_then(Path::parent) {
            if root.file_name().is_some() {
                return root.to_path_buf();
            }
        }
    }
    path.to_path_buf()
}

async fn discover_directories(roots: &[PathBuf]) -> HashSet<PathBuf> {
    let mut found = HashSet::new();
    for root in roots {
        let Ok(mut entries) = tokio::fs::read_dir(root).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let candidate = entry.path();
            if java_exec_from_root(&candidate).exists() {
                found.insert(candidate);
            }
        }
    }
    found
}

/// Per-platform discoverer set.
///
/// `runtime_dir` is the launcher-managed directory where acquired JDKs
/// are extracted; it is scanned on every platform.
pub async fn platform_discoverers(runtime_dir: &Path) -> Vec<JvmDiscoverer> {
    #[cfg(target_os = "windows")]
    return windows_discoverers(runtime_dir).await;

    #[cfg(target_os = "macos")]
    return vec![
        JvmDiscoverer::Environment,
        JvmDiscoverer::Directory {
            roots: vec![
                PathBuf::from("/Library/Java/JavaVirtualMachines"),
                runtime_dir.to_path_buf(),
            ],
        },
        JvmDiscoverer::Path {
            candidates: vec![PathBuf::from(
                "/Library/Internet Plug-Ins/JavaAppletPlugin.plugin",
            )],
        },
    ];

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    return vec![
        JvmDiscoverer::Environment,
        JvmDiscoverer::Directory {
            roots: vec![PathBuf::from("/usr/lib/jvm"), runtime_dir.to_path_buf()],
        },
    ];
}

#[cfg(target_os = "windows")]
async fn windows_discoverers(runtime_dir: &Path) -> Vec<JvmDiscoverer> {
    let mut roots = Vec::new();
    for drive in enumerate_drive_roots().await {
        for vendor_dir in [
            "Program Files\\Java",
            "Program Files\\Eclipse Adoptium",
            "Program Files\\Eclipse Foundation",
            "Program Files\\AdoptOpenJDK",
            "Program Files\\Amazon Corretto",
        ] {
            roots.push(drive.join(vendor_dir));
        }
    }
    roots.push(runtime_dir.to_path_buf());

    vec![
        JvmDiscoverer::Environment,
        JvmDiscoverer::Directory { roots },
        JvmDiscoverer::Registry,
    ]
}

/// Union of every discoverer's results.
pub async fn discover_all(discoverers: &[JvmDiscoverer]) -> HashSet<PathBuf> {
    let mut union = HashSet::new();
    for discoverer in discoverers {
        union.extend(discoverer.discover().await);
    }
    debug!("Discovered {} candidate JVM roots", union.len());
    union
}

/// Filesystem drive roots, via PowerShell's drive provider.
#[cfg(target_os = "windows")]
async fn enumerate_drive_roots() -> Vec<PathBuf> {
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct DriveEntry {
        root: String,
    }

    let output = tokio::process::Command::new("powershell")
        .args([
            "-NoProfile",
            "-Command",
            "Get-PSDrive -PSProvider FileSystem | Select-Object Root | ConvertTo-Json",
        ])
        .output()
        .await;

    let Ok(output) = output else {
        tracing::warn!("Drive enumeration failed to launch; defaulting to C:\\");
        return vec![PathBuf::from("C:\\")];
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    // ConvertTo-Json emits a bare object for a single drive.
    let drives: Vec<DriveEntry> = serde_json::from_str(&stdout)
        .or_else(|_| serde_json::from_str::<DriveEntry>(&stdout).map(|d| vec![d]))
        .unwrap_or_default();

    if drives.is_empty() {
        return vec![PathBuf::from("C:\\")];
    }
    drives.into_iter().map(|d| PathBuf::from(d.root)).collect()
}

#[cfg(windows)]
mod registry {
    use super::*;
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_64KEY};
    use winreg::RegKey;

    const JAVASOFT_KEYS: [&str; 4] = [
        "SOFTWARE\\JavaSoft\\Java Runtime Environment",
        "SOFTWARE\\JavaSoft\\Java Development Kit",
        "SOFTWARE\\JavaSoft\\JRE",
        "SOFTWARE\\JavaSoft\\JDK",
    ];

    pub(super) async fn discover_registry() -> HashSet<PathBuf> {
        // winreg is synchronous; the scan is a handful of key reads.
        tokio::task::spawn_blocking(scan).await.unwrap_or_default()
    }

    fn scan() -> HashSet<PathBuf> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let mut found = HashSet::new();

        for key_path in JAVASOFT_KEYS {
            let Ok(key) = hklm.open_subkey_with_flags(key_path, KEY_READ | KEY_WOW64_64KEY)
            else {
                continue;
            };

            for subkey_name in key.enum_keys().flatten() {
                if !is_version_key(&subkey_name) {
                    continue;
                }
                let Ok(version_key) =
                    key.open_subkey_with_flags(&subkey_name, KEY_READ | KEY_WOW64_64KEY)
                else {
                    continue;
                };
                let Ok(java_home) = version_key.get_value::<String, _>("JavaHome") else {
                    continue;
                };
                // 32-bit installs advertise themselves via the path.
                if java_home.contains("(x86)") {
                    continue;
                }
                found.insert(PathBuf::from(java_home));
            }
        }

        found
    }

    /// Versioned subkeys come as full versions (`1.8.0_301`, `17.0.5`)
    /// or abbreviated majors (`1.8`, `17`).
    fn is_version_key(name: &str) -> bool {
        if crate::java::version::JavaVersion::parse(name).is_some() {
            return true;
        }
        if let Some(minor) = name.strip_prefix("1.") {
            return minor.parse::<u64>().is_ok();
        }
        name.parse::<u64>().map(|n| n >= 2).unwrap_or(false)
    }
}
