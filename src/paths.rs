// ─── Launcher directories ───
// Default locations for callers that don't supply their own. Everything
// hangs off the platform data directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const APP_DIR_NAME: &str = "NebulaLauncher";

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Launcher data root, e.g. `~/.local/share/NebulaLauncher`.
pub fn default_data_dir() -> &'static Path {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    })
}

/// Where the distribution document and its dev override are cached.
pub fn default_launcher_dir() -> PathBuf {
    default_data_dir().to_path_buf()
}

/// Shared artifact store: libraries, modstore, versions.
pub fn default_common_dir() -> PathBuf {
    default_data_dir().join("common")
}

/// Per-server file roots.
pub fn default_instance_dir() -> PathBuf {
    default_data_dir().join("instances")
}
