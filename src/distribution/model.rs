// ─── Distribution document ───
// Raw serde overlay of the remote distribution JSON: servers, their
// recursively nested modules, and per-module artifacts.

use serde::{Deserialize, Serialize};

/// Root document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDistribution {
    #[serde(default)]
    pub rss: Option<String>,
    #[serde(default)]
    pub discord: Option<DiscordSettings>,
    pub version: String,
    pub servers: Vec<RawServer>,
}

/// Rich-presence wiring forwarded to the frontend untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordSettings {
    pub client_id: String,
    #[serde(default)]
    pub small_image_text: Option<String>,
    #[serde(default)]
    pub small_image_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub minecraft_version: String,
    #[serde(default)]
    pub main_server: bool,
    #[serde(default)]
    pub autoconnect: bool,
    #[serde(default)]
    pub java_options: Option<JavaOptions>,
    #[serde(default)]
    pub modules: Vec<RawModule>,
}

/// Per-server JVM constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaOptions {
    /// Semver range the server supports, e.g. `">=17.x"`.
    #[serde(default)]
    pub supported: Option<String>,
    #[serde(default)]
    pub suggested_major: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
    ForgeHosted,
    Forge,
    Fabric,
    Library,
    ForgeMod,
    FabricMod,
    File,
    VersionManifest,
}

impl ModuleType {
    /// Whether this module supplies the mod-loader runtime.
    pub fn is_mod_loader(&self) -> bool {
        matches!(
            self,
            ModuleType::ForgeHosted | ModuleType::Forge | ModuleType::Fabric
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModule {
    /// Explicit artifact path, or a Maven identifier.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    pub artifact: RawArtifact,
    #[serde(default)]
    pub sub_modules: Vec<RawModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArtifact {
    #[serde(rename = "MD5")]
    pub md5: String,
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub path: Option<String>,
}
