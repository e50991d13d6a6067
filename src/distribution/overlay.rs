// ─── Typed overlay ───
// Wraps the raw document with everything the repair pipeline needs:
// per-module on-disk resolution and Maven components, computed once at
// wrap time so the walk never re-parses identifiers.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::maven::MavenComponents;

use super::model::{ModuleType, RawDistribution, RawModule, RawServer};

/// The loaded distribution with resolved module trees.
#[derive(Debug, Clone)]
pub struct DistributionIndex {
    pub raw: RawDistribution,
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Clone)]
pub struct ServerEntry {
    pub raw: RawServer,
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub raw: RawModule,
    /// Absolute on-disk location of the artifact.
    pub resolved_path: PathBuf,
    /// Present when the module id parsed as a Maven identifier.
    pub maven: Option<MavenComponents>,
    pub sub_modules: Vec<ModuleEntry>,
}

impl DistributionIndex {
    /// Wrap a raw document, resolving every module against the common and
    /// per-instance base directories.
    pub fn wrap(
        raw: RawDistribution,
        common_dir: &Path,
        instance_dir: &Path,
    ) -> CoreResult<Self> {
        let servers = raw
            .servers
            .iter()
            .map(|server| {
                let modules = server
                    .modules
                    .iter()
                    .map(|module| ModuleEntry::resolve(module, common_dir, instance_dir, &server.id))
                    .collect::<CoreResult<Vec<_>>>()?;
                Ok(ServerEntry {
                    raw: server.clone(),
                    modules,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self { raw, servers })
    }

    pub fn server(&self, id: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.raw.id == id)
    }

    /// The server flagged `mainServer`, falling back to the first entry.
    pub fn main_server(&self) -> Option<&ServerEntry> {
        self.servers
            .iter()
            .find(|s| s.raw.main_server)
            .or_else(|| self.servers.first())
    }
}

impl ServerEntry {
    /// The server's mod-loader module. At most one exists per server.
    pub fn mod_loader(&self) -> Option<&ModuleEntry> {
        self.modules
            .iter()
            .find(|m| m.raw.module_type.is_mod_loader())
    }

    /// Semver range from `javaOptions.supported`, when present and valid.
    pub fn java_range(&self) -> Option<semver::VersionReq> {
        let supported = self.raw.java_options.as_ref()?.supported.as_deref()?;
        semver::VersionReq::parse(supported).ok()
    }

    /// Major version to acquire when nothing installed matches.
    pub fn suggested_java_major(&self) -> u64 {
        self.raw
            .java_options
            .as_ref()
            .and_then(|o| o.suggested_major)
            .unwrap_or(17)
    }
}

impl ModuleEntry {
    fn resolve(
        raw: &RawModule,
        common_dir: &Path,
        instance_dir: &Path,
        server_id: &str,
    ) -> CoreResult<Self> {
        let maven = match raw.artifact.path {
            // An explicit path short-circuits Maven parsing, but an id
            // that happens to be a coordinate still yields components.
            Some(_) => MavenComponents::parse(&raw.id).ok(),
            None => Some(MavenComponents::parse(&raw.id).map_err(|_| {
                CoreError::InvalidMavenCoordinate(format!(
                    "module {} has neither an artifact path nor a Maven id",
                    raw.id
                ))
            })?),
        };

        let base = Self::base_dir(raw.module_type, common_dir, instance_dir, server_id);
        let resolved_path = match (&raw.artifact.path, &maven) {
            (Some(explicit), _) => base.join(explicit),
            (None, Some(components)) => match raw.module_type {
                // Version manifests live under their own version folder.
                ModuleType::VersionManifest => base
                    .join(&components.version)
                    .join(components.filename()),
                _ => base.join(components.repo_path()),
            },
            (None, None) => unreachable!("checked above"),
        };

        let sub_modules = raw
            .sub_modules
            .iter()
            .map(|sub| Self::resolve(sub, common_dir, instance_dir, server_id))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            raw: raw.clone(),
            resolved_path,
            maven,
            sub_modules,
        })
    }

    fn base_dir(
        module_type: ModuleType,
        common_dir: &Path,
        instance_dir: &Path,
        server_id: &str,
    ) -> PathBuf {
        match module_type {
            ModuleType::Library
            | ModuleType::Forge
            | ModuleType::ForgeHosted
            | ModuleType::Fabric => common_dir.join("libraries"),
            ModuleType::ForgeMod | ModuleType::FabricMod => common_dir.join("modstore"),
            ModuleType::File => instance_dir.join(server_id),
            ModuleType::VersionManifest => common_dir.join("versions"),
        }
    }

    /// Depth-first walk over this module and its sub-tree.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ModuleEntry)) {
        visit(self);
        for sub in &self.sub_modules {
            sub.walk(visit);
        }
    }
}
