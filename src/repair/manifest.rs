// ─── Mod-loader version manifest ───
// Fabric and ForgeGradle3+ Forge ship the manifest as a separately
// downloaded file; older Forge embeds it in the jar as `version.json`,
// which gets lifted out and persisted under the common versions tree.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::distribution::model::ModuleType;
use crate::distribution::overlay::{ModuleEntry, ServerEntry};
use crate::error::{CoreError, CoreResult};
use crate::java::version::mc_version_at_least;

/// Last Forge version built with ForgeGradle 2.
const LAST_FG2_COMPONENTS: [u64; 4] = [14, 23, 5, 2847];

/// Whether this Forge build keeps its manifest outside the jar.
///
/// True from Minecraft 1.13 onward, and for late 1.12.2 builds whose
/// Forge component exceeds `14.23.5.2847` component-wise.
pub fn uses_separate_manifest(mc_version: &str, forge_version: &str) -> bool {
    if mc_version_at_least("1.13", mc_version) {
        return true;
    }
    forge_component_exceeds_fg2(forge_version)
}

/// The Forge component is the portion after the Minecraft prefix:
/// `1.12.2-14.23.5.2854` → `14.23.5.2854`.
fn forge_component_exceeds_fg2(forge_version: &str) -> bool {
    let component = forge_version
        .rsplit('-')
        .next()
        .unwrap_or(forge_version);

    let parts: Vec<u64> = component
        .split('.')
        .map(|p| p.parse().unwrap_or(0))
        .collect();

    for (i, &floor) in LAST_FG2_COMPONENTS.iter().enumerate() {
        let actual = parts.get(i).copied().unwrap_or(0);
        if actual != floor {
            return actual > floor;
        }
    }
    false
}

/// Materialize the server's mod-loader version manifest.
///
/// Runs strictly after the download engine has satisfied the module
/// tree, so every referenced file is present and hash-clean.
pub async fn materialize(server: &ServerEntry, common_dir: &Path) -> CoreResult<Value> {
    let loader = server
        .mod_loader()
        .ok_or_else(|| CoreError::NoModLoader(server.raw.id.clone()))?;

    let separate = match loader.raw.module_type {
        ModuleType::Fabric => true,
        _ => {
            let forge_version = loader
                .maven
                .as_ref()
                .map(|m| m.version.as_str())
                .unwrap_or("");
            uses_separate_manifest(&server.raw.minecraft_version, forge_version)
        }
    };

    if separate {
        read_manifest_module(server, loader).await
    } else {
        lift_from_jar(server, loader, common_dir).await
    }
}

/// Read the separately downloaded `VersionManifest` sub-module file.
async fn read_manifest_module(server: &ServerEntry, loader: &ModuleEntry) -> CoreResult<Value> {
    let manifest_module = loader
        .sub_modules
        .iter()
        .find(|m| m.raw.module_type == ModuleType::VersionManifest)
        .ok_or_else(|| CoreError::NoVersionManifest(server.raw.id.clone()))?;

    debug!("Reading manifest from {:?}", manifest_module.resolved_path);
    let text = tokio::fs::read_to_string(&manifest_module.resolved_path)
        .await
        .map_err(|e| CoreError::io(&manifest_module.resolved_path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Open the Forge jar, read the embedded `version.json`, and persist it
/// at `<commonDir>/versions/<id>/<id>.json`.
async fn lift_from_jar(
    server: &ServerEntry,
    loader: &ModuleEntry,
    common_dir: &Path,
) -> CoreResult<Value> {
    let jar_bytes = tokio::fs::read(&loader.resolved_path)
        .await
        .map_err(|e| CoreError::io(&loader.resolved_path, e))?;

    let cursor = std::io::Cursor::new(&jar_bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let manifest: Value = {
        let entry = archive
            .by_name("version.json")
            .map_err(|_| CoreError::NoVersionManifest(server.raw.id.clone()))?;
        serde_json::from_reader(entry)?
    };

    let id = manifest
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::NoVersionManifest(server.raw.id.clone()))?;

    let version_dir = common_dir.join("versions").join(id);
    tokio::fs::create_dir_all(&version_dir)
        .await
        .map_err(|e| CoreError::io(&version_dir, e))?;

    let manifest_path = version_dir.join(format!("{}.json", id));
    tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
        .await
        .map_err(|e| CoreError::io(&manifest_path, e))?;

    info!("Lifted {} manifest to {:?}", id, manifest_path);
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::model::{
        ModuleType, RawArtifact, RawDistribution, RawModule, RawServer,
    };
    use crate::distribution::DistributionIndex;
    use std::io::Write;

    #[test]
    fn forgegradle3_detection() {
        assert!(!uses_separate_manifest("1.12.2", "1.12.2-14.23.5.2847"));
        assert!(uses_separate_manifest("1.12.2", "1.12.2-14.23.5.2848"));
        assert!(uses_separate_manifest("1.13", "1.13-25.0.9"));
        assert!(uses_separate_manifest("1.16.5", "1.16.5-36.2.39"));
        assert!(!uses_separate_manifest("1.12.2", "1.12.2-14.23.0.2500"));
    }

    fn artifact(content_hash: &str, path: Option<&str>) -> RawArtifact {
        RawArtifact {
            md5: content_hash.into(),
            size: 0,
            url: "https://example.com/a".into(),
            path: path.map(str::to_string),
        }
    }

    fn wrap_server(
        mc_version: &str,
        modules: Vec<RawModule>,
        common: &Path,
        instance: &Path,
    ) -> DistributionIndex {
        DistributionIndex::wrap(
            RawDistribution {
                rss: None,
                discord: None,
                version: "1.0.0".into(),
                servers: vec![RawServer {
                    id: "main".into(),
                    name: "Main".into(),
                    description: None,
                    icon: None,
                    address: None,
                    minecraft_version: mc_version.into(),
                    main_server: true,
                    autoconnect: false,
                    java_options: None,
                    modules,
                }],
            },
            common,
            instance,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_loader_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = wrap_server("1.20.4", Vec::new(), dir.path(), dir.path());
        let err = materialize(&index.servers[0], dir.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::NoModLoader(_)));
    }

    #[tokio::test]
    async fn fabric_reads_the_manifest_submodule() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");

        let loader = RawModule {
            id: "net.fabricmc:fabric-loader:0.16.10".into(),
            name: "Fabric".into(),
            module_type: ModuleType::Fabric,
            artifact: artifact("00", None),
            sub_modules: vec![RawModule {
                id: "fabric-1.21".into(),
                name: "Manifest".into(),
                module_type: ModuleType::VersionManifest,
                artifact: artifact("00", Some("fabric-1.21/fabric-1.21.json")),
                sub_modules: Vec::new(),
            }],
        };

        let index = wrap_server("1.21", vec![loader], &common, dir.path());
        let manifest_path = &index.servers[0].modules[0].sub_modules[0].resolved_path;
        tokio::fs::create_dir_all(manifest_path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(manifest_path, r#"{"id":"fabric-1.21","mainClass":"net.fabricmc.Knot"}"#)
            .await
            .unwrap();

        let manifest = materialize(&index.servers[0], &common).await.unwrap();
        assert_eq!(manifest["mainClass"], "net.fabricmc.Knot");
    }

    #[tokio::test]
    async fn fg2_forge_lifts_version_json_from_the_jar() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");

        let loader = RawModule {
            id: "net.minecraftforge:forge:1.12.2-14.23.5.2847".into(),
            name: "Forge".into(),
            module_type: ModuleType::ForgeHosted,
            artifact: artifact("00", None),
            sub_modules: Vec::new(),
        };

        let index = wrap_server("1.12.2", vec![loader], &common, dir.path());
        let jar_path = &index.servers[0].modules[0].resolved_path;
        tokio::fs::create_dir_all(jar_path.parent().unwrap())
            .await
            .unwrap();

        {
            let file = std::fs::File::create(jar_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("version.json", options).unwrap();
            writer
                .write_all(br#"{"id":"1.12.2-forge-14.23.5.2847","mainClass":"net.minecraft.launchwrapper.Launch"}"#)
                .unwrap();
            writer.finish().unwrap();
        }

        let manifest = materialize(&index.servers[0], &common).await.unwrap();
        assert_eq!(manifest["id"], "1.12.2-forge-14.23.5.2847");

        let persisted = common
            .join("versions")
            .join("1.12.2-forge-14.23.5.2847")
            .join("1.12.2-forge-14.23.5.2847.json");
        assert!(persisted.is_file());
    }

    #[tokio::test]
    async fn missing_jar_entry_reports_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");

        let loader = RawModule {
            id: "net.minecraftforge:forge:1.12.2-14.23.5.2847".into(),
            name: "Forge".into(),
            module_type: ModuleType::ForgeHosted,
            artifact: artifact("00", None),
            sub_modules: Vec::new(),
        };

        let index = wrap_server("1.12.2", vec![loader], &common, dir.path());
        let jar_path = &index.servers[0].modules[0].resolved_path;
        tokio::fs::create_dir_all(jar_path.parent().unwrap())
            .await
            .unwrap();
        {
            let file = std::fs::File::create(jar_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
            writer.finish().unwrap();
        }

        let err = materialize(&index.servers[0], &common).await.unwrap_err();
        assert!(matches!(err, CoreError::NoVersionManifest(_)));
    }
}
