// ─── Full repair ───
// Runs the processor list in declaration order, funnels the union of
// their asset reports through the download engine, then fires the
// post-download hooks. Every event goes to the worker channel; the
// caller sees one terminal Complete or Error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::distribution::DistributionApi;
use crate::download::{Asset, DownloadEngine};
use crate::error::CoreResult;
use crate::http::build_http_client;
use crate::worker::message::WorkerMessage;

use super::processor::{DistributionProcessor, IndexProcessor};

const STAGE_VALIDATE: &str = "validate";
const STAGE_DOWNLOAD: &str = "download";

/// Inputs handed to the worker by the transmitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSettings {
    pub common_dir: PathBuf,
    pub instance_dir: PathBuf,
    pub launcher_dir: PathBuf,
    pub distribution_url: String,
    #[serde(default)]
    pub dev_mode: bool,
    pub server_id: String,
}

pub struct FullRepair {
    settings: RepairSettings,
}

impl FullRepair {
    pub fn new(settings: RepairSettings) -> Self {
        Self { settings }
    }

    /// Run the whole pipeline, emitting progress over `tx`.
    ///
    /// Returns the materialized version manifest as the completion
    /// payload.
    pub async fn run(&self, tx: &UnboundedSender<WorkerMessage>) -> CoreResult<Value> {
        let settings = &self.settings;
        info!("Full repair for server {}", settings.server_id);

        let client = build_http_client()?;
        let mut api = DistributionApi::new(
            client.clone(),
            settings.distribution_url.as_str(),
            &settings.launcher_dir,
            &settings.common_dir,
            &settings.instance_dir,
            settings.dev_mode,
        );
        let index = api.get_distribution().await?;

        let mut processors: Vec<Box<dyn IndexProcessor>> = vec![Box::new(
            DistributionProcessor::new(index, settings.server_id.as_str(), &settings.common_dir),
        )];

        // Validation stages run in declaration order; stage k completes
        // before any event of stage k+1.
        let total_stages = processors.len();
        let mut assets: Vec<Asset> = Vec::new();
        for (stage, processor) in processors.iter_mut().enumerate() {
            processor.init().await?;
            let report = processor.validate().await?;
            for (_category, mut list) in report {
                assets.append(&mut list);
            }

            let stage_number = stage + 1;
            let _ = tx.send(WorkerMessage::Progress {
                stage_label: STAGE_VALIDATE.into(),
                received: stage_number as u64,
                total: total_stages as u64,
            });
            let _ = tx.send(WorkerMessage::StageComplete {
                stage_number,
                total_stages,
            });
        }

        let total_bytes = DownloadEngine::total_size(&assets);
        let _ = tx.send(WorkerMessage::Progress {
            stage_label: STAGE_DOWNLOAD.into(),
            received: 0,
            total: total_bytes,
        });

        let engine = DownloadEngine::new(client);
        let progress_tx = tx.clone();
        engine
            .download_all(&assets, move |cumulative| {
                let _ = progress_tx.send(WorkerMessage::Progress {
                    stage_label: STAGE_DOWNLOAD.into(),
                    received: cumulative,
                    total: total_bytes,
                });
            })
            .await?;

        // Post-download hooks run only after the engine reported success.
        let mut payload = Value::Null;
        for processor in processors.iter_mut() {
            if let Some(result) = processor.post_download().await? {
                payload = result;
            }
        }

        info!("Full repair complete for {}", settings.server_id);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::{hash_bytes, HashAlgo};
    use tokio::sync::mpsc;

    /// A dev-mode distribution whose single Fabric server is already
    /// fully present on disk, so the repair is a pure validation pass.
    async fn write_fixture(root: &std::path::Path) -> RepairSettings {
        let common = root.join("common");
        let instance = root.join("instances");
        let launcher = root.join("launcher");
        tokio::fs::create_dir_all(&launcher).await.unwrap();

        let loader_bytes = b"fabric loader jar";
        let manifest_text = r#"{"id":"fabric-1.21","mainClass":"net.fabricmc.Knot"}"#;

        let doc = serde_json::json!({
            "version": "1.0.0",
            "servers": [{
                "id": "main",
                "name": "Main",
                "minecraftVersion": "1.21",
                "mainServer": true,
                "modules": [{
                    "id": "net.fabricmc:fabric-loader:0.16.10",
                    "name": "Fabric",
                    "type": "Fabric",
                    "artifact": {
                        "MD5": hash_bytes(loader_bytes, HashAlgo::Md5),
                        "size": loader_bytes.len(),
                        "url": "https://example.com/loader.jar"
                    },
                    "subModules": [{
                        "id": "fabric-1.21",
                        "name": "Manifest",
                        "type": "VersionManifest",
                        "artifact": {
                            "MD5": hash_bytes(manifest_text.as_bytes(), HashAlgo::Md5),
                            "size": manifest_text.len(),
                            "url": "https://example.com/manifest.json",
                            "path": "fabric-1.21/fabric-1.21.json"
                        }
                    }]
                }]
            }]
        });
        tokio::fs::write(
            launcher.join("distribution_dev.json"),
            serde_json::to_vec(&doc).unwrap(),
        )
        .await
        .unwrap();

        // Lay the files down exactly where the overlay will resolve them.
        let loader_path = common
            .join("libraries/net/fabricmc/fabric-loader/0.16.10/fabric-loader-0.16.10.jar");
        tokio::fs::create_dir_all(loader_path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&loader_path, loader_bytes).await.unwrap();

        let manifest_path = common.join("versions/fabric-1.21/fabric-1.21.json");
        tokio::fs::create_dir_all(manifest_path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&manifest_path, manifest_text).await.unwrap();

        RepairSettings {
            common_dir: common,
            instance_dir: instance,
            launcher_dir: launcher,
            distribution_url: "http://127.0.0.1:1/unused.json".into(),
            dev_mode: true,
            server_id: "main".into(),
        }
    }

    #[tokio::test]
    async fn clean_tree_repairs_to_completion_with_ordered_stages() {
        let dir = tempfile::tempdir().unwrap();
        let settings = write_fixture(dir.path()).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let payload = FullRepair::new(settings).run(&tx).await.unwrap();
        assert_eq!(payload["mainClass"], "net.fabricmc.Knot");
        drop(tx);

        let mut events = Vec::new();
        while let Some(msg) = rx.recv().await {
            events.push(msg);
        }

        // validate progress → stage complete → download planning event.
        assert!(matches!(
            events[0],
            WorkerMessage::Progress { received: 1, total: 1, .. }
        ));
        assert!(matches!(
            events[1],
            WorkerMessage::StageComplete {
                stage_number: 1,
                total_stages: 1
            }
        ));
        assert!(matches!(
            events[2],
            WorkerMessage::Progress { received: 0, total: 0, .. }
        ));
    }

    #[tokio::test]
    async fn unknown_server_surfaces_as_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = write_fixture(dir.path()).await;
        settings.server_id = "ghost".into();

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = FullRepair::new(settings).run(&tx).await.unwrap_err();
        assert!(matches!(err, crate::error::CoreError::UnknownServerId(_)));
    }
}
