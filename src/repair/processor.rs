// ─── Index processors ───
// A processor validates one category of files and reports the subset
// that is missing or corrupt as Assets for the download engine. After
// the engine runs, `post_download` finishes any derived artifacts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::distribution::DistributionIndex;
use crate::download::Asset;
use crate::error::{CoreError, CoreResult};
use crate::util::hash::HashAlgo;

use super::manifest;

/// Category key used by the distribution processor.
pub const CATEGORY_DISTRIBUTION: &str = "distribution";

#[async_trait]
pub trait IndexProcessor: Send {
    /// Prepare any state the validation pass needs.
    async fn init(&mut self) -> CoreResult<()>;

    /// Produce the category → missing/corrupt Asset lists.
    async fn validate(&mut self) -> CoreResult<HashMap<String, Vec<Asset>>>;

    /// Runs strictly after the download engine reported success.
    async fn post_download(&mut self) -> CoreResult<Option<Value>>;
}

/// Validates one server's module tree against the distribution index.
pub struct DistributionProcessor {
    index: Arc<DistributionIndex>,
    server_id: String,
    common_dir: PathBuf,
}

impl DistributionProcessor {
    pub fn new(index: Arc<DistributionIndex>, server_id: impl Into<String>, common_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            server_id: server_id.into(),
            common_dir: common_dir.into(),
        }
    }
}

#[async_trait]
impl IndexProcessor for DistributionProcessor {
    async fn init(&mut self) -> CoreResult<()> {
        self.index
            .server(&self.server_id)
            .map(|_| ())
            .ok_or_else(|| CoreError::UnknownServerId(self.server_id.clone()))
    }

    async fn validate(&mut self) -> CoreResult<HashMap<String, Vec<Asset>>> {
        let server = self
            .index
            .server(&self.server_id)
            .ok_or_else(|| CoreError::UnknownServerId(self.server_id.clone()))?;

        // Depth-first over every module tree, collecting the full asset
        // candidates before probing the disk.
        let mut candidates = Vec::new();
        for module in &server.modules {
            module.walk(&mut |entry| {
                candidates.push(Asset {
                    id: entry.raw.id.clone(),
                    url: entry.raw.artifact.url.clone(),
                    size: entry.raw.artifact.size,
                    hash: entry.raw.artifact.md5.clone(),
                    algo: HashAlgo::Md5,
                    path: entry.resolved_path.clone(),
                });
            });
        }

        let mut stale = Vec::new();
        for asset in candidates {
            if !asset.is_valid_on_disk().await? {
                debug!("Stale: {} ({:?})", asset.id, asset.path);
                stale.push(asset);
            }
        }

        info!(
            "Distribution validation for {}: {} assets need repair",
            self.server_id,
            stale.len()
        );

        let mut by_category = HashMap::new();
        by_category.insert(CATEGORY_DISTRIBUTION.to_string(), stale);
        Ok(by_category)
    }

    async fn post_download(&mut self) -> CoreResult<Option<Value>> {
        let server = self
            .index
            .server(&self.server_id)
            .ok_or_else(|| CoreError::UnknownServerId(self.server_id.clone()))?;

        let manifest = manifest::materialize(server, &self.common_dir).await?;
        Ok(Some(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::model::{
        ModuleType, RawArtifact, RawDistribution, RawModule, RawServer,
    };
    use crate::util::hash::hash_bytes;
    use std::path::Path;

    fn fixture(common: &Path, instance: &Path, modules: Vec<RawModule>) -> Arc<DistributionIndex> {
        let raw = RawDistribution {
            rss: None,
            discord: None,
            version: "1.0.0".into(),
            servers: vec![RawServer {
                id: "main".into(),
                name: "Main".into(),
                description: None,
                icon: None,
                address: None,
                minecraft_version: "1.20.4".into(),
                main_server: true,
                autoconnect: false,
                java_options: None,
                modules,
            }],
        };
        Arc::new(DistributionIndex::wrap(raw, common, instance).unwrap())
    }

    fn library(id: &str, content: &[u8]) -> RawModule {
        RawModule {
            id: id.into(),
            name: id.into(),
            module_type: ModuleType::Library,
            artifact: RawArtifact {
                md5: hash_bytes(content, HashAlgo::Md5),
                size: content.len() as u64,
                url: format!("https://example.com/{}", id),
                path: None,
            },
            sub_modules: Vec::new(),
        }
    }

    #[tokio::test]
    async fn validation_reports_missing_then_nothing_once_written() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");
        let instance = dir.path().join("instances");

        let content = b"library bytes";
        let index = fixture(&common, &instance, vec![library("com.example:lib:1.0", content)]);
        let mut processor = DistributionProcessor::new(Arc::clone(&index), "main", &common);

        processor.init().await.unwrap();
        let report = processor.validate().await.unwrap();
        let stale = &report[CATEGORY_DISTRIBUTION];
        assert_eq!(stale.len(), 1);

        // Simulate the download engine satisfying the asset.
        let target = &stale[0];
        tokio::fs::create_dir_all(target.path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&target.path, content).await.unwrap();

        let report = processor.validate().await.unwrap();
        assert!(report[CATEGORY_DISTRIBUTION].is_empty());
    }

    #[tokio::test]
    async fn corrupt_files_are_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");
        let instance = dir.path().join("instances");

        let index = fixture(&common, &instance, vec![library("com.example:lib:1.0", b"right")]);
        let mut processor = DistributionProcessor::new(Arc::clone(&index), "main", &common);

        let path = &index.servers[0].modules[0].resolved_path;
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, b"wrong").await.unwrap();

        let report = processor.validate().await.unwrap();
        assert_eq!(report[CATEGORY_DISTRIBUTION].len(), 1);
    }

    #[tokio::test]
    async fn unknown_server_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let index = fixture(dir.path(), dir.path(), Vec::new());
        let mut processor = DistributionProcessor::new(index, "ghost", dir.path());
        assert!(matches!(
            processor.init().await.unwrap_err(),
            CoreError::UnknownServerId(_)
        ));
    }
}
