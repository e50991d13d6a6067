// ─── Distribution API ───
// Owns the fetch/cache/load lifecycle of the distribution document.
// Precedence when online: remote → on-disk cache → fail. Dev mode reads
// only the local dev file and never touches the network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};

use super::model::RawDistribution;
use super::overlay::DistributionIndex;

const CACHE_FILE: &str = "distribution.json";
const DEV_FILE: &str = "distribution_dev.json";

pub struct DistributionApi {
    client: Client,
    remote_url: String,
    launcher_dir: PathBuf,
    common_dir: PathBuf,
    instance_dir: PathBuf,
    dev_mode: bool,
    /// Overlay from the last successful load; survives failed refreshes.
    index: Option<Arc<DistributionIndex>>,
}

impl DistributionApi {
    pub fn new(
        client: Client,
        remote_url: impl Into<String>,
        launcher_dir: impl Into<PathBuf>,
        common_dir: impl Into<PathBuf>,
        instance_dir: impl Into<PathBuf>,
        dev_mode: bool,
    ) -> Self {
        Self {
            client,
            remote_url: remote_url.into(),
            launcher_dir: launcher_dir.into(),
            common_dir: common_dir.into(),
            instance_dir: instance_dir.into(),
            dev_mode,
            index: None,
        }
    }

    /// The loaded overlay, fetching on first use.
    pub async fn get_distribution(&mut self) -> CoreResult<Arc<DistributionIndex>> {
        if let Some(index) = &self.index {
            return Ok(Arc::clone(index));
        }
        self.refresh().await
    }

    /// Re-load from the configured source and replace the overlay.
    pub async fn refresh(&mut self) -> CoreResult<Arc<DistributionIndex>> {
        let raw = if self.dev_mode {
            self.load_dev().await?
        } else {
            match self.fetch_remote().await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Remote distribution unavailable ({}), trying cache", e);
                    self.load_cache().await?
                }
            }
        };

        let index = Arc::new(DistributionIndex::wrap(
            raw,
            &self.common_dir,
            &self.instance_dir,
        )?);
        self.index = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Like [`refresh`](Self::refresh), but a total failure keeps the
    /// current in-memory overlay when one exists.
    pub async fn refresh_or_fallback(&mut self) -> CoreResult<Arc<DistributionIndex>> {
        match self.refresh().await {
            Ok(index) => Ok(index),
            Err(e) => match &self.index {
                Some(index) => {
                    warn!("Refresh failed ({}), keeping previous distribution", e);
                    Ok(Arc::clone(index))
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_remote(&self) -> CoreResult<RawDistribution> {
        info!("Fetching distribution from {}", self.remote_url);

        let resp = self.client.get(&self.remote_url).send().await?;
        if !resp.status().is_success() {
            return Err(CoreError::DownloadFailed {
                url: self.remote_url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let text = resp.text().await?;
        let raw: RawDistribution = serde_json::from_str(&text)?;

        // Cache only after a clean parse; a bad body must not clobber a
        // good cache.
        let cache_path = self.launcher_dir.join(CACHE_FILE);
        if let Some(parent) = cache_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }
        tokio::fs::write(&cache_path, &text)
            .await
            .map_err(|e| CoreError::io(&cache_path, e))?;

        Ok(raw)
    }

    async fn load_cache(&self) -> CoreResult<RawDistribution> {
        let path = self.launcher_dir.join(CACHE_FILE);
        Self::load_file(&path).await.map_err(|e| {
            CoreError::DistributionLoadFailed(format!(
                "remote unreachable and no usable cache at {:?}: {}",
                path, e
            ))
        })
    }

    async fn load_dev(&self) -> CoreResult<RawDistribution> {
        let path = self.launcher_dir.join(DEV_FILE);
        info!("Dev mode: loading {:?}", path);
        Self::load_file(&path).await.map_err(|e| {
            CoreError::DistributionLoadFailed(format!("dev distribution at {:?}: {}", path, e))
        })
    }

    async fn load_file(path: &Path) -> CoreResult<RawDistribution> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}
