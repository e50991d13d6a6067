pub mod engine;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::util::hash::{validate_file, HashAlgo};

pub use engine::DownloadEngine;

/// A single downloadable file with its expected size and content hash.
///
/// Assets live only for the duration of one repair cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub url: String,
    /// Expected byte count. Zero marks an opaque asset whose size is only
    /// known from `Content-Length` at download time.
    pub size: u64,
    /// Expected digest, lowercase hex.
    pub hash: String,
    pub algo: HashAlgo,
    /// Absolute destination path.
    pub path: PathBuf,
}

impl Asset {
    /// An asset is valid on disk iff the file exists, its length matches
    /// `size`, and its streamed hash matches `hash`.
    pub async fn is_valid_on_disk(&self) -> CoreResult<bool> {
        validate_file(&self.path, self.size, &self.hash, self.algo).await
    }
}
