// ─── Streaming hashes ───
// File validation reads in fixed-size chunks so multi-hundred-MB JDK
// archives never land in memory whole.

use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tokio::io::AsyncReadExt;

use crate::error::{CoreError, CoreResult};

const CHUNK_SIZE: usize = 8 * 1024;

/// Hash algorithm attached to a downloadable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgo {
    Md5,
    Sha1,
    Sha256,
}

enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algo: HashAlgo) -> Self {
        match algo {
            HashAlgo::Md5 => Hasher::Md5(Md5::new()),
            HashAlgo::Sha1 => Hasher::Sha1(Sha1::new()),
            HashAlgo::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Hash an in-memory buffer. Returns lowercase hex.
pub fn hash_bytes(data: &[u8], algo: HashAlgo) -> String {
    let mut hasher = Hasher::new(algo);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Stream a file through the given hash. Returns lowercase hex.
pub async fn hash_file(path: &Path, algo: HashAlgo) -> CoreResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    let mut hasher = Hasher::new(algo);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Check a file against an expected size and hash.
///
/// A file is valid iff it exists, its length matches `size`, and its
/// streamed hash matches `expected` (case-insensitive hex). `size == 0`
/// marks an opaque asset and skips the length check.
pub async fn validate_file(
    path: &Path,
    size: u64,
    expected: &str,
    algo: HashAlgo,
) -> CoreResult<bool> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(_) => return Ok(false),
    };

    if size > 0 && meta.len() != size {
        return Ok(false);
    }

    let actual = hash_file(path, algo).await?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
