use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the provisioning core.
/// Every module returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Socket timed out after {0} seconds of inactivity")]
    Timeout(u64),

    #[error("Hostname could not be resolved: {0}")]
    NameNotFound(String),

    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    // ── Protocol / framing ──────────────────────────────
    #[error("Varint exceeds 5 bytes")]
    VarintTooLarge,

    #[error("Unexpected packet id {got:#04x}, expected {expected:#04x}")]
    UnexpectedPacket { expected: u8, got: u8 },

    #[error("Frame incomplete after {0} read iterations")]
    FrameOverflow(usize),

    // ── Integrity ───────────────────────────────────────
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Parsing ─────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unparseable version string: {0}")]
    UnparseableVersion(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed archive {path:?}: {reason}")]
    MalformedArchive { path: PathBuf, reason: String },

    // ── Distribution / repair ───────────────────────────
    #[error("Unknown server id: {0}")]
    UnknownServerId(String),

    #[error("Server {0} declares no mod loader module")]
    NoModLoader(String),

    #[error("No version manifest available for server {0}")]
    NoVersionManifest(String),

    #[error("Distribution index could not be loaded: {0}")]
    DistributionLoadFailed(String),

    // ── Java ────────────────────────────────────────────
    #[error("No suitable Java installation for range {0}")]
    JavaNotFound(String),

    #[error("JDK acquisition failed: {0}")]
    JdkAcquisitionFailed(String),

    #[error("Unknown JDK distribution: {0}")]
    UnknownDistribution(String),

    // ── Worker ──────────────────────────────────────────
    #[error("Worker transport error: {0}")]
    Worker(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Attach a path to a raw IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Io { .. } => "io",
            CoreError::Http(_)
            | CoreError::DownloadFailed { .. }
            | CoreError::Timeout(_)
            | CoreError::NameNotFound(_)
            | CoreError::ConnectionRefused(_) => "network",
            CoreError::VarintTooLarge
            | CoreError::UnexpectedPacket { .. }
            | CoreError::FrameOverflow(_) => "protocol",
            CoreError::HashMismatch { .. } | CoreError::SizeMismatch { .. } => "integrity",
            CoreError::InvalidMavenCoordinate(_) => "maven",
            CoreError::Json(_) | CoreError::UnparseableVersion(_) => "parsing",
            CoreError::Zip(_) | CoreError::MalformedArchive { .. } => "archive",
            CoreError::UnknownServerId(_)
            | CoreError::NoModLoader(_)
            | CoreError::NoVersionManifest(_) => "configuration",
            CoreError::DistributionLoadFailed(_) => "distribution",
            CoreError::JavaNotFound(_)
            | CoreError::JdkAcquisitionFailed(_)
            | CoreError::UnknownDistribution(_) => "java",
            CoreError::Worker(_) => "worker",
            CoreError::Other(_) => "generic",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Http(_)
                | CoreError::DownloadFailed { .. }
                | CoreError::Timeout(_)
                | CoreError::NameNotFound(_)
                | CoreError::ConnectionRefused(_)
                | CoreError::Io { .. }
                | CoreError::JavaNotFound(_)
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
