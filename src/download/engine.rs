// ─── Download engine ───
// Bounded concurrent downloads with per-asset retry and an aggregate
// progress stream that never moves backwards. A retry first retracts the
// failed attempt's bytes, then re-adds as the new attempt streams; the
// reported watermark only advances once the cumulative count passes its
// previous high.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};

use super::Asset;

const MAX_CONCURRENT: usize = 15;
const MAX_RETRIES: usize = 10;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Cumulative-byte accounting shared by all in-flight downloads.
///
/// `received` may dip when an attempt is retracted; `reported` is a high
/// watermark, so observers only ever see a non-decreasing sequence.
struct ProgressLedger {
    received: AtomicU64,
    reported: AtomicU64,
}

impl ProgressLedger {
    fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            reported: AtomicU64::new(0),
        }
    }

    fn add(&self, delta: u64) {
        self.received.fetch_add(delta, Ordering::SeqCst);
    }

    fn retract(&self, amount: u64) {
        self.received.fetch_sub(amount, Ordering::SeqCst);
    }

    /// Advance the watermark; returns the value to report, if it moved.
    fn advance(&self) -> Option<u64> {
        let current = self.received.load(Ordering::SeqCst);
        let mut seen = self.reported.load(Ordering::SeqCst);
        while current > seen {
            match self.reported.compare_exchange(
                seen,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => seen = actual,
            }
        }
        None
    }
}

/// Concurrent, retrying download engine.
pub struct DownloadEngine {
    client: Client,
    concurrency: usize,
    max_retries: usize,
    retry_delay: Duration,
}

impl DownloadEngine {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: MAX_CONCURRENT,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Expected byte total for a planning phase.
    pub fn total_size(assets: &[Asset]) -> u64 {
        assets.iter().map(|a| a.size).sum()
    }

    /// Download every asset, invoking `on_progress` with cumulative bytes.
    ///
    /// At most 15 transfers run at once; each failing transfer is retried
    /// up to 10 times with a flat 1 s pause when the failure is a
    /// transport error without a response or a reset mid-read. The first
    /// terminal failure aborts the batch.
    pub async fn download_all<F>(&self, assets: &[Asset], on_progress: F) -> CoreResult<()>
    where
        F: Fn(u64) + Send + Sync,
    {
        info!(
            "Downloading {} assets ({} bytes expected)",
            assets.len(),
            Self::total_size(assets)
        );

        let ledger = Arc::new(ProgressLedger::new());
        let on_progress = &on_progress;

        stream::iter(assets.iter().cloned())
            .map(|asset| {
                let ledger = Arc::clone(&ledger);
                async move {
                    self.download_with_retry(&asset, &ledger, on_progress)
                        .await
                }
            })
            .buffer_unordered(self.concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        Ok(())
    }

    async fn download_with_retry<F>(
        &self,
        asset: &Asset,
        ledger: &ProgressLedger,
        on_progress: &F,
    ) -> CoreResult<()>
    where
        F: Fn(u64) + Send + Sync,
    {
        if let Some(parent) = asset.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }

        let mut attempt = 0;
        loop {
            match self.attempt(asset, ledger, on_progress).await {
                Ok(()) => return Ok(()),
                Err((err, received)) => {
                    // Undo this attempt's contribution before deciding.
                    ledger.retract(received);

                    if attempt >= self.max_retries || !is_retryable(&err) {
                        warn!("Giving up on {} after {} attempts", asset.id, attempt + 1);
                        return Err(err);
                    }

                    attempt += 1;
                    debug!(
                        "Retrying {} ({}/{}): {}",
                        asset.id, attempt, self.max_retries, err
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// One transfer attempt. On failure, returns the error together with
    /// the bytes this attempt had already added to the ledger.
    async fn attempt<F>(
        &self,
        asset: &Asset,
        ledger: &ProgressLedger,
        on_progress: &F,
    ) -> Result<(), (CoreError, u64)>
    where
        F: Fn(u64) + Send + Sync,
    {
        let mut received: u64 = 0;

        let resp = self
            .client
            .get(&asset.url)
            .send()
            .await
            .map_err(|e| (CoreError::Http(e), received))?;

        let status = resp.status();
        if !status.is_success() {
            return Err((
                CoreError::DownloadFailed {
                    url: asset.url.clone(),
                    status: status.as_u16(),
                },
                received,
            ));
        }

        let mut file = tokio::fs::File::create(&asset.path)
            .await
            .map_err(|e| (CoreError::io(&asset.path, e), received))?;

        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    return Err((CoreError::Http(e), received));
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                return Err((CoreError::io(&asset.path, e), received));
            }

            received += chunk.len() as u64;
            ledger.add(chunk.len() as u64);
            if let Some(cumulative) = ledger.advance() {
                on_progress(cumulative);
            }
        }

        file.flush()
            .await
            .map_err(|e| (CoreError::io(&asset.path, e), received))?;
        drop(file);

        // Integrity check while the transfer context is still at hand.
        // Mismatches are terminal, never retried.
        if asset.size > 0 && received != asset.size {
            return Err((
                CoreError::SizeMismatch {
                    path: asset.path.clone(),
                    expected: asset.size,
                    actual: received,
                },
                received,
            ));
        }
        if !asset.hash.is_empty() {
            let actual = crate::util::hash::hash_file(&asset.path, asset.algo)
                .await
                .map_err(|e| (e, received))?;
            if !actual.eq_ignore_ascii_case(&asset.hash) {
                return Err((
                    CoreError::HashMismatch {
                        path: asset.path.clone(),
                        expected: asset.hash.clone(),
                        actual,
                    },
                    received,
                ));
            }
        }

        debug!("Downloaded {} -> {:?}", asset.url, asset.path);
        Ok(())
    }
}

/// Retry set: transport errors that never produced a response, and
/// connection resets observed mid-read. HTTP status failures (including
/// 5xx) are terminal.
fn is_retryable(err: &CoreError) -> bool {
    match err {
        CoreError::Http(e) => {
            if e.status().is_some() {
                return false;
            }
            if e.is_connect() || e.is_timeout() || e.is_request() {
                return true;
            }
            chain_has_connection_reset(e)
        }
        CoreError::Io { source, .. } => source.kind() == std::io::ErrorKind::ConnectionReset,
        _ => false,
    }
}

fn chain_has_connection_reset(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        source = inner.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use crate::util::hash::{hash_bytes, HashAlgo};
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn ledger_watermark_is_monotonic_across_retries() {
        let ledger = ProgressLedger::new();
        let mut reported = Vec::new();

        // First attempt transfers 400 bytes, then fails.
        ledger.add(400);
        if let Some(v) = ledger.advance() {
            reported.push(v);
        }
        ledger.retract(400);
        // Retraction never reports a lower value.
        assert!(ledger.advance().is_none());

        // Second attempt re-streams the whole 1000-byte asset.
        for _ in 0..10 {
            ledger.add(100);
            if let Some(v) = ledger.advance() {
                reported.push(v);
            }
        }

        assert_eq!(*reported.last().unwrap(), 1000);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert!(reported.iter().all(|&v| v <= 1000));
    }

    #[test]
    fn io_reset_is_retryable_but_other_io_is_not() {
        let reset = CoreError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        );
        assert!(is_retryable(&reset));

        let denied = CoreError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!is_retryable(&denied));

        assert!(!is_retryable(&CoreError::DownloadFailed {
            url: "u".into(),
            status: 503,
        }));
    }

    #[test]
    fn total_size_sums_assets() {
        let assets = vec![asset("a", "http://x/a", 10, "/tmp/a"), asset("b", "http://x/b", 32, "/tmp/b")];
        assert_eq!(DownloadEngine::total_size(&assets), 42);
    }

    fn asset(id: &str, url: &str, size: u64, path: &str) -> Asset {
        Asset {
            id: id.into(),
            url: url.into(),
            size,
            hash: String::new(),
            algo: HashAlgo::Sha1,
            path: path.into(),
        }
    }

    /// Minimal HTTP server: answers every connection with `body`.
    async fn serve_static(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut scratch = [0u8; 1024];
                    let _ = socket.read(&mut scratch).await;
                    let header = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(body).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn downloads_batch_and_reports_final_total() {
        const BODY: &[u8] = b"the quick brown fox jumps over the lazy dog";
        let base = serve_static(BODY).await;
        let dir = tempfile::tempdir().unwrap();

        let assets: Vec<Asset> = (0..4)
            .map(|i| Asset {
                id: format!("file-{}", i),
                url: format!("{}/file-{}", base, i),
                size: BODY.len() as u64,
                hash: hash_bytes(BODY, HashAlgo::Sha1),
                algo: HashAlgo::Sha1,
                path: dir.path().join(format!("nested/file-{}", i)),
            })
            .collect();

        let engine = DownloadEngine::new(build_http_client().unwrap());
        let reported = Mutex::new(Vec::new());
        engine
            .download_all(&assets, |cumulative| {
                reported.lock().unwrap().push(cumulative);
            })
            .await
            .unwrap();

        let reported = reported.into_inner().unwrap();
        let total = DownloadEngine::total_size(&assets);
        assert_eq!(*reported.last().unwrap(), total);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));

        for asset in &assets {
            assert!(asset.is_valid_on_disk().await.unwrap());
        }
    }

    #[tokio::test]
    async fn corrupt_payload_fails_without_retry() {
        const BODY: &[u8] = b"tampered bytes";
        let base = serve_static(BODY).await;
        let dir = tempfile::tempdir().unwrap();

        let assets = vec![Asset {
            id: "bad".into(),
            url: format!("{}/bad", base),
            size: BODY.len() as u64,
            hash: "0000000000000000000000000000000000000000".into(),
            algo: HashAlgo::Sha1,
            path: dir.path().join("bad"),
        }];

        let engine = DownloadEngine::new(build_http_client().unwrap())
            .with_retry_delay(Duration::from_millis(1));
        let err = engine.download_all(&assets, |_| {}).await.unwrap_err();
        assert!(matches!(err, CoreError::HashMismatch { .. }));
    }

    #[tokio::test]
    async fn refused_connection_retries_then_fails_terminally() {
        // Nothing listens on this port; every attempt is refused, which
        // is retryable, so the engine should exhaust its budget.
        let dir = tempfile::tempdir().unwrap();
        let assets = vec![Asset {
            id: "gone".into(),
            url: "http://127.0.0.1:1/gone".into(),
            size: 10,
            hash: String::new(),
            algo: HashAlgo::Sha1,
            path: dir.path().join("gone"),
        }];

        let engine = DownloadEngine::new(build_http_client().unwrap())
            .with_retry_delay(Duration::from_millis(1));
        let err = engine.download_all(&assets, |_| {}).await.unwrap_err();
        assert!(matches!(err, CoreError::Http(_)));
    }

    #[tokio::test]
    async fn http_error_status_is_not_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Serve exactly one 503; a retry would hang on accept.
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut scratch = [0u8; 1024];
            let _ = socket.read(&mut scratch).await;
            let _ = socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n")
                .await;
        });

        let dir = tempfile::tempdir().unwrap();
        let assets = vec![Asset {
            id: "busy".into(),
            url: format!("http://{}/busy", addr),
            size: 0,
            hash: String::new(),
            algo: HashAlgo::Sha1,
            path: dir.path().join("busy"),
        }];

        let engine = DownloadEngine::new(build_http_client().unwrap())
            .with_retry_delay(Duration::from_millis(1));
        let err = engine.download_all(&assets, |_| {}).await.unwrap_err();
        assert!(matches!(err, CoreError::DownloadFailed { status: 503, .. }));
    }
}
