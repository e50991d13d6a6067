// ─── Worker receivers ───
// The child process dispatches its single command to a registered
// receiver. A receiver executes the work, streaming messages back, and
// gets one chance to shape a terminal failure into something the user
// can read.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::repair::{FullRepair, RepairSettings};

use super::message::{DisplayableError, WorkerMessage};

pub const FULL_REPAIR_ID: &str = "full-repair";

#[async_trait]
pub trait Receiver: Send + Sync {
    fn id(&self) -> &'static str;

    /// Run the command; messages stream over `tx`, the return value
    /// becomes the Complete payload.
    async fn execute(&self, args: Value, tx: &UnboundedSender<WorkerMessage>) -> CoreResult<Value>;

    /// Shape a terminal failure for the user, when recognized.
    fn display_error(&self, err: &CoreError) -> Option<DisplayableError>;
}

pub struct FullRepairReceiver;

#[async_trait]
impl Receiver for FullRepairReceiver {
    fn id(&self) -> &'static str {
        FULL_REPAIR_ID
    }

    async fn execute(&self, args: Value, tx: &UnboundedSender<WorkerMessage>) -> CoreResult<Value> {
        let settings: RepairSettings = serde_json::from_value(args)?;
        FullRepair::new(settings).run(tx).await
    }

    fn display_error(&self, err: &CoreError) -> Option<DisplayableError> {
        let (title, desc) = match err {
            CoreError::DistributionLoadFailed(_) => (
                "Could not load server information",
                "The distribution index is unreachable and no cached copy exists. Check your connection and try again.",
            ),
            CoreError::DownloadFailed { .. } | CoreError::Http(_) => (
                "Download failed",
                "A required file could not be downloaded. Check your connection and try again.",
            ),
            CoreError::HashMismatch { .. } | CoreError::SizeMismatch { .. } => (
                "File validation failed",
                "A downloaded file did not match its expected checksum. Run the repair again.",
            ),
            CoreError::UnknownServerId(_) | CoreError::NoModLoader(_) | CoreError::NoVersionManifest(_) => (
                "Server configuration problem",
                "The selected server's definition is incomplete. Contact the distribution maintainer.",
            ),
            _ => return None,
        };
        Some(DisplayableError {
            title: title.into(),
            desc: desc.into(),
        })
    }
}

/// Look up a receiver by its registry id.
pub fn find_receiver(id: &str) -> Option<Box<dyn Receiver>> {
    match id {
        FULL_REPAIR_ID => Some(Box::new(FullRepairReceiver)),
        _ => None,
    }
}

/// Child-process main loop: dispatch stdin commands to `receiver_id`,
/// stream messages on stdout, one JSON document per line.
///
/// Returns the process exit code: 0 on parent disconnect (stdin EOF),
/// 1 after a terminal error.
pub async fn run_worker(receiver_id: &str) -> i32 {
    let Some(receiver) = find_receiver(receiver_id) else {
        error!("Unknown receiver id: {}", receiver_id);
        return 1;
    };
    info!("Worker ready, receiver = {}", receiver.id());

    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();

    // Single writer owns stdout; every message is one JSON line.
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(msg) = rx.recv().await {
            let Ok(mut line) = serde_json::to_vec(&msg) else {
                continue;
            };
            line.push(b'\n');
            if stdout.write_all(&line).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut exit_code = 0;

    while let Ok(Some(line)) = lines.next_line().await {
        let command: WorkerMessage = match serde_json::from_str(&line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Discarding unparseable command line: {}", e);
                continue;
            }
        };
        let WorkerMessage::Command { receiver_id, args } = command else {
            warn!("Discarding non-command message from parent");
            continue;
        };
        if receiver_id != receiver.id() {
            warn!("Command addressed to {:?}, ignoring", receiver_id);
            continue;
        }

        match receiver.execute(args, &tx).await {
            Ok(payload) => {
                let _ = tx.send(WorkerMessage::Complete { payload });
            }
            Err(err) => {
                // Breadcrumb on stdout for post-mortems, then the typed
                // terminal message.
                println!("worker failure: {}", err);
                use std::io::Write;
                let _ = std::io::stdout().flush();

                let displayable = receiver.display_error(&err);
                let _ = tx.send(WorkerMessage::Error { displayable });
                exit_code = 1;
                break;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_ids_only() {
        assert!(find_receiver(FULL_REPAIR_ID).is_some());
        assert!(find_receiver("defrag").is_none());
    }

    #[test]
    fn display_error_covers_the_user_facing_failures() {
        let receiver = FullRepairReceiver;

        let displayable = receiver
            .display_error(&CoreError::DistributionLoadFailed("offline".into()))
            .unwrap();
        assert_eq!(displayable.title, "Could not load server information");

        assert!(receiver
            .display_error(&CoreError::UnknownServerId("ghost".into()))
            .is_some());
        // Internal failures fall through with no displayable shape.
        assert!(receiver
            .display_error(&CoreError::VarintTooLarge)
            .is_none());
    }

    #[tokio::test]
    async fn execute_rejects_malformed_settings() {
        let receiver = FullRepairReceiver;
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = receiver
            .execute(serde_json::json!({ "nope": true }), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }
}
