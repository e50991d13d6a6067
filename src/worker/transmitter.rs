// ─── Transmitter ───
// Parent-side endpoint of the worker link. Spawns the worker executable
// with the receiver id as its first argument and exchanges one JSON
// document per line: commands down stdin, messages up stdout.

use std::path::Path;
use std::process::Stdio;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

use super::message::WorkerMessage;

pub struct Transmitter {
    child: Child,
    stdin: Option<ChildStdin>,
    events: UnboundedReceiver<WorkerMessage>,
    receiver_id: String,
}

impl Transmitter {
    /// Spawn the worker process for the named receiver.
    pub fn spawn(worker_program: &Path, receiver_id: &str) -> CoreResult<Self> {
        let mut child = Command::new(worker_program)
            .arg(receiver_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::Worker(format!("failed to spawn worker: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoreError::Worker("worker stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::Worker("worker stdout unavailable".into()))?;

        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<WorkerMessage>(&line) {
                    Ok(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    // Diagnostic breadcrumbs share the stream; keep them
                    // in the log, not the channel.
                    Err(_) => debug!("worker: {}", line),
                }
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            events,
            receiver_id: receiver_id.to_string(),
        })
    }

    /// Send the command message that starts the receiver's work.
    pub async fn send_command(&mut self, args: Value) -> CoreResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CoreError::Worker("worker link already closed".into()))?;

        let msg = WorkerMessage::Command {
            receiver_id: self.receiver_id.clone(),
            args,
        };
        let mut line = serde_json::to_vec(&msg)?;
        line.push(b'\n');
        stdin
            .write_all(&line)
            .await
            .map_err(|e| CoreError::Worker(format!("failed to write command: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| CoreError::Worker(format!("failed to flush command: {}", e)))?;
        Ok(())
    }

    /// Next message from the child; `None` once the child has exited and
    /// the stream drained.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.events.recv().await
    }

    /// Disconnect: closing stdin signals the child to exit cleanly.
    pub async fn shutdown(mut self) -> CoreResult<Option<i32>> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| CoreError::Worker(format!("failed to reap worker: {}", e)))?;

        if !status.success() {
            warn!("Worker exited with {:?}", status.code());
        }
        Ok(status.code())
    }
}
