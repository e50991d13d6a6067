// ─── Worker message grammar ───
// Tagged variants exchanged between the controlling process and the
// repair worker. Parent→child carries exactly one command; child→parent
// streams progress until a single terminal Complete or Error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user-presentable error: title plus description, shaped by the
/// active receiver when it recognizes the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayableError {
    pub title: String,
    pub desc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkerMessage {
    /// Parent → child: run the named receiver with these arguments.
    #[serde(rename_all = "camelCase")]
    Command { receiver_id: String, args: Value },

    /// Child → parent: cumulative progress within a labelled stage.
    #[serde(rename_all = "camelCase")]
    Progress {
        stage_label: String,
        received: u64,
        total: u64,
    },

    /// Child → parent: stage `stage_number` of `total_stages` finished.
    #[serde(rename_all = "camelCase")]
    StageComplete {
        stage_number: usize,
        total_stages: usize,
    },

    /// Child → parent: terminal success.
    Complete { payload: Value },

    /// Child → parent: terminal failure.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        displayable: Option<DisplayableError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_round_trips_as_tagged_json() {
        let msg = WorkerMessage::Command {
            receiver_id: "full-repair".into(),
            args: json!({ "serverId": "main" }),
        };
        let line = serde_json::to_string(&msg).unwrap();
        assert!(line.contains(r#""kind":"command""#));
        assert!(line.contains(r#""receiverId":"full-repair""#));

        let back: WorkerMessage = serde_json::from_str(&line).unwrap();
        match back {
            WorkerMessage::Command { receiver_id, args } => {
                assert_eq!(receiver_id, "full-repair");
                assert_eq!(args["serverId"], "main");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn error_omits_absent_displayable() {
        let line = serde_json::to_string(&WorkerMessage::Error { displayable: None }).unwrap();
        assert_eq!(line, r#"{"kind":"error"}"#);

        let with = WorkerMessage::Error {
            displayable: Some(DisplayableError {
                title: "Download failed".into(),
                desc: "Could not reach the distribution server.".into(),
            }),
        };
        let line = serde_json::to_string(&with).unwrap();
        assert!(line.contains("Download failed"));
    }

    #[test]
    fn progress_fields_are_camel_case() {
        let line = serde_json::to_string(&WorkerMessage::Progress {
            stage_label: "download".into(),
            received: 10,
            total: 100,
        })
        .unwrap();
        assert!(line.contains(r#""stageLabel":"download""#));
    }
}
