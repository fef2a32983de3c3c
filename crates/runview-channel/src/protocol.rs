//! JSON frames exchanged over the channel.

use runview_run::FlowRun;
use serde::{Deserialize, Serialize};

/// Frames sent by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
  RunFlow {
    request_id: String,
    flow_version_id: String,
    run: Option<FlowRun>,
  },
}

/// Frames sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
  RunStarted { run: FlowRun },
  RunProgress { run: FlowRun },
  /// Last snapshot; the server closes the stream after it.
  RunFinished { run: FlowRun },
  Error { message: String },
}

impl ServerFrame {
  /// The snapshot carried by this frame, if any.
  pub fn into_run(self) -> Option<FlowRun> {
    match self {
      Self::RunStarted { run } | Self::RunProgress { run } | Self::RunFinished { run } => Some(run),
      Self::Error { .. } => None,
    }
  }

  pub fn is_final(&self) -> bool {
    matches!(self, Self::RunFinished { .. } | Self::Error { .. })
  }
}
