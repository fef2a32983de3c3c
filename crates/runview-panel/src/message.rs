//! Informational messages shown instead of the run details.

use std::fmt;

use runview_run::{FlowRun, RunStatus};
use serde::Serialize;

/// A message that replaces the normal panel content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelMessage {
  /// The run failed inside the platform; nothing was logged.
  NoLogsCaptured,
  /// The run's logs were purged after the retention window.
  LogsRetention { days: Option<u32> },
}

impl fmt::Display for PanelMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NoLogsCaptured => write!(f, "There are no logs captured for this run."),
      Self::LogsRetention { days: Some(days) } => write!(
        f,
        "Logs are kept for {} days after execution and then deleted.",
        days
      ),
      Self::LogsRetention { days: None } => write!(
        f,
        "Logs are kept for a limited number of days after execution and then deleted."
      ),
    }
  }
}

/// Decide whether the panel shows a message instead of run details.
///
/// First match wins:
/// 1. no run, or the run is still running: no message
/// 2. internal error: nothing was captured
/// 3. no log file: logs expired after `retention_days`
/// 4. otherwise: no message
pub fn decide_message(run: Option<&FlowRun>, retention_days: Option<u32>) -> Option<PanelMessage> {
  let run = run?;
  match run.status {
    RunStatus::Running => None,
    RunStatus::InternalError => Some(PanelMessage::NoLogsCaptured),
    _ if run.logs_file_id.is_none() => Some(PanelMessage::LogsRetention {
      days: retention_days,
    }),
    _ => None,
  }
}
