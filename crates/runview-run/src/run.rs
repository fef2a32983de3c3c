use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::StepMap;

/// Status of a flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Queued,
  Running,
  Paused,
  Succeeded,
  Failed,
  InternalError,
  QuotaExceeded,
  Timeout,
  Stopped,
}

impl RunStatus {
  /// Whether the run will not produce further snapshots.
  pub fn is_terminal(self) -> bool {
    !matches!(self, Self::Queued | Self::Running | Self::Paused)
  }
}

/// Where a run was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnvironment {
  Production,
  /// Started from the editor's "test flow" action.
  Testing,
}

/// A complete snapshot of one flow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
  pub id: String,
  pub flow_id: String,
  pub flow_version_id: String,
  #[serde(default)]
  pub flow_display_name: String,
  pub status: RunStatus,
  pub environment: RunEnvironment,
  /// Reference to the persisted execution log, if it has not been purged.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logs_file_id: Option<String>,
  #[serde(default)]
  pub steps: StepMap,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failed_step_name: Option<String>,
}

impl FlowRun {
  /// Create an empty run that has not reported any steps yet.
  pub fn new(
    id: impl Into<String>,
    flow_id: impl Into<String>,
    flow_version_id: impl Into<String>,
    environment: RunEnvironment,
  ) -> Self {
    Self {
      id: id.into(),
      flow_id: flow_id.into(),
      flow_version_id: flow_version_id.into(),
      flow_display_name: String::new(),
      status: RunStatus::Queued,
      environment,
      logs_file_id: None,
      steps: StepMap::new(),
      started_at: None,
      finished_at: None,
      failed_step_name: None,
    }
  }

  /// Names of the top-level steps in execution order.
  pub fn step_names(&self) -> Vec<String> {
    self.steps.keys().cloned().collect()
  }
}
