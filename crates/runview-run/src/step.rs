use std::collections::HashMap;

use indexmap::IndexMap;
use runview_config::StepType;
use serde::{Deserialize, Serialize};

/// Step name to execution record, in execution order.
pub type StepMap = IndexMap<String, StepExecution>;

/// Loop step name to the iteration currently selected in the editor.
pub type LoopIndexMap = HashMap<String, usize>;

/// Status of a single step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Running,
  Paused,
  Succeeded,
  Failed,
  Stopped,
}

/// The recorded execution of one step inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
  #[serde(rename = "type")]
  pub step_type: StepType,
  pub status: StepStatus,
  #[serde(default)]
  pub input: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  /// One step map per loop iteration. Only loop steps carry iterations.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub iterations: Vec<StepMap>,
}

impl StepExecution {
  pub fn new(step_type: StepType, status: StepStatus) -> Self {
    Self {
      step_type,
      status,
      input: serde_json::Value::Null,
      output: None,
      error_message: None,
      duration_ms: None,
      iterations: Vec::new(),
    }
  }

  pub fn with_output(mut self, output: serde_json::Value) -> Self {
    self.output = Some(output);
    self
  }

  pub fn with_iterations(mut self, iterations: Vec<StepMap>) -> Self {
    self.iterations = iterations;
    self
  }
}

/// The payload handed to the renderer for the selected step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
  pub step_name: String,
  pub step_type: StepType,
  pub status: StepStatus,
  pub input: serde_json::Value,
  pub output: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
}

impl StepOutput {
  pub fn from_execution(step_name: impl Into<String>, execution: &StepExecution) -> Self {
    Self {
      step_name: step_name.into(),
      step_type: execution.step_type,
      status: execution.status,
      input: execution.input.clone(),
      output: execution.output.clone(),
      error_message: execution.error_message.clone(),
      duration_ms: execution.duration_ms,
    }
  }
}
