use serde::{Deserialize, Serialize};

/// How a trigger is fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
  Empty,
  Piece,
  Webhook,
  Schedule,
}

/// Kind of a step as recorded in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
  Trigger,
  Piece,
  Code,
  Branch,
  Loop,
}
