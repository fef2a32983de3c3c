use serde::{Deserialize, Serialize};

use crate::enums::TriggerKind;

/// The trigger that starts a flow.
///
/// The trigger is not executed by the run itself; its display output is taken
/// from the definition (the sample data captured while building the flow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
  pub name: String,
  pub display_name: String,
  pub kind: TriggerKind,
  /// Sample payload captured for the trigger, e.g. the last webhook body.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sample_data: Option<serde_json::Value>,
  /// Configured trigger settings, shown as the trigger's input.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub settings: Option<serde_json::Value>,
}
