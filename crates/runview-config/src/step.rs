use serde::{Deserialize, Serialize};

use crate::enums::StepType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub name: String,
  pub display_name: String,
  #[serde(flatten)]
  pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
  /// An action provided by a piece (integration).
  Piece {
    piece_name: String,
    action_name: String,
  },
  Code {
    #[serde(default)]
    source: String,
  },
  /// Conditional step. Children run at the same level as the branch itself,
  /// so their outputs are not nested in the run.
  Branch {
    #[serde(default)]
    on_success: Vec<StepDef>,
    #[serde(default)]
    on_failure: Vec<StepDef>,
  },
  /// Iterates over `items`; each iteration records its own step map.
  Loop {
    items: String,
    #[serde(default)]
    steps: Vec<StepDef>,
  },
}

impl StepDef {
  pub fn step_type(&self) -> StepType {
    match self.kind {
      StepKind::Piece { .. } => StepType::Piece,
      StepKind::Code { .. } => StepType::Code,
      StepKind::Branch { .. } => StepType::Branch,
      StepKind::Loop { .. } => StepType::Loop,
    }
  }

  pub fn is_loop(&self) -> bool {
    matches!(self.kind, StepKind::Loop { .. })
  }

  /// Direct children of this step, in definition order.
  pub fn children(&self) -> Vec<&StepDef> {
    match &self.kind {
      StepKind::Branch {
        on_success,
        on_failure,
      } => on_success.iter().chain(on_failure.iter()).collect(),
      StepKind::Loop { steps, .. } => steps.iter().collect(),
      StepKind::Piece { .. } | StepKind::Code { .. } => Vec::new(),
    }
  }
}
