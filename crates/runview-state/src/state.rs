use runview_config::FlowVersion;
use runview_run::{FlowRun, LoopIndexMap};
use serde::{Deserialize, Serialize};

/// What the builder's left sidebar is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftSidebar {
  #[default]
  None,
  /// The list of past runs.
  Runs,
  RunDetails,
}

/// Snapshot of the builder state relevant to run details.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderState {
  pub flow_version: FlowVersion,
  pub run: Option<FlowRun>,
  /// Selected step name, owned by the editor.
  pub selected_step: Option<String>,
  pub loop_indexes: LoopIndexMap,
  pub left_sidebar: LeftSidebar,
}

impl BuilderState {
  pub fn new(flow_version: FlowVersion) -> Self {
    Self {
      flow_version,
      run: None,
      selected_step: None,
      loop_indexes: LoopIndexMap::new(),
      left_sidebar: LeftSidebar::None,
    }
  }

  pub fn run_id(&self) -> Option<&str> {
    self.run.as_ref().map(|run| run.id.as_str())
  }
}
