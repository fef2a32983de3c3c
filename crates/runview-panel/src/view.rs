//! What the panel renders, derived from one state snapshot.

use runview_resolver::{loop_iteration_count, resolve_step_output};
use runview_run::{RunEnvironment, RunStatus, StepOutput};
use runview_state::BuilderState;
use serde::Serialize;

use crate::message::{PanelMessage, decide_message};

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PanelView {
  /// A message preempts the run details.
  Message {
    message: PanelMessage,
    text: String,
    /// Status of the run the message is about.
    status: RunStatus,
  },
  Details(RunDetailsView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDetailsView {
  pub run_id: Option<String>,
  pub status: Option<RunStatus>,
  /// Top-level steps in execution order.
  pub step_names: Vec<String>,
  /// No step has reported yet.
  pub loading: bool,
  /// Whether the "back to runs" action is offered. Test runs started from
  /// the editor have no runs list to go back to.
  pub can_return_to_runs: bool,
  pub selected_step: Option<String>,
  pub selected_output: Option<StepOutput>,
  /// Loops enclosing the selected step, outermost first.
  pub loops: Vec<LoopSelection>,
}

/// Iteration picker state for one loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopSelection {
  pub loop_name: String,
  /// Explicitly selected iteration; `None` means the last one.
  pub selected: Option<usize>,
  pub iterations: usize,
}

/// Consumer of panel views.
pub trait PanelRenderer: Send {
  fn render(&mut self, view: &PanelView);
}

impl PanelView {
  /// Derive the view from a state snapshot. Nothing is cached: every call
  /// resolves against exactly the state it is given.
  pub fn compute(state: &BuilderState, retention_days: Option<u32>) -> Self {
    let run = state.run.as_ref();

    if let (Some(run), Some(message)) = (run, decide_message(run, retention_days)) {
      return Self::Message {
        text: message.to_string(),
        message,
        status: run.status,
      };
    }

    let step_names = run.map(|run| run.step_names()).unwrap_or_default();

    let selected_output = match (run, state.selected_step.as_deref()) {
      (Some(run), Some(step_name)) => resolve_step_output(
        step_name,
        &state.loop_indexes,
        &run.steps,
        &state.flow_version,
      ),
      _ => None,
    };

    let loops = match (run, state.selected_step.as_deref()) {
      (Some(run), Some(step_name)) => state
        .flow_version
        .enclosing_loops(step_name)
        .into_iter()
        .map(|loop_name| LoopSelection {
          loop_name: loop_name.to_string(),
          selected: state.loop_indexes.get(loop_name).copied(),
          iterations: loop_iteration_count(
            loop_name,
            &state.loop_indexes,
            &run.steps,
            &state.flow_version,
          )
          .unwrap_or(0),
        })
        .collect(),
      _ => Vec::new(),
    };

    Self::Details(RunDetailsView {
      run_id: run.map(|run| run.id.clone()),
      status: run.map(|run| run.status),
      loading: step_names.is_empty(),
      step_names,
      can_return_to_runs: run
        .is_some_and(|run| run.environment != RunEnvironment::Testing),
      selected_step: state.selected_step.clone(),
      selected_output,
      loops,
    })
  }

  /// Status of the run this view was computed from.
  pub fn status(&self) -> Option<RunStatus> {
    match self {
      Self::Message { status, .. } => Some(*status),
      Self::Details(details) => details.status,
    }
  }

  pub fn message(&self) -> Option<&PanelMessage> {
    match self {
      Self::Message { message, .. } => Some(message),
      Self::Details(_) => None,
    }
  }

  pub fn details(&self) -> Option<&RunDetailsView> {
    match self {
      Self::Details(details) => Some(details),
      Self::Message { .. } => None,
    }
  }
}
