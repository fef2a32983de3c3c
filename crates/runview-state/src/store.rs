use runview_config::FlowVersion;
use runview_run::FlowRun;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::StateError;
use crate::state::{BuilderState, LeftSidebar};

/// Result of applying a snapshot written by an asynchronous producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Applied,
  /// The producer was cancelled before the write.
  Cancelled,
  /// The store no longer shows the run the producer was opened for.
  RunMismatch,
}

/// Shared editor state with change notification.
///
/// Built on a `watch` channel: writes replace the state under the channel's
/// lock and wake every subscriber; subscribers only ever observe whole
/// states.
#[derive(Debug)]
pub struct RunStateStore {
  state: watch::Sender<BuilderState>,
}

impl RunStateStore {
  pub fn new(flow_version: FlowVersion) -> Self {
    let (state, _) = watch::channel(BuilderState::new(flow_version));
    Self { state }
  }

  /// Create a store already showing `run`.
  pub fn with_run(flow_version: FlowVersion, run: FlowRun) -> Self {
    let mut state = BuilderState::new(flow_version);
    state.run = Some(run);
    state.left_sidebar = LeftSidebar::RunDetails;
    let (state, _) = watch::channel(state);
    Self { state }
  }

  /// Clone of the current state.
  pub fn snapshot(&self) -> BuilderState {
    self.state.borrow().clone()
  }

  /// Read the current state without cloning it.
  pub fn read<R>(&self, f: impl FnOnce(&BuilderState) -> R) -> R {
    f(&self.state.borrow())
  }

  /// Receiver notified after every write.
  pub fn subscribe(&self) -> watch::Receiver<BuilderState> {
    self.state.subscribe()
  }

  pub fn run_id(&self) -> Option<String> {
    self.read(|state| state.run_id().map(str::to_string))
  }

  /// Display a different run (or none). Loop selections belong to the
  /// previous run and are reset.
  pub fn select_run(&self, run: Option<FlowRun>) {
    self.state.send_modify(|state| {
      info!(
        previous = ?state.run_id(),
        run_id = ?run.as_ref().map(|r| r.id.as_str()),
        "selecting run"
      );
      state.run = run;
      state.loop_indexes.clear();
    });
  }

  /// Replace the displayed run with a newer snapshot.
  ///
  /// `current_run_id` is the run the producer believes is displayed; if the
  /// store shows something else the snapshot is discarded. The cancellation
  /// check happens under the write lock, so once `cancel` is cancelled and
  /// [`RunStateStore::settle`] has returned, no write from this producer can
  /// land.
  pub fn apply_snapshot(
    &self,
    current_run_id: &str,
    run: FlowRun,
    cancel: &CancellationToken,
  ) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::Applied;
    self.state.send_if_modified(|state| {
      if cancel.is_cancelled() {
        outcome = ApplyOutcome::Cancelled;
        return false;
      }
      if state.run_id() != Some(current_run_id) {
        outcome = ApplyOutcome::RunMismatch;
        return false;
      }
      debug!(run_id = %run.id, status = ?run.status, steps = run.steps.len(), "applying run snapshot");
      state.run = Some(run);
      true
    });
    outcome
  }

  /// Wait for any write in progress to finish.
  pub fn settle(&self) {
    drop(self.state.borrow());
  }

  /// Select a step in the editor.
  pub fn select_step(&self, step_name: Option<String>) {
    self.state.send_if_modified(|state| {
      if state.selected_step == step_name {
        return false;
      }
      state.selected_step = step_name;
      true
    });
  }

  /// Select the iteration shown for a loop step.
  pub fn set_loop_index(&self, loop_name: &str, index: usize) -> Result<(), StateError> {
    let mut result = Ok(());
    self.state.send_if_modified(|state| {
      if !state.flow_version.is_loop_step(loop_name) {
        result = Err(StateError::NotALoop(loop_name.to_string()));
        return false;
      }
      state.loop_indexes.insert(loop_name.to_string(), index) != Some(index)
    });
    result
  }

  /// Go back to the default (last) iteration for a loop step.
  pub fn clear_loop_index(&self, loop_name: &str) {
    self
      .state
      .send_if_modified(|state| state.loop_indexes.remove(loop_name).is_some());
  }

  /// Swap the flow version, dropping loop selections for steps that are no
  /// longer loops.
  pub fn set_flow_version(&self, flow_version: FlowVersion) {
    self.state.send_modify(|state| {
      state
        .loop_indexes
        .retain(|name, _| flow_version.is_loop_step(name));
      state.flow_version = flow_version;
    });
  }

  pub fn set_left_sidebar(&self, sidebar: LeftSidebar) {
    self.state.send_if_modified(|state| {
      if state.left_sidebar == sidebar {
        return false;
      }
      state.left_sidebar = sidebar;
      true
    });
  }
}
