//! Panel lifecycle: mount, keep the run live, unmount.

use std::sync::Arc;

use runview_channel::{RunChannel, RunFlowRequest};
use runview_run::FlowRun;
use runview_state::{ApplyOutcome, BuilderState, LeftSidebar, RunStateStore};
use runview_store::{FetchError, RunSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::view::{PanelRenderer, PanelView};

/// Settings consumed by the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelConfig {
  /// Days execution logs are retained, from the platform flags.
  pub retention_days: Option<u32>,
}

/// A mounted run details panel.
///
/// Owns the background fetch and the live channel for the displayed run.
/// Both are cancelled on [`unmount`](RunDetailsPanel::unmount) or drop.
pub struct RunDetailsPanel {
  store: Arc<RunStateStore>,
  source: Arc<dyn RunSource>,
  config: PanelConfig,
  cancel: CancellationToken,
  tasks: Vec<JoinHandle<()>>,
}

impl RunDetailsPanel {
  /// Mount the panel. Must be called from within a tokio runtime.
  ///
  /// If the store shows a run, fetches its populated snapshot and opens the
  /// live channel for the store's flow version, continuing that run.
  pub fn mount(
    store: Arc<RunStateStore>,
    source: Arc<dyn RunSource>,
    channel: Arc<dyn RunChannel>,
    config: PanelConfig,
  ) -> Self {
    let mut panel = Self {
      store,
      source,
      config,
      cancel: CancellationToken::new(),
      tasks: Vec::new(),
    };

    let (run, flow_version_id) = panel
      .store
      .read(|state| (state.run.clone(), state.flow_version.flow_version_id.clone()));

    match run {
      Some(run) => {
        info!(run_id = %run.id, %flow_version_id, "mounting run details panel");
        panel.spawn_fetch(run.id.clone());
        panel.tasks.push(tokio::spawn(follow_channel(
          panel.store.clone(),
          channel,
          flow_version_id,
          run,
          panel.cancel.clone(),
        )));
      }
      None => {
        debug!(%flow_version_id, "mounting run details panel without a run");
      }
    }

    panel
  }

  /// Recompute the view from the current state.
  pub fn view(&self) -> PanelView {
    self
      .store
      .read(|state| PanelView::compute(state, self.config.retention_days))
  }

  /// Stream of views: the current one first, then one per state change.
  pub fn views(&self) -> PanelViews {
    let mut receiver = self.store.subscribe();
    receiver.mark_changed();
    PanelViews {
      receiver,
      retention_days: self.config.retention_days,
      cancel: self.cancel.clone(),
    }
  }

  /// Fetch the displayed run again.
  pub fn refresh(&mut self) {
    if self.cancel.is_cancelled() {
      return;
    }
    if let Some(run_id) = self.store.run_id() {
      self.spawn_fetch(run_id);
    }
  }

  /// Close the panel's sidebar.
  pub fn close(&self) {
    self.store.set_left_sidebar(LeftSidebar::None);
  }

  /// Leave the run details for the runs list.
  pub fn back_to_runs(&self) {
    self.store.set_left_sidebar(LeftSidebar::Runs);
  }

  pub fn store(&self) -> &Arc<RunStateStore> {
    &self.store
  }

  /// Tear the panel down. Once this returns, no pending fetch result or
  /// channel snapshot will be written to the store.
  pub fn unmount(mut self) {
    self.shutdown();
  }

  fn spawn_fetch(&mut self, run_id: String) {
    self.tasks.retain(|task| !task.is_finished());
    self.tasks.push(tokio::spawn(fetch_run(
      self.store.clone(),
      self.source.clone(),
      run_id,
      self.cancel.clone(),
    )));
  }

  fn shutdown(&mut self) {
    if !self.cancel.is_cancelled() {
      debug!("unmounting run details panel");
    }
    self.cancel.cancel();
    // Writes check the token under the store lock; wait out one in flight.
    self.store.settle();
    for task in self.tasks.drain(..) {
      task.abort();
    }
  }
}

impl Drop for RunDetailsPanel {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// Views of a mounted panel, recomputed on every state change.
pub struct PanelViews {
  receiver: watch::Receiver<BuilderState>,
  retention_days: Option<u32>,
  cancel: CancellationToken,
}

impl PanelViews {
  /// Wait for the next view. Returns `None` once the panel is unmounted.
  pub async fn next(&mut self) -> Option<PanelView> {
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => return None,
      changed = self.receiver.changed() => changed.ok()?,
    }
    let state = self.receiver.borrow_and_update();
    Some(PanelView::compute(&state, self.retention_days))
  }

  /// Render every view until the panel is unmounted.
  pub async fn render_into<R: PanelRenderer>(mut self, renderer: &mut R) {
    while let Some(view) = self.next().await {
      renderer.render(&view);
    }
  }
}

#[instrument(skip(store, source, cancel))]
async fn fetch_run(
  store: Arc<RunStateStore>,
  source: Arc<dyn RunSource>,
  run_id: String,
  cancel: CancellationToken,
) {
  let result = tokio::select! {
    _ = cancel.cancelled() => {
      debug!("run fetch abandoned");
      return;
    }
    result = source.fetch_populated_run(&run_id) => result,
  };

  match result {
    Ok(run) => match store.apply_snapshot(&run_id, run, &cancel) {
      ApplyOutcome::Applied => debug!("fetched run applied"),
      outcome => debug!(?outcome, "fetched run discarded"),
    },
    Err(FetchError::NotFound(_)) => {
      warn!("run no longer exists");
    }
    Err(e) if e.is_transient() => {
      warn!(error = %e, "run fetch failed, waiting for refresh");
    }
    Err(e) => {
      error!(error = %e, "run fetch failed");
    }
  }
}

#[instrument(skip(store, channel, initial_run, cancel), fields(run_id = %initial_run.id))]
async fn follow_channel(
  store: Arc<RunStateStore>,
  channel: Arc<dyn RunChannel>,
  flow_version_id: String,
  initial_run: FlowRun,
  cancel: CancellationToken,
) {
  let mut current_run_id = initial_run.id.clone();
  let request = RunFlowRequest { flow_version_id };

  let opened = tokio::select! {
    _ = cancel.cancelled() => return,
    opened = channel.open(request, Some(initial_run)) => opened,
  };
  let mut subscription = match opened {
    Ok(subscription) => subscription,
    Err(e) => {
      warn!(error = %e, "failed to open run channel");
      return;
    }
  };

  loop {
    let snapshot = tokio::select! {
      _ = cancel.cancelled() => break,
      snapshot = subscription.next() => snapshot,
    };
    let Some(run) = snapshot else {
      debug!("run channel ended");
      break;
    };

    let run_id = run.id.clone();
    match store.apply_snapshot(&current_run_id, run, &cancel) {
      ApplyOutcome::Applied => current_run_id = run_id,
      ApplyOutcome::Cancelled => break,
      ApplyOutcome::RunMismatch => {
        debug!(snapshot_run_id = %run_id, "store shows another run, closing channel");
        break;
      }
    }
  }

  subscription.dispose();
}
