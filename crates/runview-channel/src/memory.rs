use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use runview_run::FlowRun;

use crate::subscription::{SnapshotSender, subscription_pair};
use crate::{ChannelError, RunChannel, RunFlowRequest, RunSubscription};

/// In-process run channel driven by the caller.
///
/// Records every open request and lets the caller push snapshots to the
/// most recently opened subscription.
#[derive(Debug, Default)]
pub struct MemoryRunChannel {
  requests: Mutex<Vec<(RunFlowRequest, Option<FlowRun>)>>,
  latest: Mutex<Option<SnapshotSender>>,
  refuse: AtomicBool,
}

impl MemoryRunChannel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make subsequent opens fail with a connect error.
  pub fn set_refuse(&self, refuse: bool) {
    self.refuse.store(refuse, Ordering::SeqCst);
  }

  /// Push a snapshot to the latest subscription. Returns `false` if there is
  /// none or it was disposed.
  pub fn emit(&self, run: FlowRun) -> bool {
    let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
    latest.as_ref().is_some_and(|sender| sender.send(run))
  }

  /// End the stream of the latest subscription.
  pub fn finish(&self) {
    self.latest.lock().unwrap_or_else(|e| e.into_inner()).take();
  }

  /// Whether the latest subscription has been disposed by its owner.
  pub fn is_disposed(&self) -> bool {
    let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
    latest.as_ref().is_none_or(SnapshotSender::is_disposed)
  }

  /// Requests received so far, oldest first.
  pub fn requests(&self) -> Vec<(RunFlowRequest, Option<FlowRun>)> {
    self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }
}

#[async_trait]
impl RunChannel for MemoryRunChannel {
  async fn open(
    &self,
    request: RunFlowRequest,
    initial_run: Option<FlowRun>,
  ) -> Result<RunSubscription, ChannelError> {
    if self.refuse.load(Ordering::SeqCst) {
      return Err(ChannelError::Connect {
        url: "memory".to_string(),
        message: "connection refused".to_string(),
      });
    }

    self
      .requests
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push((request, initial_run));

    let (sender, subscription) = subscription_pair();
    *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(sender);
    Ok(subscription)
  }
}
