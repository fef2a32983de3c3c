use runview_run::FlowRun;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create a connected sender/subscription pair.
///
/// The transport keeps the [`SnapshotSender`]; the caller gets the
/// [`RunSubscription`].
pub fn subscription_pair() -> (SnapshotSender, RunSubscription) {
  // Unbounded: at most one snapshot per step transition.
  let (sender, receiver) = mpsc::unbounded_channel();
  let cancel = CancellationToken::new();
  (
    SnapshotSender {
      sender,
      cancel: cancel.clone(),
    },
    RunSubscription { receiver, cancel },
  )
}

/// Transport-side handle used to deliver snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
  sender: mpsc::UnboundedSender<FlowRun>,
  cancel: CancellationToken,
}

impl SnapshotSender {
  /// Deliver a snapshot. Returns `false` once the subscription is gone.
  pub fn send(&self, run: FlowRun) -> bool {
    if self.cancel.is_cancelled() {
      return false;
    }
    self.sender.send(run).is_ok()
  }

  /// Resolves when the subscription has been disposed.
  pub async fn disposed(&self) {
    self.cancel.cancelled().await
  }

  pub fn is_disposed(&self) -> bool {
    self.cancel.is_cancelled() || self.sender.is_closed()
  }
}

/// Caller-side handle of an open run channel.
///
/// Dropping it tears the channel down.
#[derive(Debug)]
pub struct RunSubscription {
  receiver: mpsc::UnboundedReceiver<FlowRun>,
  cancel: CancellationToken,
}

impl RunSubscription {
  /// Wait for the next snapshot. Returns `None` when the stream ended or the
  /// subscription was disposed.
  pub async fn next(&mut self) -> Option<FlowRun> {
    if self.cancel.is_cancelled() {
      return None;
    }
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => None,
      run = self.receiver.recv() => run,
    }
  }

  /// Stop the channel. No snapshot is delivered after this returns; the
  /// transport observes [`SnapshotSender::disposed`] and shuts down on its
  /// own.
  pub fn dispose(&mut self) {
    self.cancel.cancel();
    self.receiver.close();
  }

  pub fn is_disposed(&self) -> bool {
    self.cancel.is_cancelled()
  }

  /// Token cancelled when this subscription is disposed.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }
}

impl Drop for RunSubscription {
  fn drop(&mut self) {
    self.dispose();
  }
}
