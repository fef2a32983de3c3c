//! Runview Channel
//!
//! The live update channel asks the backend to run (or continue) a flow
//! version and streams complete run snapshots back while it executes.
//!
//! ```text
//! RunChannel::open(request, initial_run)
//!        │
//!        ▼
//! ┌──────────────────────────────┐      ┌──────────────────────┐
//! │ transport task (ws, memory)  │ ───► │ RunSubscription      │
//! │ - sends the run_flow frame   │      │ - next() -> FlowRun  │
//! │ - decodes snapshot frames    │      │ - dispose() / Drop   │
//! └──────────────────────────────┘      └──────────────────────┘
//! ```
//!
//! Every snapshot is a full [`FlowRun`](runview_run::FlowRun), never a diff.
//! Disposing the subscription cancels the transport task and guarantees that
//! `next()` yields nothing further.

mod memory;
mod protocol;
mod subscription;
mod ws;

pub use memory::MemoryRunChannel;
pub use protocol::{ClientFrame, ServerFrame};
pub use subscription::{RunSubscription, SnapshotSender, subscription_pair};
pub use ws::WsRunChannel;

use async_trait::async_trait;
use runview_run::FlowRun;

/// Errors raised while opening or driving a run channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
  /// The transport could not be connected.
  #[error("failed to connect to {url}: {message}")]
  Connect { url: String, message: String },

  /// A frame could not be sent.
  #[error("failed to send frame: {0}")]
  Send(String),

  /// A frame could not be encoded.
  #[error("failed to encode frame: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Request to run, or continue running, a flow version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFlowRequest {
  pub flow_version_id: String,
}

/// A transport able to open live update channels.
#[async_trait]
pub trait RunChannel: Send + Sync {
  /// Send the run request and start streaming snapshots.
  ///
  /// `initial_run` is the run the editor already holds, passed along so the
  /// backend can continue it instead of starting over.
  async fn open(
    &self,
    request: RunFlowRequest,
    initial_run: Option<FlowRun>,
  ) -> Result<RunSubscription, ChannelError>;
}
