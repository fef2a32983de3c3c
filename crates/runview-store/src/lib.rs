//! Runview Store
//!
//! Read access to the backend that owns flow runs. The [`RunSource`] trait is
//! the "get populated run by id" endpoint; [`FlagSource`] supplies the
//! platform flags the run details panel depends on.
//!
//! Neither trait writes anything: callers decide where fetched data goes.

mod flags;
mod http;
mod memory;

pub use flags::{FlagSource, HttpFlagSource, RETENTION_DAYS_FLAG, StaticFlagSource};
pub use http::{HttpConfig, HttpRunSource};
pub use memory::MemoryRunSource;

use async_trait::async_trait;
use runview_run::FlowRun;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  /// The requested run no longer exists.
  #[error("run not found: {0}")]
  NotFound(String),

  /// The backend could not be reached. Callers may retry.
  #[error("backend unreachable: {0}")]
  Transient(String),

  /// The backend answered with an unexpected status.
  #[error("unexpected response status {status}: {body}")]
  Http { status: u16, body: String },

  /// The response body could not be decoded.
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// The HTTP client could not be built.
  #[error("failed to build http client: {0}")]
  Client(String),

  /// The configured base URL is unusable.
  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
  /// Whether retrying the same request may succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Transient(_))
  }
}

/// Source of populated flow runs.
#[async_trait]
pub trait RunSource: Send + Sync {
  /// Fetch the latest complete snapshot of a run, including its steps.
  async fn fetch_populated_run(&self, run_id: &str) -> Result<FlowRun, FetchError>;
}
