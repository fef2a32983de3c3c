use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use runview_run::FlowRun;
use tokio::sync::{RwLock, Semaphore};

use crate::{FetchError, RunSource};

/// In-memory run source.
///
/// Can be "held" so that fetches stay pending until [`release`] is called,
/// which lets callers observe what happens to in-flight requests.
///
/// [`release`]: MemoryRunSource::release
#[derive(Debug, Default)]
pub struct MemoryRunSource {
  runs: RwLock<HashMap<String, FlowRun>>,
  unreachable: RwLock<bool>,
  gate: Option<Arc<Semaphore>>,
  fetches: AtomicUsize,
}

impl MemoryRunSource {
  pub fn new() -> Self {
    Self::default()
  }

  /// A source whose fetches block until [`MemoryRunSource::release`].
  pub fn held() -> Self {
    Self {
      gate: Some(Arc::new(Semaphore::new(0))),
      ..Self::default()
    }
  }

  pub async fn insert(&self, run: FlowRun) {
    self.runs.write().await.insert(run.id.clone(), run);
  }

  pub async fn remove(&self, run_id: &str) -> Option<FlowRun> {
    self.runs.write().await.remove(run_id)
  }

  /// Make every fetch fail with [`FetchError::Transient`].
  pub async fn set_unreachable(&self, unreachable: bool) {
    *self.unreachable.write().await = unreachable;
  }

  /// Let one pending (or future) fetch through.
  pub fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.add_permits(1);
    }
  }

  /// Number of fetches started so far.
  pub fn fetch_count(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl RunSource for MemoryRunSource {
  async fn fetch_populated_run(&self, run_id: &str) -> Result<FlowRun, FetchError> {
    self.fetches.fetch_add(1, Ordering::SeqCst);

    if let Some(gate) = &self.gate {
      let permit = gate
        .acquire()
        .await
        .map_err(|_| FetchError::Transient("source closed".to_string()))?;
      permit.forget();
    }

    if *self.unreachable.read().await {
      return Err(FetchError::Transient("memory source unreachable".to_string()));
    }

    self
      .runs
      .read()
      .await
      .get(run_id)
      .cloned()
      .ok_or_else(|| FetchError::NotFound(run_id.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use runview_run::RunEnvironment;

  #[tokio::test]
  async fn test_fetch_existing_and_missing() {
    let source = MemoryRunSource::new();
    source
      .insert(FlowRun::new("run-1", "flow-1", "fv-1", RunEnvironment::Testing))
      .await;

    let run = source.fetch_populated_run("run-1").await.unwrap();
    assert_eq!(run.id, "run-1");

    let missing = source.fetch_populated_run("run-2").await;
    assert!(matches!(missing, Err(FetchError::NotFound(id)) if id == "run-2"));
    assert_eq!(source.fetch_count(), 2);
  }

  #[tokio::test]
  async fn test_unreachable_is_transient() {
    let source = MemoryRunSource::new();
    source.set_unreachable(true).await;

    let err = source.fetch_populated_run("run-1").await.unwrap_err();
    assert!(err.is_transient());
  }

  #[tokio::test]
  async fn test_held_source_waits_for_release() {
    let source = Arc::new(MemoryRunSource::held());
    source
      .insert(FlowRun::new("run-1", "flow-1", "fv-1", RunEnvironment::Testing))
      .await;

    let fetch = {
      let source = source.clone();
      tokio::spawn(async move { source.fetch_populated_run("run-1").await })
    };

    tokio::task::yield_now().await;
    assert!(!fetch.is_finished());

    source.release();
    let run = fetch.await.unwrap().unwrap();
    assert_eq!(run.id, "run-1");
  }
}
