//! Runview Run
//!
//! Data model for a single flow run as reported by the backend. A run is
//! always exchanged as a complete snapshot: the fetcher returns one, and the
//! live update channel streams more of them. Nothing in this crate merges
//! snapshots; a newer snapshot replaces the older one wholesale.

mod run;
mod step;

pub use run::{FlowRun, RunEnvironment, RunStatus};
pub use step::{LoopIndexMap, StepExecution, StepMap, StepOutput, StepStatus};
