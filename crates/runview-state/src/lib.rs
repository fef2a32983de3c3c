//! Runview State
//!
//! The editor state shared between the run details panel and the rest of the
//! builder: which run is displayed, which step is selected, and which
//! iteration is selected for every loop step.
//!
//! [`RunStateStore`] is an owned container, injected wherever it is needed.
//! Every write is atomic and notifies subscribers; readers always see one
//! consistent [`BuilderState`].

mod error;
mod state;
mod store;

pub use error::StateError;
pub use state::{BuilderState, LeftSidebar};
pub use store::{ApplyOutcome, RunStateStore};
