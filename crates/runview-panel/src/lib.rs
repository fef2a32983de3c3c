//! Runview Panel
//!
//! Engine behind the run details panel of the flow builder.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  fetch_populated_run   ┌──────────────────────┐
//! │  RunSource   │ ─────────────────────► │                      │
//! └──────────────┘                        │    RunStateStore     │
//! ┌──────────────┐  snapshot per update   │  (run, selection,    │
//! │  RunChannel  │ ─────────────────────► │   loop indexes)      │
//! └──────────────┘                        └──────────┬───────────┘
//!                                                    │ on every change
//!                                                    ▼
//!                                  decide_message + resolve_step_output
//!                                                    │
//!                                                    ▼
//!                                          PanelView → PanelRenderer
//! ```
//!
//! Mounting a [`RunDetailsPanel`] starts the fetch and the live channel for
//! the run the store is showing. Unmounting (or dropping) it cancels both;
//! results arriving afterwards are discarded.
//!
//! # Usage
//!
//! ```ignore
//! let store = Arc::new(RunStateStore::with_run(flow_version, run));
//! let panel = RunDetailsPanel::mount(store.clone(), source, channel, PanelConfig::default());
//!
//! let mut views = panel.views();
//! while let Some(view) = views.next().await {
//!     renderer.render(&view);
//! }
//! ```

mod message;
mod panel;
mod view;

pub use message::{PanelMessage, decide_message};
pub use panel::{PanelConfig, PanelViews, RunDetailsPanel};
pub use view::{LoopSelection, PanelRenderer, PanelView, RunDetailsView};
