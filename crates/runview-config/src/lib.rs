//! Runview Config
//!
//! This crate contains the serializable flow definition types for runview.
//! A [`FlowVersion`] is the static workflow metadata the run details engine
//! needs next to a run: the trigger and the (possibly nested) step tree.
//!
//! Definitions can be loaded from:
//! - JSON files (via the CLI with `--flow-version=flow.json`)
//! - The editor state, which owns the flow version being edited
//!
//! The resolver walks these definitions to find which loop steps enclose a
//! given step before descending into a run's nested iteration maps.

mod enums;
mod error;
mod flow;
mod step;
mod trigger;

pub use enums::{StepType, TriggerKind};
pub use error::FlowError;
pub use flow::FlowVersion;
pub use step::{StepDef, StepKind};
pub use trigger::Trigger;
