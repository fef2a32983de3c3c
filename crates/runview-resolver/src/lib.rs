//! Step output resolution.
//!
//! A run records steps that live inside loops once per iteration, nested in
//! the loop step's execution record:
//!
//! ```text
//! run.steps
//! ├── step_1
//! └── each_order            (loop)
//!     ├── iterations[0]
//!     │   └── notify
//!     └── iterations[1]
//!         └── notify
//! ```
//!
//! Resolving `notify` means walking the flow definition to find the enclosing
//! loops, then descending through the iteration the editor has selected for
//! each of them (the last one when nothing is selected).

mod resolver;

pub use resolver::{loop_iteration_count, resolve_step_output, trigger_output};
