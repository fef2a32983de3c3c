use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
  /// Loop indexes can only be set for loop steps.
  #[error("step '{0}' is not a loop step")]
  NotALoop(String),
}
