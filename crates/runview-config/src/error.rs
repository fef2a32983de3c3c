use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("duplicate step name: {0}")]
  DuplicateStepName(String),

  #[error("step name must not be empty")]
  EmptyStepName,
}
