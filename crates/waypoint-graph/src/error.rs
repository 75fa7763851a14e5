use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  #[error("no source step found (every step has a parent)")]
  NoRoot,

  #[error("multiple source steps found: {}", step_ids.join(", "))]
  MultipleRoots { step_ids: Vec<String> },

  #[error("duplicate step id: {0}")]
  DuplicateStep(String),
}
