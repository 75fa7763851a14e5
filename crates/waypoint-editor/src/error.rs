use thiserror::Error;
use waypoint_graph::GraphError;

/// Errors that can occur while editing a flow.
#[derive(Debug, Error)]
pub enum EditError {
  /// The flow or step does not exist in the workspace.
  #[error("not found: {0}")]
  NotFound(String),

  /// An identifier is malformed or points somewhere it may not.
  #[error("invalid reference: {0}")]
  InvalidReference(String),

  /// A field required to create a flow was not supplied.
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  /// The edited steps do not form a single tree.
  #[error("invalid step graph: {0}")]
  Graph(#[from] GraphError),

  /// The store failed; passed through unchanged.
  #[error("store error: {0}")]
  Store(#[source] waypoint_store::Error),
}

impl From<waypoint_store::Error> for EditError {
  fn from(err: waypoint_store::Error) -> Self {
    match err {
      waypoint_store::Error::NotFound(what) => EditError::NotFound(what),
      other => EditError::Store(other),
    }
  }
}
