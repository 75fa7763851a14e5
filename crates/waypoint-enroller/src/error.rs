use thiserror::Error;

/// Errors that can occur while resolving or recording enrollment.
#[derive(Debug, Error)]
pub enum EnrollError {
  /// A flow id supplied by the caller is malformed.
  #[error("invalid reference: {0}")]
  InvalidReference(String),

  /// The store failed; passed through unchanged.
  #[error("store error: {0}")]
  Store(#[from] waypoint_store::Error),
}
