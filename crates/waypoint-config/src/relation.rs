use serde::{Deserialize, Serialize};

/// A parent -> child edge between two steps of the same flow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
  pub from: String,
  pub to: String,
}

impl Relation {
  pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
    Self {
      from: from.into(),
      to: to.into(),
    }
  }
}
