use serde::{Deserialize, Serialize};

/// Audience rules attached to a flow.
///
/// Rules of the same kind are alternatives (any one matching admits the
/// user). Different kinds must all be satisfied. A `UserId` rule takes the
/// flow out of the generic audience entirely: only the named users can be
/// enrolled into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
  #[serde(default)]
  pub targeting_id: String,
  #[serde(default)]
  pub rules: Vec<TargetingRule>,
}

impl Targeting {
  pub fn new(rules: Vec<TargetingRule>) -> Self {
    Self {
      targeting_id: String::new(),
      rules,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", content = "value", rename_all = "snake_case")]
pub enum TargetingRule {
  /// Whole days since registration must be at least this value.
  ElapsedDaysSinceRegistration(i64),
  /// Registration (unix seconds) must be at or after this value.
  RegisteredAfter(i64),
  /// The user's segment must equal this value.
  UserSegment(String),
  /// Only this user may be enrolled.
  UserId(String),
}
