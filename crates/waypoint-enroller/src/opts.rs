use serde::{Deserialize, Serialize};
use waypoint_store::UserState;

/// Everything the resolver knows about the user being enrolled.
///
/// Flow ids are kept as the raw strings the caller sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentOpts {
  #[serde(default)]
  pub skipped_ids: Vec<String>,
  #[serde(default)]
  pub finished_ids: Vec<String>,
  /// Flow the user is part-way through. When set, nothing else is looked at.
  #[serde(default)]
  pub current_enrollment_id: Option<String>,
  /// Unix seconds; zero means unknown.
  #[serde(default)]
  pub sign_up_timestamp: Option<i64>,
  #[serde(default)]
  pub user_segment: Option<String>,
  /// Matched against explicit user-id targeting rules.
  #[serde(default)]
  pub user_id: Option<String>,
}

impl EnrollmentOpts {
  /// Build the options for a user from their stored progress and profile.
  pub fn from_state(state: &UserState, profile: &UserProfile) -> Self {
    Self {
      skipped_ids: state.skipped_flow_ids.iter().map(ToString::to_string).collect(),
      finished_ids: state
        .completed_flow_ids
        .iter()
        .map(ToString::to_string)
        .collect(),
      current_enrollment_id: state.current_flow_id.map(|id| id.to_string()),
      sign_up_timestamp: profile.sign_up_timestamp,
      user_segment: profile.segment.clone(),
      user_id: Some(profile.external_id.clone()),
    }
  }
}

/// The end user as known to the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub external_id: String,
  #[serde(default)]
  pub sign_up_timestamp: Option<i64>,
  #[serde(default)]
  pub segment: Option<String>,
}

/// Progress reported by the client for one flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStateUpdate {
  #[serde(default)]
  pub flow_id: String,
  #[serde(default)]
  pub current_step_id: Option<String>,
  #[serde(default)]
  pub finished: bool,
  #[serde(default)]
  pub skipped: bool,
}
