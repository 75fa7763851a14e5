use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waypoint_config::FlowId;

/// Enrollment progress of one user within one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
  pub workspace_id: String,
  pub user_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_flow_id: Option<FlowId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_step_id: Option<String>,
  #[serde(default)]
  pub completed_flow_ids: BTreeSet<FlowId>,
  #[serde(default)]
  pub skipped_flow_ids: BTreeSet<FlowId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_submitted_flow_id: Option<FlowId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_submitted_at: Option<DateTime<Utc>>,
}

impl UserState {
  pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>) -> Self {
    Self {
      workspace_id: workspace_id.into(),
      user_id: user_id.into(),
      current_flow_id: None,
      current_step_id: None,
      completed_flow_ids: BTreeSet::new(),
      skipped_flow_ids: BTreeSet::new(),
      last_submitted_flow_id: None,
      last_submitted_at: None,
    }
  }

  /// Forget all progress, keeping the identity.
  pub fn reset(&mut self) {
    *self = Self::new(
      std::mem::take(&mut self.workspace_id),
      std::mem::take(&mut self.user_id),
    );
  }
}

/// Metadata key carrying the step an event refers to.
pub const STEP_ID_KEY: &str = "step_id";

/// Kind of client interaction being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  HelperClick,
  HelperHover,
  HelperClose,
  FlowStepStart,
  FlowStepFinish,
  FlowSkipped,
  FlowFinished,
}

/// One interaction reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEvent {
  #[serde(default)]
  pub workspace_id: String,
  #[serde(default)]
  pub user_id: String,
  /// The flow or helper the event is about.
  pub entity_id: String,
  #[serde(rename = "event_type")]
  pub kind: EventKind,
  /// Client clock, in whatever unit the client reports.
  pub timestamp: i64,
  #[serde(default)]
  pub metadata: BTreeMap<String, String>,
}

impl TrackedEvent {
  pub fn new(entity_id: impl Into<String>, kind: EventKind, timestamp: i64) -> Self {
    Self {
      workspace_id: String::new(),
      user_id: String::new(),
      entity_id: entity_id.into(),
      kind,
      timestamp,
      metadata: BTreeMap::new(),
    }
  }

  /// Attach the step this event refers to.
  pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
    self.metadata.insert(STEP_ID_KEY.to_string(), step_id.into());
    self
  }

  pub fn step_id(&self) -> Option<&str> {
    self.metadata.get(STEP_ID_KEY).map(String::as_str)
  }
}
