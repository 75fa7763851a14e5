use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::effect::FinishEffect;
use crate::enums::{ElementTemplate, TriggerKind};
use crate::relation::Relation;
use crate::step::Step;
use crate::targeting::Targeting;

pub type FlowId = Uuid;

/// A tour owned by a single workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
  pub id: FlowId,
  pub workspace_id: String,
  pub name: String,
  #[serde(default)]
  pub base_url: String,
  #[serde(default)]
  pub segments: Vec<Segment>,
  #[serde(default)]
  pub steps: Vec<Step>,
  /// Derived from the steps' parent references.
  #[serde(default)]
  pub relations: Vec<Relation>,
  #[serde(default)]
  pub opts: FlowOpts,
  #[serde(default)]
  pub live: bool,
  /// Bumped by the store on every successful save.
  #[serde(default)]
  pub revision: u64,
  pub created_at: DateTime<Utc>,
}

impl Flow {
  /// Create an empty, unpublished flow with a fresh id.
  pub fn new(workspace_id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      workspace_id: workspace_id.into(),
      name: name.into(),
      base_url: String::new(),
      segments: Vec::new(),
      steps: Vec::new(),
      relations: Vec::new(),
      opts: FlowOpts::default(),
      live: false,
      revision: 0,
      created_at: Utc::now(),
    }
  }

  pub fn summary(&self) -> FlowSummary {
    FlowSummary {
      id: self.id,
      name: self.name.clone(),
      live: self.live,
    }
  }

  pub fn depends_on(&self, other: FlowId) -> bool {
    self.opts.depends_on.contains(&other)
  }
}

/// A named sub-audience used for branching inside a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
  #[serde(default)]
  pub segment_id: String,
  pub name: String,
  #[serde(default)]
  pub icon_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
  #[serde(default)]
  pub trigger_id: String,
  #[serde(rename = "type", default)]
  pub kind: TriggerKind,
  #[serde(default)]
  pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOpts {
  #[serde(default)]
  pub segmentation: bool,
  #[serde(default = "default_theme_color")]
  pub theme_color: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar_id: Option<String>,
  #[serde(default)]
  pub element_template: ElementTemplate,
  #[serde(default)]
  pub trigger: Trigger,
  #[serde(default)]
  pub targeting: Targeting,
  /// Flows that must be finished before this one is offered.
  #[serde(default)]
  pub depends_on: Vec<FlowId>,
  #[serde(default)]
  pub finish_effect: FinishEffect,
}

fn default_theme_color() -> String {
  "#000000".to_string()
}

impl Default for FlowOpts {
  fn default() -> Self {
    Self {
      segmentation: false,
      theme_color: default_theme_color(),
      avatar_id: None,
      element_template: ElementTemplate::Light,
      trigger: Trigger::default(),
      targeting: Targeting::default(),
      depends_on: Vec::new(),
      finish_effect: FinishEffect::default(),
    }
  }
}

/// The minimum an editor needs to list flows in a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSummary {
  pub id: FlowId,
  pub name: String,
  pub live: bool,
}
