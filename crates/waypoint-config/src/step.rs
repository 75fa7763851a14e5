use serde::{Deserialize, Serialize};

use crate::enums::{BlockKind, ElementTemplate, ElementType};

/// One node of a flow's step tree.
///
/// `step_id` is assigned by the editor, never generated here. A step with no
/// parent is the source of the tree; there must be exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
  pub step_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_step_id: Option<String>,
  #[serde(default)]
  pub data: StepData,
  #[serde(default)]
  pub opts: StepOpts,
}

impl Step {
  pub fn new(step_id: impl Into<String>, parent_step_id: Option<&str>) -> Self {
    Self {
      step_id: step_id.into(),
      parent_step_id: parent_step_id.map(str::to_string),
      data: StepData::default(),
      opts: StepOpts::default(),
    }
  }

  /// Parent reference, with an empty string treated as "no parent".
  pub fn parent(&self) -> Option<&str> {
    self.parent_step_id.as_deref().filter(|id| !id.is_empty())
  }

  /// Segment tag, with an empty string treated as "untagged".
  pub fn segment(&self) -> Option<&str> {
    self.opts.segment_id.as_deref().filter(|id| !id.is_empty())
  }

  pub fn set_parent(&mut self, parent: Option<&str>) {
    self.parent_step_id = parent.filter(|id| !id.is_empty()).map(str::to_string);
  }
}

/// Content shown for a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepData {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_url: Option<String>,
  /// CSS selector of the element the step is anchored to.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assigned_css_element: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub element_type: Option<ElementType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub placement: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub element_template: Option<ElementTemplate>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub blocks: Vec<StepBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepBlock {
  #[serde(rename = "type")]
  pub kind: BlockKind,
  pub data: String,
}

/// Per-step options.
///
/// `is_source` and `is_final` are derived by relation recomputation and
/// overwritten on every structural edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOpts {
  #[serde(default)]
  pub is_source: bool,
  #[serde(default)]
  pub is_final: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub segment_id: Option<String>,
  #[serde(default)]
  pub transition: StepTransition,
  #[serde(default)]
  pub actionable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub in_animation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub out_animation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub loop_animation: Option<String>,
}
