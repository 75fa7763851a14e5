use serde::{Deserialize, Serialize};

use crate::effect::FinishEffect;
use crate::enums::ElementTemplate;
use crate::flow::{Segment, Trigger};
use crate::step::Step;
use crate::targeting::Targeting;

/// A sparse update to a flow.
///
/// `None` fields are left untouched. A present-but-empty collection is
/// meaningful: `segments: Some(vec![])` turns segmentation off and
/// `depends_on: Some(vec![])` clears the dependency list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub opts: Option<OptsPatch>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub updated_steps: Vec<Step>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub deleted_steps: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub new_steps: Vec<Step>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub segments: Option<Vec<Segment>>,
  /// Raw flow ids; validated by the editor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub depends_on: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trigger: Option<Trigger>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub targeting: Option<Targeting>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub finish_effect: Option<FinishEffect>,
  /// Reject the update unless the stored flow is at this revision.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expected_revision: Option<u64>,
}

/// Visual options. Empty `theme_color` and absent `element_template` keep the
/// current value; `avatar_id` is always replaced, so `None` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptsPatch {
  #[serde(default)]
  pub theme_color: String,
  #[serde(default)]
  pub avatar_id: Option<String>,
  #[serde(default)]
  pub element_template: Option<ElementTemplate>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_absent_and_empty_segments_are_distinct() {
    let absent: FlowUpdate = serde_json::from_str("{}").unwrap();
    assert_eq!(absent.segments, None);

    let empty: FlowUpdate = serde_json::from_str(r#"{"segments": []}"#).unwrap();
    assert_eq!(empty.segments, Some(vec![]));
  }
}
