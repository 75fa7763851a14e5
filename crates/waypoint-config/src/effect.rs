use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishEffectKind {
  #[default]
  None,
  FullScreenAnimation,
}

/// What the client plays when a user reaches a final step.
///
/// `data` is an open object; for full-screen animations the keys `name`,
/// `url`, `duration_s` and `position` are understood.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishEffect {
  #[serde(rename = "type", default)]
  pub kind: FinishEffectKind,
  #[serde(default)]
  pub data: Map<String, Value>,
}

impl FinishEffect {
  pub fn full_screen_animation(name: &str) -> Self {
    let mut data = Map::new();
    data.insert("name".to_string(), Value::String(name.to_string()));
    Self {
      kind: FinishEffectKind::FullScreenAnimation,
      data,
    }
  }

  /// The `name` entry of `data`, if it is a string.
  pub fn name(&self) -> Option<&str> {
    self.data.get("name").and_then(Value::as_str)
  }
}
