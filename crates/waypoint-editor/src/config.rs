use serde::{Deserialize, Serialize};

/// What happens to the children of a deleted step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
  /// Only the first child moves up to the deleted step's parent. Any other
  /// children are left pointing at the removed id and become unreachable.
  #[default]
  ReconnectFirst,
  /// Every child moves up to the deleted step's parent.
  ReconnectAll,
}

/// How concurrent saves of the same flow are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
  /// The last full-document write wins.
  #[default]
  LastWriterWins,
  /// A save only succeeds if nobody saved since the flow was loaded.
  Optimistic,
}

/// Configuration for the flow editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
  #[serde(default)]
  pub delete_policy: DeletePolicy,
  #[serde(default)]
  pub concurrency: ConcurrencyMode,
  /// Prefix for finish-effect animation assets.
  #[serde(default = "default_asset_base_url")]
  pub asset_base_url: String,
}

fn default_asset_base_url() -> String {
  "/assets/".to_string()
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      delete_policy: DeletePolicy::default(),
      concurrency: ConcurrencyMode::default(),
      asset_base_url: default_asset_base_url(),
    }
  }
}
