//! Built-in finish animations.

use serde_json::Value;
use waypoint_config::{FinishEffect, FinishEffectKind};

pub const POSITION_MIDDLE_SCREEN: &str = "middle_screen";
pub const POSITION_BOTTOM_MIDDLE: &str = "bottom_middle";

struct Animation {
  name: &'static str,
  duration_s: u64,
  position: &'static str,
}

const CATALOG: &[Animation] = &[
  Animation {
    name: "fireworks_1",
    duration_s: 4,
    position: POSITION_BOTTOM_MIDDLE,
  },
  Animation {
    name: "confetti_1",
    duration_s: 2,
    position: POSITION_BOTTOM_MIDDLE,
  },
  Animation {
    name: "congratulations_1",
    duration_s: 5,
    position: POSITION_MIDDLE_SCREEN,
  },
];

/// Fill in asset url, duration and position for a full-screen animation.
///
/// The position is always reset to the middle of the screen; catalog
/// animations then get their own url, duration and position. Unknown names
/// keep whatever url and duration the caller sent. Other effect kinds are
/// left untouched.
pub fn apply_catalog(effect: &mut FinishEffect, asset_base_url: &str) {
  if effect.kind != FinishEffectKind::FullScreenAnimation {
    return;
  }

  effect.data.insert(
    "position".to_string(),
    Value::from(POSITION_MIDDLE_SCREEN),
  );

  let Some(animation) = effect
    .name()
    .and_then(|name| CATALOG.iter().find(|a| a.name == name))
  else {
    return;
  };

  let url = format!(
    "{}/{}.gif",
    asset_base_url.trim_end_matches('/'),
    animation.name
  );
  effect.data.insert("url".to_string(), Value::from(url));
  effect
    .data
    .insert("duration_s".to_string(), Value::from(animation.duration_s));
  effect
    .data
    .insert("position".to_string(), Value::from(animation.position));
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "https://cdn.example.com/assets/";

  #[test]
  fn test_fireworks() {
    let mut effect = FinishEffect::full_screen_animation("fireworks_1");
    apply_catalog(&mut effect, BASE);

    assert_eq!(
      effect.data["url"],
      "https://cdn.example.com/assets/fireworks_1.gif"
    );
    assert_eq!(effect.data["duration_s"], 4);
    assert_eq!(effect.data["position"], POSITION_BOTTOM_MIDDLE);
  }

  #[test]
  fn test_congratulations_stays_centered() {
    let mut effect = FinishEffect::full_screen_animation("congratulations_1");
    apply_catalog(&mut effect, "https://cdn.example.com/assets");

    assert_eq!(
      effect.data["url"],
      "https://cdn.example.com/assets/congratulations_1.gif"
    );
    assert_eq!(effect.data["duration_s"], 5);
    assert_eq!(effect.data["position"], POSITION_MIDDLE_SCREEN);
  }

  #[test]
  fn test_unknown_name_only_gets_position() {
    let mut effect = FinishEffect::full_screen_animation("balloons");
    effect
      .data
      .insert("url".to_string(), Value::from("https://mine/balloons.gif"));
    effect
      .data
      .insert("position".to_string(), Value::from(POSITION_BOTTOM_MIDDLE));

    apply_catalog(&mut effect, BASE);

    assert_eq!(effect.data["url"], "https://mine/balloons.gif");
    assert_eq!(effect.data["position"], POSITION_MIDDLE_SCREEN);
    assert!(!effect.data.contains_key("duration_s"));
  }

  #[test]
  fn test_other_kinds_untouched() {
    let mut effect = FinishEffect::default();
    apply_catalog(&mut effect, BASE);
    assert!(effect.data.is_empty());
  }
}
