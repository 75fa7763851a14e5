//! Flow analytics derived from tracked client events.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use waypoint_config::FlowId;
use waypoint_store::{EventKind, TrackedEvent};

/// Aggregated engagement numbers for one flow.
///
/// Times are in the unit of the client timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAnalytics {
  pub flow_id: FlowId,
  /// Distinct users with at least one event on the flow.
  pub views: usize,
  /// Mean time between a user's first start and first finish of each step.
  pub avg_step_time: BTreeMap<String, i64>,
  /// Sum of the per-step means.
  pub avg_total_time: i64,
  pub finished: usize,
  pub skipped: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Span {
  start: Option<i64>,
  finish: Option<i64>,
}

impl FlowAnalytics {
  /// Aggregate the events recorded for `flow_id`, in recording order.
  ///
  /// A step visit only counts towards the step time once the user has both
  /// started and finished it.
  pub fn from_events(flow_id: FlowId, events: &[TrackedEvent]) -> Self {
    let views = events
      .iter()
      .map(|e| e.user_id.as_str())
      .collect::<HashSet<_>>()
      .len();
    let count = |kind: EventKind| events.iter().filter(|e| e.kind == kind).count();

    let avg_step_time = step_times(events);
    let avg_total_time = avg_step_time.values().sum();

    Self {
      flow_id,
      views,
      avg_step_time,
      avg_total_time,
      finished: count(EventKind::FlowFinished),
      skipped: count(EventKind::FlowSkipped),
    }
  }
}

fn step_times(events: &[TrackedEvent]) -> BTreeMap<String, i64> {
  let mut spans: BTreeMap<&str, HashMap<&str, Span>> = BTreeMap::new();

  for event in events {
    if !matches!(event.kind, EventKind::FlowStepStart | EventKind::FlowStepFinish) {
      continue;
    }
    let Some(step_id) = event.step_id() else {
      continue;
    };

    let span = spans
      .entry(step_id)
      .or_default()
      .entry(event.user_id.as_str())
      .or_default();
    let slot = match event.kind {
      EventKind::FlowStepStart => &mut span.start,
      _ => &mut span.finish,
    };
    slot.get_or_insert(event.timestamp);
  }

  spans
    .into_iter()
    .filter_map(|(step_id, users)| {
      let durations: Vec<i64> = users
        .values()
        .filter_map(|span| Some(span.finish? - span.start?))
        .collect();
      if durations.is_empty() {
        return None;
      }
      let mean = durations.iter().sum::<i64>() / durations.len() as i64;
      Some((step_id.to_string(), mean))
    })
    .collect()
}
