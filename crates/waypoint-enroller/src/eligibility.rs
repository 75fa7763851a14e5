//! The enrollment predicate.
//!
//! A flow is eligible when all of these hold:
//! - every flow it depends on is finished
//! - it is neither finished nor skipped
//! - it passes the generic audience rules, or it explicitly targets the user
//!
//! Within the generic audience rules each kind of rule (elapsed days,
//! registered after, segment) is satisfied when the flow has no rule of that
//! kind or any one of its rules of that kind matches. A flow with any
//! user-id rule never passes the generic path.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;
use waypoint_config::{Flow, FlowId, TargetingRule};

use crate::opts::EnrollmentOpts;

/// Enrollment context evaluated against candidate flows.
#[derive(Debug, Clone)]
pub struct Eligibility<'a> {
  finished: HashSet<FlowId>,
  skipped: HashSet<FlowId>,
  sign_up_timestamp: Option<i64>,
  elapsed_days: Option<i64>,
  segment: Option<&'a str>,
  user_id: Option<&'a str>,
}

impl<'a> Eligibility<'a> {
  pub fn new(opts: &'a EnrollmentOpts, now: DateTime<Utc>) -> Self {
    // Zero is what clients send when the signup time is unknown.
    let sign_up_timestamp = opts.sign_up_timestamp.filter(|&ts| ts != 0);
    let elapsed_days = sign_up_timestamp
      .and_then(|ts| DateTime::from_timestamp(ts, 0))
      .map(|signed_up| (now - signed_up).num_days());

    Self {
      finished: parse_ids(&opts.finished_ids, "finished"),
      skipped: parse_ids(&opts.skipped_ids, "skipped"),
      sign_up_timestamp,
      elapsed_days,
      segment: opts.user_segment.as_deref().filter(|s| !s.is_empty()),
      user_id: opts.user_id.as_deref().filter(|s| !s.is_empty()),
    }
  }

  /// Whether `flow` may be offered, ignoring its publish state.
  pub fn admits(&self, flow: &Flow) -> bool {
    self.dependencies_met(flow)
      && !self.excluded(flow)
      && (self.generic_audience(flow) || self.explicit_target(flow))
  }

  pub fn dependencies_met(&self, flow: &Flow) -> bool {
    flow
      .opts
      .depends_on
      .iter()
      .all(|id| self.finished.contains(id))
  }

  pub fn excluded(&self, flow: &Flow) -> bool {
    self.finished.contains(&flow.id) || self.skipped.contains(&flow.id)
  }

  pub fn generic_audience(&self, flow: &Flow) -> bool {
    let rules = &flow.opts.targeting.rules;

    if rules.iter().any(|r| matches!(r, TargetingRule::UserId(_))) {
      return false;
    }

    let elapsed = absent_or_any(rules, |rule| match rule {
      TargetingRule::ElapsedDaysSinceRegistration(days) => {
        Some(self.elapsed_days.is_some_and(|elapsed| elapsed >= *days))
      }
      _ => None,
    });
    let registered = absent_or_any(rules, |rule| match rule {
      TargetingRule::RegisteredAfter(threshold) => {
        Some(self.sign_up_timestamp.is_some_and(|ts| ts >= *threshold))
      }
      _ => None,
    });
    let segment = absent_or_any(rules, |rule| match rule {
      TargetingRule::UserSegment(value) => Some(self.segment == Some(value.as_str())),
      _ => None,
    });

    elapsed && registered && segment
  }

  pub fn explicit_target(&self, flow: &Flow) -> bool {
    let Some(user_id) = self.user_id else {
      return false;
    };
    flow
      .opts
      .targeting
      .rules
      .iter()
      .any(|r| matches!(r, TargetingRule::UserId(value) if value == user_id))
  }
}

/// `check` returns `None` for rules of other kinds.
fn absent_or_any(rules: &[TargetingRule], check: impl Fn(&TargetingRule) -> Option<bool>) -> bool {
  let mut present = false;
  for outcome in rules.iter().filter_map(check) {
    if outcome {
      return true;
    }
    present = true;
  }
  !present
}

fn parse_ids(raw: &[String], list: &str) -> HashSet<FlowId> {
  raw
    .iter()
    .filter_map(|value| match Uuid::parse_str(value.trim()) {
      Ok(id) => Some(id),
      Err(_) => {
        warn!(list, id = %value, "ignoring malformed flow id");
        None
      }
    })
    .collect()
}
