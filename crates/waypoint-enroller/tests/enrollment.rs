//! Integration tests for enrollment resolution and state transitions.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use waypoint_config::{Flow, Targeting, TargetingRule};
use waypoint_enroller::{
  EnrollError, Enroller, EnrollmentOpts, EnrollmentService, FlowStateUpdate, UserProfile,
};
use waypoint_store::{Error as StoreError, EventKind, MemoryStore, Store, TrackedEvent};

const WS: &str = "ws-1";

fn now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn live(name: &str) -> Flow {
  let mut flow = Flow::new(WS, name);
  flow.live = true;
  flow
}

async fn seed(store: &MemoryStore, flows: &[&Flow]) {
  for flow in flows {
    store.insert_flow(flow).await.unwrap();
  }
}

#[tokio::test]
async fn test_dependency_chain() {
  let store = Arc::new(MemoryStore::new());
  let a = live("A");
  let mut b = live("B");
  b.opts.depends_on = vec![a.id];
  seed(&store, &[&b, &a]).await;

  let enroller = Enroller::new(store);

  let first = enroller
    .resolve_at(WS, &EnrollmentOpts::default(), now())
    .await
    .unwrap();
  assert_eq!(first.map(|f| f.name), Some("A".to_string()));

  let opts = EnrollmentOpts {
    finished_ids: vec![a.id.to_string()],
    ..EnrollmentOpts::default()
  };
  let second = enroller.resolve_at(WS, &opts, now()).await.unwrap();
  assert_eq!(second.map(|f| f.name), Some("B".to_string()));
}

#[tokio::test]
async fn test_only_live_flows_of_the_workspace() {
  let store = Arc::new(MemoryStore::new());
  let draft = Flow::new(WS, "Draft");
  let mut foreign = Flow::new("ws-2", "Foreign");
  foreign.live = true;
  seed(&store, &[&draft, &foreign]).await;

  let enroller = Enroller::new(store.clone());
  let none = enroller
    .resolve_at(WS, &EnrollmentOpts::default(), now())
    .await
    .unwrap();
  assert!(none.is_none());

  let published = live("Published");
  store.insert_flow(&published).await.unwrap();
  let found = enroller
    .resolve_at(WS, &EnrollmentOpts::default(), now())
    .await
    .unwrap();
  assert_eq!(found.map(|f| f.id), Some(published.id));
}

#[tokio::test]
async fn test_first_qualifying_flow_in_store_order() {
  let store = Arc::new(MemoryStore::new());
  let mut admins_only = live("Admins");
  admins_only.opts.targeting = Targeting::new(vec![TargetingRule::UserSegment("admins".to_string())]);
  let everyone = live("Everyone");
  let also_everyone = live("Also everyone");
  seed(&store, &[&admins_only, &everyone, &also_everyone]).await;

  let enroller = Enroller::new(store);
  let opts = EnrollmentOpts {
    user_segment: Some("guests".to_string()),
    ..EnrollmentOpts::default()
  };
  let selected = enroller.resolve_at(WS, &opts, now()).await.unwrap().unwrap();
  assert_eq!(selected.id, everyone.id);
}

#[tokio::test]
async fn test_resume_takes_precedence() {
  let store = Arc::new(MemoryStore::new());
  let other = live("Other");
  let mut current = live("Current");
  current.opts.depends_on = vec![other.id];
  current.opts.targeting = Targeting::new(vec![TargetingRule::UserSegment("nobody".to_string())]);
  seed(&store, &[&other, &current]).await;

  let enroller = Enroller::new(store);
  let opts = EnrollmentOpts {
    current_enrollment_id: Some(current.id.to_string()),
    skipped_ids: vec![current.id.to_string()],
    ..EnrollmentOpts::default()
  };
  let resumed = enroller.resolve_at(WS, &opts, now()).await.unwrap();
  assert_eq!(resumed.map(|f| f.id), Some(current.id));
}

#[tokio::test]
async fn test_resume_requires_live_flow_in_workspace() {
  let store = Arc::new(MemoryStore::new());
  let fallback = live("Fallback");
  let draft = Flow::new(WS, "Draft");
  let mut foreign = Flow::new("ws-2", "Foreign");
  foreign.live = true;
  seed(&store, &[&fallback, &draft, &foreign]).await;

  let enroller = Enroller::new(store);
  for id in [draft.id, foreign.id, uuid_like_missing()] {
    let opts = EnrollmentOpts {
      current_enrollment_id: Some(id.to_string()),
      ..EnrollmentOpts::default()
    };
    assert!(enroller.resolve_at(WS, &opts, now()).await.unwrap().is_none());
  }

  let opts = EnrollmentOpts {
    current_enrollment_id: Some("garbage".to_string()),
    ..EnrollmentOpts::default()
  };
  assert!(matches!(
    enroller.resolve_at(WS, &opts, now()).await,
    Err(EnrollError::InvalidReference(_))
  ));
}

fn uuid_like_missing() -> waypoint_config::FlowId {
  Flow::new(WS, "never stored").id
}

#[tokio::test]
async fn test_override_precedence() {
  let store = Arc::new(MemoryStore::new());
  let mut vip = live("VIP");
  vip.opts.targeting = Targeting::new(vec![
    TargetingRule::UserId("u-42".to_string()),
    TargetingRule::ElapsedDaysSinceRegistration(1000),
  ]);
  seed(&store, &[&vip]).await;

  let enroller = Enroller::new(store);
  let signed_up = (now() - Duration::days(2)).timestamp();

  let matching = EnrollmentOpts {
    user_id: Some("u-42".to_string()),
    sign_up_timestamp: Some(signed_up),
    ..EnrollmentOpts::default()
  };
  let selected = enroller.resolve_at(WS, &matching, now()).await.unwrap();
  assert_eq!(selected.map(|f| f.id), Some(vip.id));

  let other = EnrollmentOpts {
    user_id: Some("u-7".to_string()),
    sign_up_timestamp: Some(signed_up),
    ..EnrollmentOpts::default()
  };
  assert!(enroller.resolve_at(WS, &other, now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_enroll_remembers_current_flow() {
  let store = Arc::new(MemoryStore::new());
  let a = live("A");
  let mut b = live("B");
  b.opts.depends_on = vec![a.id];
  seed(&store, &[&a, &b]).await;

  let service = EnrollmentService::new(store);
  let profile = UserProfile {
    external_id: "u-1".to_string(),
    ..UserProfile::default()
  };

  let enrolled = service.enroll_at(WS, &profile, now()).await.unwrap().unwrap();
  assert_eq!(enrolled.id, a.id);
  let state = service.state(WS, "u-1").await.unwrap().unwrap();
  assert_eq!(state.current_flow_id, Some(a.id));

  // Resuming keeps the same flow.
  let again = service.enroll_at(WS, &profile, now()).await.unwrap().unwrap();
  assert_eq!(again.id, a.id);

  let update = FlowStateUpdate {
    flow_id: a.id.to_string(),
    finished: true,
    ..FlowStateUpdate::default()
  };
  let state = service
    .update_flow_state_at(WS, "u-1", update, now())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(state.current_flow_id, None);
  assert!(state.completed_flow_ids.contains(&a.id));
  assert_eq!(state.last_submitted_flow_id, Some(a.id));

  let next = service.enroll_at(WS, &profile, now()).await.unwrap().unwrap();
  assert_eq!(next.id, b.id);
}

#[tokio::test]
async fn test_enroll_without_match_still_creates_state() {
  let store = Arc::new(MemoryStore::new());
  let service = EnrollmentService::new(store);
  let profile = UserProfile {
    external_id: "u-1".to_string(),
    ..UserProfile::default()
  };

  assert!(service.enroll_at(WS, &profile, now()).await.unwrap().is_none());
  let state = service.state(WS, "u-1").await.unwrap().unwrap();
  assert_eq!(state.current_flow_id, None);
}

#[tokio::test]
async fn test_skip_then_finish() {
  let store = Arc::new(MemoryStore::new());
  let flow = live("A");
  seed(&store, &[&flow]).await;
  let service = EnrollmentService::new(store);

  let skip = FlowStateUpdate {
    flow_id: flow.id.to_string(),
    current_step_id: Some("step-3".to_string()),
    skipped: true,
    ..FlowStateUpdate::default()
  };
  let state = service
    .update_flow_state_at(WS, "u-1", skip.clone(), now())
    .await
    .unwrap()
    .unwrap();
  assert!(state.skipped_flow_ids.contains(&flow.id));
  assert_eq!(state.current_step_id.as_deref(), Some("step-3"));
  assert_eq!(state.last_submitted_at, Some(now()));

  // A repeated report does not duplicate the id.
  let state = service
    .update_flow_state_at(WS, "u-1", skip, now())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(state.skipped_flow_ids.len(), 1);

  let later = now() + Duration::minutes(5);
  let finish = FlowStateUpdate {
    flow_id: flow.id.to_string(),
    finished: true,
    ..FlowStateUpdate::default()
  };
  let state = service
    .update_flow_state_at(WS, "u-1", finish, later)
    .await
    .unwrap()
    .unwrap();
  assert!(state.skipped_flow_ids.is_empty());
  assert!(state.completed_flow_ids.contains(&flow.id));
  assert_eq!(state.last_submitted_at, Some(later));
  assert_eq!(state.current_step_id, None);
}

#[tokio::test]
async fn test_empty_update_is_a_noop() {
  let store = Arc::new(MemoryStore::new());
  let service = EnrollmentService::new(store);

  let update = FlowStateUpdate {
    flow_id: "whatever".to_string(),
    current_step_id: Some(String::new()),
    ..FlowStateUpdate::default()
  };
  assert!(service
    .update_flow_state_at(WS, "u-1", update, now())
    .await
    .unwrap()
    .is_none());
  assert!(service.state(WS, "u-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_outcome_with_malformed_flow_id() {
  let store = Arc::new(MemoryStore::new());
  let service = EnrollmentService::new(store);

  let update = FlowStateUpdate {
    flow_id: "not-a-flow".to_string(),
    finished: true,
    ..FlowStateUpdate::default()
  };
  assert!(matches!(
    service.update_flow_state_at(WS, "u-1", update, now()).await,
    Err(EnrollError::InvalidReference(_))
  ));
}

#[tokio::test]
async fn test_reset_clears_progress() {
  let store = Arc::new(MemoryStore::new());
  let flow = live("A");
  seed(&store, &[&flow]).await;
  let service = EnrollmentService::new(store);

  let finish = FlowStateUpdate {
    flow_id: flow.id.to_string(),
    finished: true,
    ..FlowStateUpdate::default()
  };
  service
    .update_flow_state_at(WS, "u-1", finish, now())
    .await
    .unwrap();

  service.reset(WS, "u-1").await.unwrap();
  let state = service.state(WS, "u-1").await.unwrap().unwrap();
  assert!(state.completed_flow_ids.is_empty());
  assert_eq!(state.user_id, "u-1");

  // The finished flow is offered again.
  let profile = UserProfile {
    external_id: "u-1".to_string(),
    ..UserProfile::default()
  };
  let enrolled = service.enroll_at(WS, &profile, now()).await.unwrap();
  assert_eq!(enrolled.map(|f| f.id), Some(flow.id));
}

#[tokio::test]
async fn test_tracked_events_feed_flow_analytics() {
  let store = Arc::new(MemoryStore::new());
  let flow = live("A");
  seed(&store, &[&flow]).await;
  let service = EnrollmentService::new(store);
  let entity = flow.id.to_string();

  // The events carry stale identity; the call arguments win.
  let mut stale = TrackedEvent::new(&entity, EventKind::FlowStepStart, 1_000).with_step("intro");
  stale.user_id = "someone-else".to_string();
  service
    .track_events(
      WS,
      "u-1",
      vec![
        stale,
        TrackedEvent::new(&entity, EventKind::FlowStepFinish, 3_000).with_step("intro"),
        TrackedEvent::new(&entity, EventKind::FlowFinished, 3_000),
      ],
    )
    .await
    .unwrap();
  service
    .track_events(
      WS,
      "u-2",
      vec![
        TrackedEvent::new(&entity, EventKind::FlowStepStart, 2_000).with_step("intro"),
        TrackedEvent::new(&entity, EventKind::FlowStepFinish, 6_000).with_step("intro"),
        TrackedEvent::new(&entity, EventKind::FlowSkipped, 6_500),
      ],
    )
    .await
    .unwrap();
  service.track_events(WS, "u-3", vec![]).await.unwrap();

  let analytics = service.flow_analytics(WS, &entity).await.unwrap();
  assert_eq!(analytics.flow_id, flow.id);
  assert_eq!(analytics.views, 2);
  assert_eq!(analytics.avg_step_time["intro"], 3_000);
  assert_eq!(analytics.avg_total_time, 3_000);
  assert_eq!((analytics.finished, analytics.skipped), (1, 1));
}

#[tokio::test]
async fn test_flow_analytics_requires_a_known_flow() {
  let store = Arc::new(MemoryStore::new());
  let foreign = Flow::new("ws-2", "Foreign");
  seed(&store, &[&foreign]).await;
  let service = EnrollmentService::new(store);

  assert!(matches!(
    service.flow_analytics(WS, &foreign.id.to_string()).await,
    Err(EnrollError::Store(StoreError::NotFound(_)))
  ));
  assert!(matches!(
    service.flow_analytics(WS, "not-a-flow").await,
    Err(EnrollError::InvalidReference(_))
  ));
}
