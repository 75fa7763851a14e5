//! Event tracking and per-flow analytics.

use tracing::{error, info, instrument};
use waypoint_store::{Store, TrackedEvent};

use crate::analytics::FlowAnalytics;
use crate::error::EnrollError;
use crate::service::{EnrollmentService, parse_flow_id};

impl<S: Store> EnrollmentService<S> {
  /// Record events reported by a user's client.
  ///
  /// Workspace and user are taken from the arguments, overriding whatever
  /// the events carry.
  #[instrument(
    name = "enroll_track_events",
    skip_all,
    fields(workspace_id = %workspace_id, user_id = %user_id, events = events.len())
  )]
  pub async fn track_events(
    &self,
    workspace_id: &str,
    user_id: &str,
    mut events: Vec<TrackedEvent>,
  ) -> Result<(), EnrollError> {
    if events.is_empty() {
      return Ok(());
    }

    for event in events.iter_mut() {
      event.workspace_id = workspace_id.to_string();
      event.user_id = user_id.to_string();
    }

    let result = self.enroller().store().record_events(&events).await;
    if let Err(e) = &result {
      error!(error = %e, "failed to record events");
    }
    Ok(result?)
  }

  /// Engagement numbers for one flow of the workspace.
  #[instrument(
    name = "enroll_flow_analytics",
    skip_all,
    fields(workspace_id = %workspace_id, flow_id = %flow_id)
  )]
  pub async fn flow_analytics(
    &self,
    workspace_id: &str,
    flow_id: &str,
  ) -> Result<FlowAnalytics, EnrollError> {
    let id = parse_flow_id(flow_id)?;
    let store = self.enroller().store();

    let flow = store.get_flow(workspace_id, id).await?;
    let events = store.list_events_for_flow(workspace_id, flow.id).await?;
    let analytics = FlowAnalytics::from_events(flow.id, &events);

    info!(
      events = events.len(),
      views = analytics.views,
      "flow analytics computed"
    );
    Ok(analytics)
  }
}
