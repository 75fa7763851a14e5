//! Enrollment state transitions.

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};
use uuid::Uuid;
use waypoint_config::{Flow, FlowId};
use waypoint_store::{Store, UserState};

use crate::error::EnrollError;
use crate::opts::{EnrollmentOpts, FlowStateUpdate, UserProfile};
use crate::resolver::Enroller;

/// Enrolls users into flows and records their progress.
pub struct EnrollmentService<S: Store> {
  enroller: Enroller<S>,
}

impl<S: Store> EnrollmentService<S> {
  pub fn new(store: S) -> Self {
    Self {
      enroller: Enroller::new(store),
    }
  }

  pub fn enroller(&self) -> &Enroller<S> {
    &self.enroller
  }

  /// Stored progress of a user, if any.
  pub async fn state(
    &self,
    workspace_id: &str,
    user_id: &str,
  ) -> Result<Option<UserState>, EnrollError> {
    Ok(self.enroller.store().get_user_state(workspace_id, user_id).await?)
  }

  pub async fn enroll(
    &self,
    workspace_id: &str,
    profile: &UserProfile,
  ) -> Result<Option<Flow>, EnrollError> {
    self.enroll_at(workspace_id, profile, Utc::now()).await
  }

  /// Pick the flow the user should see now and remember it as current.
  #[instrument(
    name = "enroll_user",
    skip_all,
    fields(workspace_id = %workspace_id, user_id = %profile.external_id)
  )]
  pub async fn enroll_at(
    &self,
    workspace_id: &str,
    profile: &UserProfile,
    now: DateTime<Utc>,
  ) -> Result<Option<Flow>, EnrollError> {
    let result = self.enroll_inner(workspace_id, profile, now).await;

    match &result {
      Ok(Some(flow)) => info!(flow_id = %flow.id, "user enrolled"),
      Ok(None) => {}
      Err(e) => error!(error = %e, "enrollment failed"),
    }

    result
  }

  async fn enroll_inner(
    &self,
    workspace_id: &str,
    profile: &UserProfile,
    now: DateTime<Utc>,
  ) -> Result<Option<Flow>, EnrollError> {
    let store = self.enroller.store();
    let stored = store
      .get_user_state(workspace_id, &profile.external_id)
      .await?;
    let is_new = stored.is_none();
    let mut state = stored.unwrap_or_else(|| UserState::new(workspace_id, &profile.external_id));

    let opts = EnrollmentOpts::from_state(&state, profile);
    let selected = self.enroller.resolve_at(workspace_id, &opts, now).await?;

    let changed = match &selected {
      Some(flow) if state.current_flow_id != Some(flow.id) => {
        state.current_flow_id = Some(flow.id);
        true
      }
      _ => false,
    };

    if changed || is_new {
      store.put_user_state(&state).await?;
    }

    Ok(selected)
  }

  pub async fn update_flow_state(
    &self,
    workspace_id: &str,
    user_id: &str,
    update: FlowStateUpdate,
  ) -> Result<Option<UserState>, EnrollError> {
    self
      .update_flow_state_at(workspace_id, user_id, update, Utc::now())
      .await
  }

  /// Record progress reported by the client.
  ///
  /// Returns the saved state, or `None` when the update carried neither an
  /// outcome nor a step and nothing was written.
  #[instrument(
    name = "enroll_update_state",
    skip_all,
    fields(workspace_id = %workspace_id, user_id = %user_id, flow_id = %update.flow_id)
  )]
  pub async fn update_flow_state_at(
    &self,
    workspace_id: &str,
    user_id: &str,
    update: FlowStateUpdate,
    now: DateTime<Utc>,
  ) -> Result<Option<UserState>, EnrollError> {
    let step = update.current_step_id.filter(|s| !s.is_empty());
    if !update.finished && !update.skipped && step.is_none() {
      return Ok(None);
    }

    let outcome_flow = if update.finished || update.skipped {
      Some(parse_flow_id(&update.flow_id)?)
    } else {
      None
    };

    let store = self.enroller.store();
    let mut state = store
      .get_user_state(workspace_id, user_id)
      .await?
      .unwrap_or_else(|| UserState::new(workspace_id, user_id));

    state.current_step_id = step;

    if let Some(flow_id) = outcome_flow {
      if update.skipped {
        state.skipped_flow_ids.insert(flow_id);
        submit(&mut state, flow_id, now);
      }
      if update.finished {
        state.completed_flow_ids.insert(flow_id);
        submit(&mut state, flow_id, now);
      }
      info!(
        finished = update.finished,
        skipped = update.skipped,
        "flow outcome recorded"
      );
    }

    let completed = state.completed_flow_ids.clone();
    state.skipped_flow_ids.retain(|id| !completed.contains(id));

    store.put_user_state(&state).await?;
    Ok(Some(state))
  }

  /// Forget everything recorded for a user.
  #[instrument(name = "enroll_reset", skip_all, fields(workspace_id = %workspace_id, user_id = %user_id))]
  pub async fn reset(&self, workspace_id: &str, user_id: &str) -> Result<(), EnrollError> {
    let store = self.enroller.store();
    let Some(mut state) = store.get_user_state(workspace_id, user_id).await? else {
      return Ok(());
    };

    state.reset();
    store.put_user_state(&state).await?;
    info!("enrollment state reset");
    Ok(())
  }
}

fn submit(state: &mut UserState, flow_id: FlowId, now: DateTime<Utc>) {
  if state.current_flow_id == Some(flow_id) {
    state.current_flow_id = None;
  }
  if state.last_submitted_at.is_none_or(|at| now > at) {
    state.last_submitted_at = Some(now);
    state.last_submitted_flow_id = Some(flow_id);
  }
}

pub(crate) fn parse_flow_id(raw: &str) -> Result<FlowId, EnrollError> {
  Uuid::parse_str(raw.trim())
    .map_err(|_| EnrollError::InvalidReference(format!("malformed flow id: {}", raw)))
}
