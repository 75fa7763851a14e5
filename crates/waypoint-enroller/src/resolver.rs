use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use waypoint_config::Flow;
use waypoint_store::{Error as StoreError, Store};

use crate::eligibility::Eligibility;
use crate::error::EnrollError;
use crate::opts::EnrollmentOpts;

/// Picks the next flow a user should see.
pub struct Enroller<S: Store> {
  store: S,
}

impl<S: Store> Enroller<S> {
  /// Create a new enroller reading flows from the given store.
  pub fn new(store: S) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Resolve against the current time.
  pub async fn resolve(
    &self,
    workspace_id: &str,
    opts: &EnrollmentOpts,
  ) -> Result<Option<Flow>, EnrollError> {
    self.resolve_at(workspace_id, opts, Utc::now()).await
  }

  /// Select the first live flow of the workspace the user is eligible for.
  ///
  /// A current enrollment id short-circuits everything else: the result is
  /// that flow if it is still live in the workspace, and nothing otherwise.
  /// Finding no flow is not an error.
  #[instrument(
    name = "enroll_resolve",
    skip_all,
    fields(workspace_id = %workspace_id, resume = opts.current_enrollment_id.is_some())
  )]
  pub async fn resolve_at(
    &self,
    workspace_id: &str,
    opts: &EnrollmentOpts,
    now: DateTime<Utc>,
  ) -> Result<Option<Flow>, EnrollError> {
    if let Some(current) = opts
      .current_enrollment_id
      .as_deref()
      .filter(|id| !id.is_empty())
    {
      return self.live_flow(workspace_id, current).await;
    }

    let flows = self.store.list_live_flows(workspace_id).await?;
    let eligibility = Eligibility::new(opts, now);
    let selected = flows.into_iter().find(|flow| eligibility.admits(flow));

    match &selected {
      Some(flow) => info!(flow_id = %flow.id, "flow selected"),
      None => debug!("no eligible flow"),
    }

    Ok(selected)
  }

  /// A single flow by id, if it is live in the workspace.
  pub async fn live_flow(
    &self,
    workspace_id: &str,
    flow_id: &str,
  ) -> Result<Option<Flow>, EnrollError> {
    let id = Uuid::parse_str(flow_id.trim())
      .map_err(|_| EnrollError::InvalidReference(format!("malformed flow id: {}", flow_id)))?;

    match self.store.get_flow(workspace_id, id).await {
      Ok(flow) if flow.live => Ok(Some(flow)),
      Ok(_) | Err(StoreError::NotFound(_)) => {
        debug!(flow_id = %id, "current flow is not live");
        Ok(None)
      }
      Err(e) => Err(e.into()),
    }
  }
}
