//! Waypoint Store
//!
//! This crate provides the storage trait and implementations for flow
//! documents and per-user enrollment state.
//!
//! The [`Store`] trait defines operations for:
//! - Loading, listing and replacing flow documents (full-document writes)
//! - Moving flows in and out of the archive
//! - Reading and writing user enrollment state
//! - Appending and reading tracked client events
//!
//! Flow writes replace the whole document. Each write bumps the flow's
//! `revision`; callers that pass an expected revision get a
//! [`Error::Conflict`] instead of silently overwriting a concurrent edit.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{EventKind, STEP_ID_KEY, TrackedEvent, UserState};

use std::sync::Arc;

use async_trait::async_trait;
use waypoint_config::{Flow, FlowId};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A record with the same key already exists.
  #[error("already exists: {0}")]
  AlreadyExists(String),

  /// The stored flow moved on since it was read.
  #[error("flow {flow_id} is at revision {actual}, expected {expected}")]
  Conflict {
    flow_id: FlowId,
    expected: u64,
    actual: u64,
  },

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for flows and enrollment state.
///
/// All reads are scoped to a workspace; a flow that exists under another
/// workspace is reported as not found.
#[async_trait]
pub trait Store: Send + Sync {
  /// Insert a new flow.
  async fn insert_flow(&self, flow: &Flow) -> Result<(), Error>;

  /// Get a flow by ID.
  async fn get_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<Flow, Error>;

  /// List every flow of a workspace, in insertion order.
  async fn list_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error>;

  /// List the published flows of a workspace, in insertion order.
  async fn list_live_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error>;

  /// Replace a stored flow and return its new revision.
  ///
  /// With `expected_revision` set, the write only happens if the stored
  /// revision still matches.
  async fn save_flow(&self, flow: &Flow, expected_revision: Option<u64>) -> Result<u64, Error>;

  /// Move a flow into the archive.
  async fn archive_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error>;

  /// List archived flows of a workspace.
  async fn list_archived_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error>;

  /// Move an archived flow back into the active set.
  async fn restore_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error>;

  /// Get the enrollment state of a user, if any has been recorded.
  async fn get_user_state(
    &self,
    workspace_id: &str,
    user_id: &str,
  ) -> Result<Option<UserState>, Error>;

  /// Create or replace the enrollment state of a user.
  async fn put_user_state(&self, state: &UserState) -> Result<(), Error>;

  /// Append tracked events. Events are never updated or removed.
  async fn record_events(&self, events: &[TrackedEvent]) -> Result<(), Error>;

  /// Tracked events about a flow, in the order they were recorded.
  async fn list_events_for_flow(
    &self,
    workspace_id: &str,
    flow_id: FlowId,
  ) -> Result<Vec<TrackedEvent>, Error>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
  async fn insert_flow(&self, flow: &Flow) -> Result<(), Error> {
    (**self).insert_flow(flow).await
  }

  async fn get_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<Flow, Error> {
    (**self).get_flow(workspace_id, flow_id).await
  }

  async fn list_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    (**self).list_flows(workspace_id).await
  }

  async fn list_live_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    (**self).list_live_flows(workspace_id).await
  }

  async fn save_flow(&self, flow: &Flow, expected_revision: Option<u64>) -> Result<u64, Error> {
    (**self).save_flow(flow, expected_revision).await
  }

  async fn archive_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    (**self).archive_flow(workspace_id, flow_id).await
  }

  async fn list_archived_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    (**self).list_archived_flows(workspace_id).await
  }

  async fn restore_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    (**self).restore_flow(workspace_id, flow_id).await
  }

  async fn get_user_state(
    &self,
    workspace_id: &str,
    user_id: &str,
  ) -> Result<Option<UserState>, Error> {
    (**self).get_user_state(workspace_id, user_id).await
  }

  async fn put_user_state(&self, state: &UserState) -> Result<(), Error> {
    (**self).put_user_state(state).await
  }

  async fn record_events(&self, events: &[TrackedEvent]) -> Result<(), Error> {
    (**self).record_events(events).await
  }

  async fn list_events_for_flow(
    &self,
    workspace_id: &str,
    flow_id: FlowId,
  ) -> Result<Vec<TrackedEvent>, Error> {
    (**self).list_events_for_flow(workspace_id, flow_id).await
  }
}
