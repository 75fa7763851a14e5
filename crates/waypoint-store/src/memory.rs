use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use waypoint_config::{Flow, FlowId};

use crate::{Error, Store, TrackedEvent, UserState};

#[derive(Debug, Default)]
struct Inner {
  flows: Vec<Flow>,
  archived: Vec<Flow>,
  user_states: HashMap<(String, String), UserState>,
  events: Vec<TrackedEvent>,
}

/// In-memory store implementation.
///
/// Keeps insertion order for listings. Suitable for tests and for embedding
/// where durability is not needed.
#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn not_found(flow_id: FlowId) -> Error {
  Error::NotFound(format!("flow {}", flow_id))
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_flow(&self, flow: &Flow) -> Result<(), Error> {
    let mut inner = self.inner.lock().await;
    if inner.flows.iter().any(|f| f.id == flow.id) {
      return Err(Error::AlreadyExists(format!("flow {}", flow.id)));
    }
    inner.flows.push(flow.clone());
    Ok(())
  }

  async fn get_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<Flow, Error> {
    let inner = self.inner.lock().await;
    inner
      .flows
      .iter()
      .find(|f| f.id == flow_id && f.workspace_id == workspace_id)
      .cloned()
      .ok_or_else(|| not_found(flow_id))
  }

  async fn list_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let inner = self.inner.lock().await;
    Ok(
      inner
        .flows
        .iter()
        .filter(|f| f.workspace_id == workspace_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_live_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let inner = self.inner.lock().await;
    Ok(
      inner
        .flows
        .iter()
        .filter(|f| f.workspace_id == workspace_id && f.live)
        .cloned()
        .collect(),
    )
  }

  async fn save_flow(&self, flow: &Flow, expected_revision: Option<u64>) -> Result<u64, Error> {
    let mut inner = self.inner.lock().await;
    let stored = inner
      .flows
      .iter_mut()
      .find(|f| f.id == flow.id && f.workspace_id == flow.workspace_id)
      .ok_or_else(|| not_found(flow.id))?;

    if let Some(expected) = expected_revision {
      if stored.revision != expected {
        return Err(Error::Conflict {
          flow_id: flow.id,
          expected,
          actual: stored.revision,
        });
      }
    }

    let revision = stored.revision + 1;
    *stored = Flow {
      revision,
      ..flow.clone()
    };
    Ok(revision)
  }

  async fn archive_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    let mut inner = self.inner.lock().await;
    let index = inner
      .flows
      .iter()
      .position(|f| f.id == flow_id && f.workspace_id == workspace_id)
      .ok_or_else(|| not_found(flow_id))?;

    let flow = inner.flows.remove(index);
    inner.archived.push(flow);
    Ok(())
  }

  async fn list_archived_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let inner = self.inner.lock().await;
    Ok(
      inner
        .archived
        .iter()
        .filter(|f| f.workspace_id == workspace_id)
        .cloned()
        .collect(),
    )
  }

  async fn restore_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    let mut inner = self.inner.lock().await;
    let index = inner
      .archived
      .iter()
      .position(|f| f.id == flow_id && f.workspace_id == workspace_id)
      .ok_or_else(|| not_found(flow_id))?;

    let flow = inner.archived.remove(index);
    inner.flows.push(flow);
    Ok(())
  }

  async fn get_user_state(
    &self,
    workspace_id: &str,
    user_id: &str,
  ) -> Result<Option<UserState>, Error> {
    let inner = self.inner.lock().await;
    Ok(
      inner
        .user_states
        .get(&(workspace_id.to_string(), user_id.to_string()))
        .cloned(),
    )
  }

  async fn put_user_state(&self, state: &UserState) -> Result<(), Error> {
    let mut inner = self.inner.lock().await;
    inner.user_states.insert(
      (state.workspace_id.clone(), state.user_id.clone()),
      state.clone(),
    );
    Ok(())
  }

  async fn record_events(&self, events: &[TrackedEvent]) -> Result<(), Error> {
    let mut inner = self.inner.lock().await;
    inner.events.extend_from_slice(events);
    Ok(())
  }

  async fn list_events_for_flow(
    &self,
    workspace_id: &str,
    flow_id: FlowId,
  ) -> Result<Vec<TrackedEvent>, Error> {
    let entity_id = flow_id.to_string();
    let inner = self.inner.lock().await;
    Ok(
      inner
        .events
        .iter()
        .filter(|e| e.workspace_id == workspace_id && e.entity_id == entity_id)
        .cloned()
        .collect(),
    )
  }
}
