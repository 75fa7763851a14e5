//! Flow editor service.

use tracing::{error, info, instrument};
use waypoint_config::{Flow, FlowSummary, FlowUpdate, Step};
use waypoint_graph::StepGraph;
use waypoint_store::Store;

use crate::config::{ConcurrencyMode, EditorConfig};
use crate::error::EditError;
use crate::mutation::{apply_update, parse_flow_id, refresh_relations, replace_step};

/// Applies edits to stored flows.
///
/// Every write loads the flow fresh, mutates it in memory, recomputes the
/// step relations and saves the whole document back.
pub struct FlowEditor<S: Store> {
  store: S,
  config: EditorConfig,
}

impl<S: Store> FlowEditor<S> {
  /// Create a new editor over the given store.
  pub fn new(store: S, config: EditorConfig) -> Self {
    Self { store, config }
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  /// Create a flow from the name, base URL and steps of `input`.
  #[instrument(name = "flow_create", skip_all, fields(workspace_id = %workspace_id))]
  pub async fn create(&self, workspace_id: &str, input: FlowUpdate) -> Result<Flow, EditError> {
    let result = self.create_inner(workspace_id, input).await;

    match &result {
      Ok(flow) => info!(flow_id = %flow.id, steps = flow.steps.len(), "flow created"),
      Err(e) => error!(error = %e, "flow create failed"),
    }

    result
  }

  async fn create_inner(&self, workspace_id: &str, input: FlowUpdate) -> Result<Flow, EditError> {
    let name = input.name.ok_or(EditError::MissingField("name"))?;
    let base_url = input.base_url.ok_or(EditError::MissingField("base_url"))?;

    let mut flow = Flow::new(workspace_id, name);
    flow.base_url = base_url;
    flow.steps = input.new_steps;
    refresh_relations(&mut flow)?;

    self.store.insert_flow(&flow).await?;
    Ok(flow)
  }

  pub async fn get(&self, workspace_id: &str, flow_id: &str) -> Result<Flow, EditError> {
    let id = parse_flow_id(flow_id)?;
    Ok(self.store.get_flow(workspace_id, id).await?)
  }

  pub async fn list(&self, workspace_id: &str) -> Result<Vec<Flow>, EditError> {
    Ok(self.store.list_flows(workspace_id).await?)
  }

  /// Apply a sparse update and save the result.
  #[instrument(
    name = "flow_update",
    skip_all,
    fields(workspace_id = %workspace_id, flow_id = %flow_id)
  )]
  pub async fn update(
    &self,
    workspace_id: &str,
    flow_id: &str,
    update: FlowUpdate,
  ) -> Result<Flow, EditError> {
    let result = self.update_inner(workspace_id, flow_id, update).await;

    match &result {
      Ok(flow) => info!(
        revision = flow.revision,
        relations = flow.relations.len(),
        "flow updated"
      ),
      Err(e) => error!(error = %e, "flow update failed"),
    }

    result
  }

  async fn update_inner(
    &self,
    workspace_id: &str,
    flow_id: &str,
    update: FlowUpdate,
  ) -> Result<Flow, EditError> {
    let mut flow = self.get(workspace_id, flow_id).await?;
    let expected = update.expected_revision;

    apply_update(&mut flow, update, &self.config)?;
    self.save(&mut flow, expected).await?;
    Ok(flow)
  }

  /// Replace the content of one existing step, moving it if a new parent
  /// is given.
  #[instrument(
    name = "flow_update_step",
    skip_all,
    fields(workspace_id = %workspace_id, flow_id = %flow_id, step_id = %step_id)
  )]
  pub async fn update_step(
    &self,
    workspace_id: &str,
    flow_id: &str,
    step_id: &str,
    input: Step,
  ) -> Result<Flow, EditError> {
    let result: Result<Flow, EditError> = async {
      let mut flow = self.get(workspace_id, flow_id).await?;
      let parent = input.parent().map(str::to_string);
      replace_step(&mut flow.steps, step_id, input.data, parent.as_deref())?;
      refresh_relations(&mut flow)?;
      self.save(&mut flow, None).await?;
      Ok(flow)
    }
    .await;

    if let Err(e) = &result {
      error!(error = %e, "step update failed");
    }
    result
  }

  #[instrument(name = "flow_publish", skip_all, fields(workspace_id = %workspace_id, flow_id = %flow_id))]
  pub async fn publish(&self, workspace_id: &str, flow_id: &str) -> Result<Flow, EditError> {
    let flow = self.set_live(workspace_id, flow_id, true).await?;
    info!("flow published");
    Ok(flow)
  }

  #[instrument(name = "flow_unpublish", skip_all, fields(workspace_id = %workspace_id, flow_id = %flow_id))]
  pub async fn unpublish(&self, workspace_id: &str, flow_id: &str) -> Result<Flow, EditError> {
    let flow = self.set_live(workspace_id, flow_id, false).await?;
    info!("flow unpublished");
    Ok(flow)
  }

  async fn set_live(&self, workspace_id: &str, flow_id: &str, live: bool) -> Result<Flow, EditError> {
    let mut flow = self.get(workspace_id, flow_id).await?;
    flow.live = live;
    self.save(&mut flow, None).await?;
    Ok(flow)
  }

  #[instrument(name = "flow_archive", skip_all, fields(workspace_id = %workspace_id, flow_id = %flow_id))]
  pub async fn archive(&self, workspace_id: &str, flow_id: &str) -> Result<(), EditError> {
    let id = parse_flow_id(flow_id)?;
    self.store.archive_flow(workspace_id, id).await?;
    info!("flow archived");
    Ok(())
  }

  #[instrument(name = "flow_restore", skip_all, fields(workspace_id = %workspace_id, flow_id = %flow_id))]
  pub async fn restore(&self, workspace_id: &str, flow_id: &str) -> Result<(), EditError> {
    let id = parse_flow_id(flow_id)?;
    self.store.restore_flow(workspace_id, id).await?;
    info!("flow restored");
    Ok(())
  }

  pub async fn list_archived(&self, workspace_id: &str) -> Result<Vec<Flow>, EditError> {
    Ok(self.store.list_archived_flows(workspace_id).await?)
  }

  /// Flows that `flow_id` may depend on: every other flow of the workspace
  /// that does not already depend on it.
  pub async fn dependency_candidates(
    &self,
    workspace_id: &str,
    flow_id: &str,
  ) -> Result<Vec<FlowSummary>, EditError> {
    let id = parse_flow_id(flow_id)?;
    let flows = self.store.list_flows(workspace_id).await?;

    Ok(
      flows
        .iter()
        .filter(|f| f.id != id && !f.depends_on(id))
        .map(Flow::summary)
        .collect(),
    )
  }

  /// The source step of a flow.
  pub async fn root_step(&self, workspace_id: &str, flow_id: &str) -> Result<Step, EditError> {
    let flow = self.get(workspace_id, flow_id).await?;
    let root = StepGraph::new(&flow.steps).find_root()?;
    Ok(root.clone())
  }

  /// The first child of `parent_step_id`, optionally restricted to a
  /// segment.
  pub async fn child_step(
    &self,
    workspace_id: &str,
    flow_id: &str,
    parent_step_id: &str,
    segment_id: Option<&str>,
  ) -> Result<Option<Step>, EditError> {
    let flow = self.get(workspace_id, flow_id).await?;
    let child = StepGraph::new(&flow.steps).first_child(parent_step_id, segment_id);
    Ok(child.cloned())
  }

  async fn save(&self, flow: &mut Flow, expected_revision: Option<u64>) -> Result<(), EditError> {
    let expected = expected_revision.or(match self.config.concurrency {
      ConcurrencyMode::Optimistic => Some(flow.revision),
      ConcurrencyMode::LastWriterWins => None,
    });

    flow.revision = self.store.save_flow(flow, expected).await?;
    Ok(())
  }
}
