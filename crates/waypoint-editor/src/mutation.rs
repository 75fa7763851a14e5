//! In-memory flow mutations.
//!
//! Everything here works on a loaded [`Flow`] and never touches storage.
//! Structural edits leave `relations` and the derived step flags stale;
//! [`apply_update`] finishes with a recomputation, and callers of the
//! single-step functions must do the same before saving.

use tracing::warn;
use uuid::Uuid;
use waypoint_config::{Flow, FlowId, FlowUpdate, Segment, Step, StepData};
use waypoint_graph::{Recomputed, StepGraph, recompute};

use crate::config::{DeletePolicy, EditorConfig};
use crate::effects::apply_catalog;
use crate::error::EditError;

/// Insert a step, or replace the content of an existing one.
///
/// For an existing step only `data` is replaced, and the step is re-parented
/// when a non-empty parent that differs from the current one is given.
///
/// A new step is spliced in: if another step already hangs off the same
/// parent, that step is moved underneath the new one, so the new step ends
/// up between the parent and its former child.
pub fn upsert_step(steps: &mut Vec<Step>, incoming: Step) -> Result<(), EditError> {
  if incoming.step_id.trim().is_empty() {
    return Err(EditError::InvalidReference("empty step id".to_string()));
  }

  if steps.iter().any(|s| s.step_id == incoming.step_id) {
    let parent = incoming.parent().map(str::to_string);
    return replace_step(steps, &incoming.step_id, incoming.data, parent.as_deref());
  }

  insert_step(steps, incoming)
}

/// Replace the content of an existing step and optionally move it.
pub fn replace_step(
  steps: &mut [Step],
  step_id: &str,
  data: StepData,
  parent: Option<&str>,
) -> Result<(), EditError> {
  let index = steps
    .iter()
    .position(|s| s.step_id == step_id)
    .ok_or_else(|| EditError::NotFound(format!("step {}", step_id)))?;

  let new_parent = parent.filter(|p| !p.is_empty() && steps[index].parent() != Some(*p));
  if let Some(new_parent) = new_parent {
    check_reparent(steps, step_id, new_parent)?;
  }

  let step = &mut steps[index];
  step.data = data;
  if let Some(new_parent) = new_parent {
    step.set_parent(Some(new_parent));
  }
  Ok(())
}

fn insert_step(steps: &mut Vec<Step>, incoming: Step) -> Result<(), EditError> {
  if let Some(parent) = incoming.parent() {
    if StepGraph::new(steps).find_by_step_id(parent).is_none() {
      return Err(EditError::InvalidReference(format!(
        "parent step {} does not exist",
        parent
      )));
    }
  }

  if let Some(sibling) = steps.iter_mut().find(|s| s.parent() == incoming.parent()) {
    sibling.set_parent(Some(incoming.step_id.as_str()));
  }

  steps.push(incoming);
  Ok(())
}

fn check_reparent(steps: &[Step], step_id: &str, parent: &str) -> Result<(), EditError> {
  let graph = StepGraph::new(steps);
  if graph.find_by_step_id(parent).is_none() {
    return Err(EditError::InvalidReference(format!(
      "parent step {} does not exist",
      parent
    )));
  }
  if graph.is_ancestor(step_id, parent) {
    return Err(EditError::InvalidReference(format!(
      "step {} cannot be moved under {}",
      step_id, parent
    )));
  }
  Ok(())
}

/// Remove a step and contract the edge above it.
///
/// Returns the removed step, or `None` if no step has that id.
pub fn delete_step(steps: &mut Vec<Step>, step_id: &str, policy: DeletePolicy) -> Option<Step> {
  let index = steps.iter().position(|s| s.step_id == step_id)?;
  let removed = steps.remove(index);
  let grandparent = removed.parent().map(str::to_string);

  let mut children = steps.iter_mut().filter(|s| s.parent() == Some(step_id));
  match policy {
    DeletePolicy::ReconnectFirst => {
      if let Some(child) = children.next() {
        child.set_parent(grandparent.as_deref());
      }
    }
    DeletePolicy::ReconnectAll => {
      for child in children {
        child.set_parent(grandparent.as_deref());
      }
    }
  }

  Some(removed)
}

/// Rename segments by id, or add the ones that are not known yet.
///
/// Entries with an empty name are ignored. New segments get a fresh id.
pub fn upsert_segments(segments: &mut Vec<Segment>, incoming: &[Segment]) {
  for update in incoming.iter().filter(|s| !s.name.is_empty()) {
    let existing = segments
      .iter_mut()
      .find(|s| !update.segment_id.is_empty() && s.segment_id == update.segment_id);

    match existing {
      Some(segment) => segment.name = update.name.clone(),
      None => segments.push(Segment {
        segment_id: Uuid::new_v4().to_string(),
        name: update.name.clone(),
        icon_url: update.icon_url.clone(),
      }),
    }
  }
}

/// Parse a flow id supplied by a caller.
pub fn parse_flow_id(raw: &str) -> Result<FlowId, EditError> {
  Uuid::parse_str(raw.trim())
    .map_err(|_| EditError::InvalidReference(format!("malformed flow id: {}", raw)))
}

fn parse_depends_on(flow_id: FlowId, raw: &[String]) -> Result<Vec<FlowId>, EditError> {
  let mut ids = Vec::with_capacity(raw.len());
  for value in raw {
    let id = parse_flow_id(value)?;
    if id == flow_id {
      return Err(EditError::InvalidReference(format!(
        "flow {} cannot depend on itself",
        flow_id
      )));
    }
    if !ids.contains(&id) {
      ids.push(id);
    }
  }
  Ok(ids)
}

/// Apply a sparse update to a loaded flow and recompute its relations.
///
/// Fields are applied in a fixed order: name, base URL, deleted steps,
/// updated steps, new steps, segments, dependencies, trigger, targeting,
/// finish effect, segmentation flag, then visual options. On error the flow
/// may be partially modified and should be discarded.
pub fn apply_update(
  flow: &mut Flow,
  update: FlowUpdate,
  config: &EditorConfig,
) -> Result<Recomputed, EditError> {
  if let Some(name) = update.name {
    flow.name = name;
  }
  if let Some(base_url) = update.base_url {
    flow.base_url = base_url;
  }

  for step_id in &update.deleted_steps {
    if delete_step(&mut flow.steps, step_id, config.delete_policy).is_none() {
      warn!(flow_id = %flow.id, step_id = %step_id, "skipping delete of unknown step");
    }
  }

  for step in update.updated_steps.into_iter().chain(update.new_steps) {
    upsert_step(&mut flow.steps, step)?;
  }

  if let Some(segments) = &update.segments {
    upsert_segments(&mut flow.segments, segments);
  }

  if let Some(depends_on) = &update.depends_on {
    flow.opts.depends_on = parse_depends_on(flow.id, depends_on)?;
  }
  if let Some(trigger) = update.trigger {
    flow.opts.trigger = trigger;
  }
  if let Some(targeting) = update.targeting {
    flow.opts.targeting = targeting;
  }
  if let Some(mut effect) = update.finish_effect {
    apply_catalog(&mut effect, &config.asset_base_url);
    flow.opts.finish_effect = effect;
  }

  if let Some(segments) = &update.segments {
    flow.opts.segmentation = !segments.is_empty();
  }

  if let Some(opts) = update.opts {
    if !opts.theme_color.is_empty() {
      flow.opts.theme_color = opts.theme_color;
    }
    flow.opts.avatar_id = opts.avatar_id;
    if let Some(template) = opts.element_template {
      flow.opts.element_template = template;
    }
  }

  refresh_relations(flow)
}

/// Recompute derived step data and store the new edge list on the flow.
pub fn refresh_relations(flow: &mut Flow) -> Result<Recomputed, EditError> {
  let recomputed = recompute(&mut flow.steps)?;
  flow.relations = recomputed.relations.clone();
  Ok(recomputed)
}
