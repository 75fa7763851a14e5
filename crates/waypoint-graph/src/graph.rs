use waypoint_config::Step;

use crate::error::GraphError;

/// Read-only view over a flow's steps.
///
/// Lookups are linear scans; flows hold tens of steps, not thousands.
#[derive(Debug, Clone, Copy)]
pub struct StepGraph<'a> {
  steps: &'a [Step],
}

impl<'a> StepGraph<'a> {
  pub fn new(steps: &'a [Step]) -> Self {
    Self { steps }
  }

  pub fn find_by_step_id(&self, step_id: &str) -> Option<&'a Step> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  /// Children of `parent_id`, in step order.
  ///
  /// With a segment filter only children tagged with that segment are
  /// returned; `None` returns every child.
  pub fn find_children(&self, parent_id: &str, segment: Option<&str>) -> Vec<&'a Step> {
    self
      .steps
      .iter()
      .filter(|s| s.parent() == Some(parent_id))
      .filter(|s| segment.is_none_or(|seg| seg.is_empty() || s.segment() == Some(seg)))
      .collect()
  }

  /// The first child of `parent_id` matching the segment filter.
  pub fn first_child(&self, parent_id: &str, segment: Option<&str>) -> Option<&'a Step> {
    self.find_children(parent_id, segment).into_iter().next()
  }

  /// The unique step without a parent.
  pub fn find_root(&self) -> Result<&'a Step, GraphError> {
    let mut roots = self.steps.iter().filter(|s| s.parent().is_none());
    let root = roots.next().ok_or(GraphError::NoRoot)?;

    let rest: Vec<&Step> = roots.collect();
    if !rest.is_empty() {
      let step_ids = std::iter::once(root)
        .chain(rest)
        .map(|s| s.step_id.clone())
        .collect();
      return Err(GraphError::MultipleRoots { step_ids });
    }

    Ok(root)
  }

  /// Whether `ancestor_id` lies on the parent chain of `step_id`.
  ///
  /// A step counts as its own ancestor. The walk is bounded by the step
  /// count so a transient cycle cannot hang it.
  pub fn is_ancestor(&self, ancestor_id: &str, step_id: &str) -> bool {
    let mut current = Some(step_id);
    for _ in 0..=self.steps.len() {
      let Some(id) = current else {
        return false;
      };
      if id == ancestor_id {
        return true;
      }
      current = self.find_by_step_id(id).and_then(Step::parent);
    }
    false
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}
