use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};
use waypoint_config::{Relation, Step};

use crate::error::GraphError;

/// Outcome of a recomputation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recomputed {
  /// The source step, `None` only for an empty flow.
  pub root: Option<String>,
  /// Parent -> child edges reachable from the source, sorted by (from, to).
  pub relations: Vec<Relation>,
  /// Steps whose parent chain never reaches the source.
  pub unreachable: Vec<String>,
}

/// Rebuild relations, `is_source`/`is_final` flags and segment inheritance
/// from the steps' parent references.
///
/// The result depends only on the parent references and explicit segment
/// tags, so running it twice yields the same flags and edges. Any flag
/// values already present on the steps are overwritten.
///
/// A segment tag flows from parent to child during the breadth-first walk,
/// so an untagged step ends up with the tag of its nearest tagged ancestor.
pub fn recompute(steps: &mut [Step]) -> Result<Recomputed, GraphError> {
  let mut seen = HashSet::new();
  for step in steps.iter() {
    if !seen.insert(step.step_id.as_str()) {
      return Err(GraphError::DuplicateStep(step.step_id.clone()));
    }
  }

  if steps.is_empty() {
    return Ok(Recomputed::default());
  }

  let roots: Vec<usize> = steps
    .iter()
    .enumerate()
    .filter(|(_, s)| s.parent().is_none())
    .map(|(i, _)| i)
    .collect();

  let root = match roots.as_slice() {
    [] => return Err(GraphError::NoRoot),
    [root] => *root,
    many => {
      return Err(GraphError::MultipleRoots {
        step_ids: many.iter().map(|&i| steps[i].step_id.clone()).collect(),
      });
    }
  };

  // parent id -> child indices, in step order
  let mut adjacency: HashMap<String, Vec<usize>> = HashMap::new();
  for (i, step) in steps.iter_mut().enumerate() {
    step.opts.is_source = step.parent().is_none();
    // cleared by the walk once the step emits an edge
    step.opts.is_final = true;
    if let Some(parent) = step.parent() {
      adjacency.entry(parent.to_string()).or_default().push(i);
    }
  }

  let mut visited = vec![false; steps.len()];
  visited[root] = true;
  let mut queue = VecDeque::from([root]);
  let mut relations = Vec::with_capacity(steps.len() - 1);

  while let Some(node) = queue.pop_front() {
    let Some(children) = adjacency.get(&steps[node].step_id) else {
      continue;
    };
    let inherited = steps[node].segment().map(str::to_string);

    for &child in children {
      if visited[child] {
        continue;
      }
      visited[child] = true;
      steps[node].opts.is_final = false;
      relations.push(Relation::new(
        steps[node].step_id.clone(),
        steps[child].step_id.clone(),
      ));

      if steps[child].segment().is_none() {
        if let Some(segment) = &inherited {
          steps[child].opts.segment_id = Some(segment.clone());
        }
      }
      queue.push_back(child);
    }
  }

  relations.sort();

  let unreachable: Vec<String> = steps
    .iter()
    .zip(&visited)
    .filter(|(_, visited)| !**visited)
    .map(|(s, _)| s.step_id.clone())
    .collect();

  if !unreachable.is_empty() {
    warn!(steps = ?unreachable, "steps not reachable from the source");
  }

  debug!(
    root = %steps[root].step_id,
    relations = relations.len(),
    "relations recomputed"
  );

  Ok(Recomputed {
    root: Some(steps[root].step_id.clone()),
    relations,
    unreachable,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn step(id: &str, parent: Option<&str>) -> Step {
    Step::new(id, parent)
  }

  fn tagged(id: &str, parent: Option<&str>, segment: &str) -> Step {
    let mut s = Step::new(id, parent);
    s.opts.segment_id = Some(segment.to_string());
    s
  }

  fn get<'a>(steps: &'a [Step], id: &str) -> &'a Step {
    steps.iter().find(|s| s.step_id == id).unwrap()
  }

  fn branching() -> Vec<Step> {
    vec![
      step("step4", Some("step2")),
      step("step1", None),
      step("step3", Some("step1")),
      step("step2", Some("step1")),
    ]
  }

  #[test]
  fn test_single_source() {
    let mut steps = branching();
    let result = recompute(&mut steps).unwrap();

    assert_eq!(result.root.as_deref(), Some("step1"));
    let sources: Vec<&str> = steps
      .iter()
      .filter(|s| s.opts.is_source)
      .map(|s| s.step_id.as_str())
      .collect();
    assert_eq!(sources, vec!["step1"]);
    assert!(get(&steps, "step1").parent().is_none());
  }

  #[test]
  fn test_relations_are_sorted() {
    let mut steps = branching();
    let result = recompute(&mut steps).unwrap();

    assert_eq!(
      result.relations,
      vec![
        Relation::new("step1", "step2"),
        Relation::new("step1", "step3"),
        Relation::new("step2", "step4"),
      ]
    );
    assert!(result.unreachable.is_empty());
  }

  #[test]
  fn test_final_iff_no_children() {
    let mut steps = branching();
    let result = recompute(&mut steps).unwrap();

    for s in &steps {
      let has_children = result.relations.iter().any(|r| r.from == s.step_id);
      assert_eq!(s.opts.is_final, !has_children, "step {}", s.step_id);
    }
  }

  #[test]
  fn test_stale_flags_are_overwritten() {
    let mut steps = branching();
    for s in steps.iter_mut() {
      s.opts.is_source = true;
      s.opts.is_final = true;
    }

    recompute(&mut steps).unwrap();

    assert!(!get(&steps, "step2").opts.is_source);
    assert!(!get(&steps, "step2").opts.is_final);
    assert!(!get(&steps, "step1").opts.is_final);
  }

  #[test]
  fn test_idempotent() {
    let mut steps = branching();
    steps[1].opts.segment_id = Some("admins".to_string());

    let first = recompute(&mut steps).unwrap();
    let after_first = steps.clone();
    let second = recompute(&mut steps).unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, steps);
  }

  #[test]
  fn test_segment_cascades_and_overrides_at_branch() {
    let mut steps = vec![
      tagged("root", None, "everyone"),
      step("a", Some("root")),
      step("a1", Some("a")),
      step("a2", Some("a1")),
      tagged("b", Some("root"), "admins"),
      step("b1", Some("b")),
    ];

    recompute(&mut steps).unwrap();

    assert_eq!(get(&steps, "a").segment(), Some("everyone"));
    assert_eq!(get(&steps, "a2").segment(), Some("everyone"));
    assert_eq!(get(&steps, "b").segment(), Some("admins"));
    assert_eq!(get(&steps, "b1").segment(), Some("admins"));
  }

  #[test]
  fn test_untagged_tree_stays_untagged() {
    let mut steps = branching();
    recompute(&mut steps).unwrap();
    assert!(steps.iter().all(|s| s.segment().is_none()));
  }

  #[test]
  fn test_empty_flow() {
    let mut steps: Vec<Step> = Vec::new();
    assert_eq!(recompute(&mut steps).unwrap(), Recomputed::default());
  }

  #[test]
  fn test_rejects_multiple_roots() {
    let mut steps = vec![step("a", None), step("b", None), step("c", Some("a"))];
    assert_eq!(
      recompute(&mut steps),
      Err(GraphError::MultipleRoots {
        step_ids: vec!["a".to_string(), "b".to_string()]
      })
    );
  }

  #[test]
  fn test_rejects_no_root() {
    let mut steps = vec![step("a", Some("b")), step("b", Some("a"))];
    assert_eq!(recompute(&mut steps), Err(GraphError::NoRoot));
  }

  #[test]
  fn test_rejects_duplicate_ids() {
    let mut steps = vec![step("a", None), step("a", Some("a"))];
    assert_eq!(
      recompute(&mut steps),
      Err(GraphError::DuplicateStep("a".to_string()))
    );
  }

  #[test]
  fn test_reports_orphans() {
    let mut steps = vec![
      step("root", None),
      step("a", Some("root")),
      step("orphan", Some("deleted")),
      step("orphan-child", Some("orphan")),
    ];

    let result = recompute(&mut steps).unwrap();

    assert_eq!(result.relations, vec![Relation::new("root", "a")]);
    assert_eq!(
      result.unreachable,
      vec!["orphan".to_string(), "orphan-child".to_string()]
    );
  }

  #[test]
  fn test_orphans_agree_with_relations() {
    let mut steps = vec![
      step("root", None),
      step("a", Some("root")),
      step("b", Some("mid")),
      step("b1", Some("b")),
    ];
    steps[2].opts.is_final = false;

    let result = recompute(&mut steps).unwrap();

    for s in &steps {
      let has_children = result.relations.iter().any(|r| r.from == s.step_id);
      assert_eq!(s.opts.is_final, !has_children, "step {}", s.step_id);
    }
    assert!(get(&steps, "b").opts.is_final);
  }
}
