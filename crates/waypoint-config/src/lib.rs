//! Waypoint Config
//!
//! This crate contains the serializable flow document types for Waypoint.
//! A flow (tour) is a tree of steps owned by one workspace, plus the options
//! that decide who gets enrolled into it and what happens when it finishes.
//!
//! Documents are stored as JSON blobs and exchanged with the editor as-is.
//! Derived data (relations, `is_source`/`is_final` flags) is recomputed by
//! `waypoint-graph` and should never be trusted when it arrives from a caller.

mod effect;
mod enums;
mod flow;
mod relation;
mod step;
mod targeting;
mod update;

pub use effect::{FinishEffect, FinishEffectKind};
pub use enums::{BlockKind, ElementTemplate, ElementType, TriggerKind};
pub use flow::{Flow, FlowId, FlowOpts, FlowSummary, Segment, Trigger};
pub use relation::Relation;
pub use step::{Step, StepBlock, StepData, StepOpts, StepTransition};
pub use targeting::{Targeting, TargetingRule};
pub use update::{FlowUpdate, OptsPatch};
