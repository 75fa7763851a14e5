//! Waypoint Graph
//!
//! A flow's steps form a tree: every step points at its parent, exactly one
//! step (the source) has no parent, and steps without children are final.
//!
//! This crate provides:
//! - [`StepGraph`], read-only lookups over a step list
//! - [`recompute`], which rebuilds relations, source/final flags and segment
//!   inheritance from the parent references after any structural edit

mod error;
mod graph;
mod recompute;

pub use error::GraphError;
pub use graph::StepGraph;
pub use recompute::{Recomputed, recompute};
