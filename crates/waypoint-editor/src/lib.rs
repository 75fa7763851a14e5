//! Waypoint Editor
//!
//! This crate applies editor changes to stored flows. It provides:
//! - [`FlowEditor`], the service that loads, mutates, recomputes and saves
//!   flows, and moves them through publish/archive states
//! - pure mutation functions in [`mutation`] for step upserts, deletes with
//!   edge contraction and segment upserts
//! - the built-in finish-effect catalog in [`effects`]

mod config;
pub mod effects;
mod editor;
mod error;
pub mod mutation;

pub use config::{ConcurrencyMode, DeletePolicy, EditorConfig};
pub use editor::FlowEditor;
pub use error::EditError;
