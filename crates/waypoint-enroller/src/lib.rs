//! Waypoint Enroller
//!
//! Decides which flow a user sees next and keeps track of what they have
//! finished or skipped.
//!
//! - [`Enroller`] evaluates the workspace's live flows against a user's
//!   [`EnrollmentOpts`] and returns the first eligible one
//! - [`EnrollmentService`] wraps it with the stored per-user state: it
//!   remembers the current flow and records finished/skipped reports
//! - [`FlowAnalytics`] aggregates the events clients track for a flow

mod analytics;
mod eligibility;
mod error;
mod opts;
mod resolver;
mod service;
mod tracking;

pub use analytics::FlowAnalytics;
pub use eligibility::Eligibility;
pub use error::EnrollError;
pub use opts::{EnrollmentOpts, FlowStateUpdate, UserProfile};
pub use resolver::Enroller;
pub use service::EnrollmentService;
