//! Waypoint
//!
//! Flow graph editing and enrollment resolution for in-product tours.
//!
//! The work is split across crates:
//! - `waypoint-config`: flow documents and the sparse update payload
//! - `waypoint-graph`: step tree lookups and relation recomputation
//! - `waypoint-store`: the storage trait with SQLite and in-memory backends
//! - `waypoint-editor`: the flow mutation service
//! - `waypoint-enroller`: enrollment resolution and user progress
//!
//! This crate wires them together from environment configuration.

pub mod config;
pub mod telemetry;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub use config::{ConfigError, WaypointConfig};
pub use waypoint_config as model;
pub use waypoint_editor as editor;
pub use waypoint_enroller as enroller;
pub use waypoint_graph as graph;
pub use waypoint_store as store;

use waypoint_editor::FlowEditor;
use waypoint_enroller::EnrollmentService;
use waypoint_store::SqliteStore;

/// The editor and enrollment services over one shared SQLite store.
pub struct Waypoint {
  pub editor: FlowEditor<Arc<SqliteStore>>,
  pub enrollment: EnrollmentService<Arc<SqliteStore>>,
}

impl Waypoint {
  /// Open the database, run migrations and build the services.
  pub async fn connect(config: &WaypointConfig) -> anyhow::Result<Self> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
      .with_context(|| format!("invalid database url: {}", config.database_url))?
      .create_if_missing(true);

    // Every connection to an in-memory database gets its own database.
    let in_memory = config.database_url.contains(":memory:");
    let max_connections = if in_memory { 1 } else { config.max_connections };
    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
      pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
      .connect_with(options)
      .await
      .context("failed to open database")?;

    let store = Arc::new(SqliteStore::new(pool));
    store.migrate().await.context("failed to run migrations")?;
    info!(max_connections, "store ready");

    Ok(Self {
      editor: FlowEditor::new(store.clone(), config.editor.clone()),
      enrollment: EnrollmentService::new(store),
    })
  }
}
