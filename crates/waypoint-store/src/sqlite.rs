use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;
use tracing::debug;
use waypoint_config::{Flow, FlowId};

use crate::{Error, Store, TrackedEvent, UserState};

/// SQLite-based store implementation.
///
/// Flows are stored as JSON documents next to the columns that queries
/// filter on. The `revision` column is authoritative; the copy inside the
/// document is overwritten on read.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }

  async fn stored_revision(&self, flow: &Flow) -> Result<Option<u64>, Error> {
    let row: Option<(i64,)> =
      sqlx::query_as("SELECT revision FROM flows WHERE flow_id = ? AND workspace_id = ?")
        .bind(flow.id.to_string())
        .bind(&flow.workspace_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(|(revision,)| revision as u64))
  }
}

fn with_revision((Json(mut flow), revision): (Json<Flow>, i64)) -> Flow {
  flow.revision = revision as u64;
  flow
}

fn map_insert_error(err: sqlx::Error, flow_id: FlowId) -> Error {
  match &err {
    sqlx::Error::Database(db) if db.is_unique_violation() => {
      Error::AlreadyExists(format!("flow {}", flow_id))
    }
    _ => Error::Database(err),
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn insert_flow(&self, flow: &Flow) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO flows (flow_id, workspace_id, live, revision, document)
            VALUES (?, ?, ?, ?, ?)
            "#,
    )
    .bind(flow.id.to_string())
    .bind(&flow.workspace_id)
    .bind(flow.live)
    .bind(flow.revision as i64)
    .bind(Json(flow))
    .execute(&self.pool)
    .await
    .map_err(|e| map_insert_error(e, flow.id))?;

    Ok(())
  }

  async fn get_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<Flow, Error> {
    let row: Option<(Json<Flow>, i64)> = sqlx::query_as(
      r#"
            SELECT document, revision
            FROM flows
            WHERE flow_id = ? AND workspace_id = ?
            "#,
    )
    .bind(flow_id.to_string())
    .bind(workspace_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(with_revision)
      .ok_or_else(|| Error::NotFound(format!("flow {}", flow_id)))
  }

  async fn list_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let rows: Vec<(Json<Flow>, i64)> = sqlx::query_as(
      r#"
            SELECT document, revision
            FROM flows
            WHERE workspace_id = ?
            ORDER BY seq ASC
            "#,
    )
    .bind(workspace_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(with_revision).collect())
  }

  async fn list_live_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let rows: Vec<(Json<Flow>, i64)> = sqlx::query_as(
      r#"
            SELECT document, revision
            FROM flows
            WHERE workspace_id = ? AND live = 1
            ORDER BY seq ASC
            "#,
    )
    .bind(workspace_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(with_revision).collect())
  }

  async fn save_flow(&self, flow: &Flow, expected_revision: Option<u64>) -> Result<u64, Error> {
    let updated: Option<(i64,)> = match expected_revision {
      Some(expected) => {
        sqlx::query_as(
          r#"
            UPDATE flows
            SET document = ?, live = ?, revision = revision + 1
            WHERE flow_id = ? AND workspace_id = ? AND revision = ?
            RETURNING revision
            "#,
        )
        .bind(Json(flow))
        .bind(flow.live)
        .bind(flow.id.to_string())
        .bind(&flow.workspace_id)
        .bind(expected as i64)
        .fetch_optional(&self.pool)
        .await?
      }
      None => {
        sqlx::query_as(
          r#"
            UPDATE flows
            SET document = ?, live = ?, revision = revision + 1
            WHERE flow_id = ? AND workspace_id = ?
            RETURNING revision
            "#,
        )
        .bind(Json(flow))
        .bind(flow.live)
        .bind(flow.id.to_string())
        .bind(&flow.workspace_id)
        .fetch_optional(&self.pool)
        .await?
      }
    };

    if let Some((revision,)) = updated {
      return Ok(revision as u64);
    }

    match (self.stored_revision(flow).await?, expected_revision) {
      (Some(actual), Some(expected)) => {
        debug!(flow_id = %flow.id, expected, actual, "revision mismatch on save");
        Err(Error::Conflict {
          flow_id: flow.id,
          expected,
          actual,
        })
      }
      _ => Err(Error::NotFound(format!("flow {}", flow.id))),
    }
  }

  async fn archive_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    let mut tx = self.pool.begin().await?;

    let row: Option<(Json<Flow>, i64)> =
      sqlx::query_as("SELECT document, revision FROM flows WHERE flow_id = ? AND workspace_id = ?")
        .bind(flow_id.to_string())
        .bind(workspace_id)
        .fetch_optional(&mut *tx)
        .await?;
    let flow = row
      .map(with_revision)
      .ok_or_else(|| Error::NotFound(format!("flow {}", flow_id)))?;

    sqlx::query(
      r#"
            INSERT INTO archived_flows (flow_id, workspace_id, document, archived_at)
            VALUES (?, ?, ?, ?)
            "#,
    )
    .bind(flow_id.to_string())
    .bind(workspace_id)
    .bind(Json(&flow))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| map_insert_error(e, flow_id))?;

    sqlx::query("DELETE FROM flows WHERE flow_id = ? AND workspace_id = ?")
      .bind(flow_id.to_string())
      .bind(workspace_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }

  async fn list_archived_flows(&self, workspace_id: &str) -> Result<Vec<Flow>, Error> {
    let rows: Vec<(Json<Flow>,)> = sqlx::query_as(
      r#"
            SELECT document
            FROM archived_flows
            WHERE workspace_id = ?
            ORDER BY seq ASC
            "#,
    )
    .bind(workspace_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(|(Json(flow),)| flow).collect())
  }

  async fn restore_flow(&self, workspace_id: &str, flow_id: FlowId) -> Result<(), Error> {
    let mut tx = self.pool.begin().await?;

    let row: Option<(Json<Flow>,)> = sqlx::query_as(
      "SELECT document FROM archived_flows WHERE flow_id = ? AND workspace_id = ?",
    )
    .bind(flow_id.to_string())
    .bind(workspace_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((Json(flow),)) = row else {
      return Err(Error::NotFound(format!("archived flow {}", flow_id)));
    };

    sqlx::query(
      r#"
            INSERT INTO flows (flow_id, workspace_id, live, revision, document)
            VALUES (?, ?, ?, ?, ?)
            "#,
    )
    .bind(flow_id.to_string())
    .bind(workspace_id)
    .bind(flow.live)
    .bind(flow.revision as i64)
    .bind(Json(&flow))
    .execute(&mut *tx)
    .await
    .map_err(|e| map_insert_error(e, flow_id))?;

    sqlx::query("DELETE FROM archived_flows WHERE flow_id = ? AND workspace_id = ?")
      .bind(flow_id.to_string())
      .bind(workspace_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }

  async fn get_user_state(
    &self,
    workspace_id: &str,
    user_id: &str,
  ) -> Result<Option<UserState>, Error> {
    let row: Option<(Json<UserState>,)> =
      sqlx::query_as("SELECT document FROM user_states WHERE workspace_id = ? AND user_id = ?")
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

    Ok(row.map(|(Json(state),)| state))
  }

  async fn put_user_state(&self, state: &UserState) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO user_states (workspace_id, user_id, document)
            VALUES (?, ?, ?)
            ON CONFLICT (workspace_id, user_id) DO UPDATE SET document = excluded.document
            "#,
    )
    .bind(&state.workspace_id)
    .bind(&state.user_id)
    .bind(Json(state))
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn record_events(&self, events: &[TrackedEvent]) -> Result<(), Error> {
    let mut tx = self.pool.begin().await?;

    for event in events {
      sqlx::query(
        r#"
            INSERT INTO tracked_events (workspace_id, entity_id, document)
            VALUES (?, ?, ?)
            "#,
      )
      .bind(&event.workspace_id)
      .bind(&event.entity_id)
      .bind(Json(event))
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn list_events_for_flow(
    &self,
    workspace_id: &str,
    flow_id: FlowId,
  ) -> Result<Vec<TrackedEvent>, Error> {
    let rows: Vec<(Json<TrackedEvent>,)> = sqlx::query_as(
      r#"
            SELECT document
            FROM tracked_events
            WHERE workspace_id = ? AND entity_id = ?
            ORDER BY seq ASC
            "#,
    )
    .bind(workspace_id)
    .bind(flow_id.to_string())
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(|(Json(event),)| event).collect())
  }
}
