//! Rooms repository backed by PostgreSQL.
//!
//! Each room is one row whose `participants` JSONB column maps participant
//! identifier to role.
//!
//! # Concurrency
//!
//! Joins use a single `UPDATE ... SET participants = participants || ...`.
//! Postgres takes a row lock for the update and re-evaluates the expression
//! against the latest row version, so concurrent joins on one room never
//! overwrite each other. There is no read-modify-write in application code.

use crate::errors::HuddleError;
use crate::models::{Role, RoomId};
use crate::observability::metrics;
use crate::repositories::MembershipStore;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::instrument;

/// Membership store over a shared PostgreSQL connection pool.
///
/// The pool hands each operation its own connection, so a single instance
/// can be shared across all request handlers.
#[derive(Clone)]
pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run a query future and record its duration under `operation`.
async fn timed<T, F>(operation: &'static str, query: F) -> Result<T, HuddleError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let start = Instant::now();
    let result = query.await;
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result.map_err(HuddleError::from)
}

#[async_trait::async_trait]
impl MembershipStore for PgMembershipStore {
    #[instrument(skip_all, name = "huddle.repo.create_room")]
    async fn create_room(
        &self,
        initial_participant: &str,
        role: Role,
    ) -> Result<RoomId, HuddleError> {
        let id: i64 = timed(
            "create_room",
            sqlx::query_scalar(
                r#"
                INSERT INTO rooms (participants)
                VALUES (jsonb_build_object($1::text, $2::text))
                RETURNING id
                "#,
            )
            .bind(initial_participant)
            .bind(role.as_str())
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(RoomId(id))
    }

    #[instrument(skip_all, name = "huddle.repo.add_participant", fields(room_id = %room_id))]
    async fn add_participant(
        &self,
        room_id: RoomId,
        participant_id: &str,
        role: Role,
    ) -> Result<(), HuddleError> {
        let updated: Option<i64> = timed(
            "add_participant",
            sqlx::query_scalar(
                r#"
                UPDATE rooms
                SET participants = participants || jsonb_build_object($2::text, $3::text),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(room_id.0)
            .bind(participant_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool),
        )
        .await?;

        match updated {
            Some(_) => Ok(()),
            None => Err(HuddleError::NotFound(format!("Room {} not found", room_id))),
        }
    }

    #[instrument(skip_all, name = "huddle.repo.get_members", fields(room_id = %room_id))]
    async fn get_members(&self, room_id: RoomId) -> Result<HashSet<String>, HuddleError> {
        let participants: Option<Json<HashMap<String, String>>> = timed(
            "get_members",
            sqlx::query_scalar(
                r#"
                SELECT participants
                FROM rooms
                WHERE id = $1
                "#,
            )
            .bind(room_id.0)
            .fetch_optional(&self.pool),
        )
        .await?;

        participants
            .map(|Json(map)| map.into_keys().collect())
            .ok_or_else(|| HuddleError::NotFound(format!("Room {} not found", room_id)))
    }

    async fn ping(&self) -> Result<(), HuddleError> {
        timed("ping", sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}
