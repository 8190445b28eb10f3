//! Room handlers for the Huddle service.
//!
//! - `POST /room?uuid=<participant>` - Create a room with the caller as first member
//! - `PATCH /room/{room_id}?uuid=<participant>` - Join a room
//! - `GET /room/{room_id}` - List room members
//!
//! Room ids are plain decimal integers on the wire. Participant ids are
//! chosen by the client and are not authenticated.

use crate::errors::HuddleError;
use crate::models::{ParticipantQuery, RoomId};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /room
///
/// # Response
///
/// - 200 OK: the new room id as `text/plain`
/// - 400 Bad Request: missing or invalid `uuid`
/// - 500 Internal Server Error: membership store failure
#[instrument(skip_all, name = "huddle.room.create")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantQuery>,
) -> Result<String, HuddleError> {
    let participant_id = query.participant_id()?;
    let room_id = state.registry.create(participant_id).await?;
    Ok(room_id.to_string())
}

/// Handler for PATCH /room/{room_id}
///
/// Joining twice is harmless. The room id is echoed back on success in its
/// canonical decimal form, so `/room/007` answers `7`.
///
/// # Response
///
/// - 200 OK: the room id as `text/plain`
/// - 400 Bad Request: non-decimal room id or missing `uuid`
/// - 404 Not Found: room does not exist
/// - 500 Internal Server Error: membership store failure
#[instrument(skip_all, name = "huddle.room.join", fields(room_id = %raw_room_id))]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(raw_room_id): Path<String>,
    Query(query): Query<ParticipantQuery>,
) -> Result<String, HuddleError> {
    let room_id: RoomId = raw_room_id.parse()?;
    let participant_id = query.participant_id()?;
    state.registry.join(room_id, participant_id).await?;
    Ok(room_id.to_string())
}

/// Handler for GET /room/{room_id}
///
/// Returns the member ids as a JSON array in ascending byte order.
#[instrument(skip_all, name = "huddle.room.list", fields(room_id = %raw_room_id))]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(raw_room_id): Path<String>,
) -> Result<Json<Vec<String>>, HuddleError> {
    let room_id: RoomId = raw_room_id.parse()?;
    let members = state.registry.list_members(room_id).await?;
    Ok(Json(members))
}
