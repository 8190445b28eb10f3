//! Huddle service models.
//!
//! Contains data types shared by handlers, services, and repositories.

use crate::errors::HuddleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum participant identifier length in bytes.
pub const MAX_PARTICIPANT_ID_LENGTH: usize = 256;

/// Room identifier assigned by the membership store.
///
/// Rendered as a decimal integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only plain decimal digits; i64::from_str would also take a sign
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HuddleError::BadRequest(format!(
                "Room id must be a decimal integer, got '{}'",
                s
            )));
        }

        s.parse::<i64>()
            .map(RoomId)
            .map_err(|_| HuddleError::BadRequest("Room id is out of range".to_string()))
    }
}

/// Role of a participant inside a room.
///
/// Only `user` exists today; the value is stored next to every member so
/// that further roles can be added without a schema change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
}

impl Role {
    /// Returns the stored string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

/// Query string carrying the caller's participant identifier.
///
/// The bundled UI sends it as `?uuid=<id>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantQuery {
    pub uuid: Option<String>,
}

impl ParticipantQuery {
    /// Extract and validate the participant identifier.
    ///
    /// The identifier is client-chosen and not authenticated; it is only
    /// checked for shape.
    pub fn participant_id(&self) -> Result<&str, HuddleError> {
        let id = self
            .uuid
            .as_deref()
            .ok_or_else(|| HuddleError::BadRequest("Missing uuid query parameter".to_string()))?;

        validate_participant_id(id)?;
        Ok(id)
    }
}

/// Validate a client-supplied participant identifier.
pub fn validate_participant_id(id: &str) -> Result<(), HuddleError> {
    if id.trim().is_empty() {
        return Err(HuddleError::BadRequest(
            "Participant id must not be empty".to_string(),
        ));
    }

    // PostgreSQL text and JSONB cannot hold U+0000
    if id.contains('\0') {
        return Err(HuddleError::BadRequest(
            "Participant id must not contain NUL characters".to_string(),
        ));
    }

    if id.len() > MAX_PARTICIPANT_ID_LENGTH {
        return Err(HuddleError::BadRequest(format!(
            "Participant id must be at most {} bytes",
            MAX_PARTICIPANT_ID_LENGTH
        )));
    }

    Ok(())
}

/// Readiness probe response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Membership store connectivity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    /// Generic failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
