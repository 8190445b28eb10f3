//! Repository layer for the Huddle service.
//!
//! Follows the Handler -> Service -> Repository architecture. The
//! membership store is the only owner of persisted room state; services
//! hold no cached copy and round-trip to the store on every call.
//!
//! # Components
//!
//! - `rooms` - PostgreSQL membership store
//! - `memory` - In-process membership store with the same contract

pub mod memory;
pub mod rooms;

pub use memory::InMemoryMembershipStore;
pub use rooms::PgMembershipStore;

use crate::errors::HuddleError;
use crate::models::{Role, RoomId};
use std::collections::HashSet;

/// Durable room -> participant membership storage.
///
/// Implementations must be safe for many concurrent operations, and
/// `add_participant` must merge atomically: two concurrent joins on the
/// same room must both be reflected in the final membership set.
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    /// Allocate a new room containing exactly `initial_participant`.
    ///
    /// On error the caller must not assume the room exists.
    async fn create_room(
        &self,
        initial_participant: &str,
        role: Role,
    ) -> Result<RoomId, HuddleError>;

    /// Merge `participant_id` into the room's membership.
    ///
    /// Re-adding an existing member overwrites its role rather than
    /// duplicating it. Fails with `NotFound` for an unknown room.
    async fn add_participant(
        &self,
        room_id: RoomId,
        participant_id: &str,
        role: Role,
    ) -> Result<(), HuddleError>;

    /// Current membership set of a room.
    ///
    /// Fails with `NotFound` for an unknown room. Every room is created
    /// with one participant, so an existing room never yields an empty set.
    async fn get_members(&self, room_id: RoomId) -> Result<HashSet<String>, HuddleError>;

    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), HuddleError>;
}
