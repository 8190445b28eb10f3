//! In-process membership store.
//!
//! Same contract as [`PgMembershipStore`](super::PgMembershipStore), backed
//! by a mutex-guarded map. Every operation takes the lock for its whole
//! duration, which makes each merge atomic. Used by router and service
//! tests that do not need a database.

use crate::errors::HuddleError;
use crate::models::{Role, RoomId};
use crate::repositories::MembershipStore;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct Rooms {
    last_id: i64,
    members: HashMap<RoomId, HashMap<String, Role>>,
}

/// Membership store held entirely in memory.
pub struct InMemoryMembershipStore {
    rooms: Mutex<Rooms>,
    unavailable: bool,
}

impl InMemoryMembershipStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(Rooms::default()),
            unavailable: false,
        }
    }

    /// Create a store whose every operation fails with `Storage`,
    /// simulating an unreachable database.
    pub fn unavailable() -> Self {
        Self {
            rooms: Mutex::new(Rooms::default()),
            unavailable: true,
        }
    }

    /// Number of rooms created so far.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.members.len()
    }

    fn check_available(&self) -> Result<(), HuddleError> {
        if self.unavailable {
            return Err(HuddleError::Storage(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryMembershipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn create_room(
        &self,
        initial_participant: &str,
        role: Role,
    ) -> Result<RoomId, HuddleError> {
        self.check_available()?;

        let mut rooms = self.rooms.lock().await;
        rooms.last_id += 1;
        let id = RoomId(rooms.last_id);
        rooms
            .members
            .insert(id, HashMap::from([(initial_participant.to_string(), role)]));
        Ok(id)
    }

    async fn add_participant(
        &self,
        room_id: RoomId,
        participant_id: &str,
        role: Role,
    ) -> Result<(), HuddleError> {
        self.check_available()?;

        let mut rooms = self.rooms.lock().await;
        let members = rooms
            .members
            .get_mut(&room_id)
            .ok_or_else(|| HuddleError::NotFound(format!("Room {} not found", room_id)))?;
        members.insert(participant_id.to_string(), role);
        Ok(())
    }

    async fn get_members(&self, room_id: RoomId) -> Result<HashSet<String>, HuddleError> {
        self.check_available()?;

        let rooms = self.rooms.lock().await;
        rooms
            .members
            .get(&room_id)
            .map(|members| members.keys().cloned().collect())
            .ok_or_else(|| HuddleError::NotFound(format!("Room {} not found", room_id)))
    }

    async fn ping(&self) -> Result<(), HuddleError> {
        self.check_available()
    }
}
