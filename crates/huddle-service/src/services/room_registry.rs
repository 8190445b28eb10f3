//! Room registry.
//!
//! Business logic for room membership on top of a [`MembershipStore`].
//! Every call goes to the store; no membership is cached between calls.

use crate::errors::HuddleError;
use crate::models::{Role, RoomId};
use crate::observability::metrics;
use crate::repositories::MembershipStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Creates rooms, records joins, and lists members in a stable order.
#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<dyn MembershipStore>,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Create a room whose only member is `initial_participant`.
    ///
    /// Not idempotent: every call allocates a new room.
    #[instrument(skip_all, name = "huddle.registry.create")]
    pub async fn create(&self, initial_participant: &str) -> Result<RoomId, HuddleError> {
        let room_id = self.store.create_room(initial_participant, Role::User).await?;

        metrics::record_room_created();
        info!(target: "huddle.services.room_registry", room_id = %room_id, "Room created");

        Ok(room_id)
    }

    /// Add `participant_id` to an existing room.
    ///
    /// Joining a room twice is a no-op. Unknown rooms fail with `NotFound`.
    #[instrument(skip_all, name = "huddle.registry.join", fields(room_id = %room_id))]
    pub async fn join(&self, room_id: RoomId, participant_id: &str) -> Result<(), HuddleError> {
        let result = self
            .store
            .add_participant(room_id, participant_id, Role::User)
            .await;

        match &result {
            Ok(()) => {
                metrics::record_room_join("success");
                debug!(target: "huddle.services.room_registry", room_id = %room_id, "Participant joined room");
            }
            Err(e) => metrics::record_room_join(e.error_type()),
        }

        result
    }

    /// Members of a room, sorted ascending by identifier.
    ///
    /// Join order is not preserved; the sort makes repeated calls against
    /// unchanged state return identical output.
    #[instrument(skip_all, name = "huddle.registry.list_members", fields(room_id = %room_id))]
    pub async fn list_members(&self, room_id: RoomId) -> Result<Vec<String>, HuddleError> {
        let mut members: Vec<String> = self.store.get_members(room_id).await?.into_iter().collect();
        members.sort_unstable();
        Ok(members)
    }

    /// Check that the membership store is reachable.
    pub async fn ping(&self) -> Result<(), HuddleError> {
        self.store.ping().await
    }
}
