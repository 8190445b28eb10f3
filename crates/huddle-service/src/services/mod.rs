//! Service layer for the Huddle service.
//!
//! # Components
//!
//! - `room_registry` - Room creation, joins, and member listing
//! - `signaling_gateway` - Credential-injecting WHIP/WHEP reverse proxy

pub mod room_registry;
pub mod signaling_gateway;

pub use room_registry::RoomRegistry;
pub use signaling_gateway::{ForwardRequest, NegotiationKind, SignalingGateway};
