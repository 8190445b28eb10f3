//! HTTP request handlers for the Huddle service.

pub mod health;
pub mod metrics;
pub mod rooms;
pub mod signaling;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use rooms::{create_room, join_room, list_members};
pub use signaling::{forward_publish, forward_subscribe};
