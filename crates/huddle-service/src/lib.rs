//! Huddle Service Library
//!
//! Backend for a small group video-call application:
//!
//! - Room registry: durable sets of participant ids per room
//! - Signaling gateway: forwards WHIP/WHEP negotiation to one upstream
//!   media server and injects the service credential
//! - Optional serving of the bundled web UI
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `args` - Command-line flags
//! - `config` - Service configuration from environment
//! - `errors` - Error type with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Shared data types
//! - `observability` - Metrics and tracing setup
//! - `repositories` - Membership stores (PostgreSQL, in-memory)
//! - `routes` - Axum router setup
//! - `services` - Room registry and signaling gateway

pub mod args;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
