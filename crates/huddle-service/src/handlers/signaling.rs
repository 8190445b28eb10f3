//! WHIP/WHEP signaling handlers.
//!
//! - `/whip/{participant_id}` - Publish negotiation
//! - `/whep/{participant_id}` - Subscribe negotiation
//!
//! Every method is accepted and forwarded unchanged, so the upstream media
//! server sees POST offers, PATCH trickle candidates, DELETE teardowns and
//! OPTIONS preflights exactly as the client sent them. Bodies are capped by
//! the router's body limit before these handlers run.

use crate::errors::HuddleError;
use crate::models::validate_participant_id;
use crate::routes::AppState;
use crate::services::{ForwardRequest, NegotiationKind};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Handler for any method on /whip/{participant_id}
pub async fn forward_publish(
    state: State<Arc<AppState>>,
    participant_id: Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HuddleError> {
    forward(
        NegotiationKind::Publish,
        state,
        participant_id,
        connect_info,
        ForwardParts { method, uri, headers, body },
    )
    .await
}

/// Handler for any method on /whep/{participant_id}
pub async fn forward_subscribe(
    state: State<Arc<AppState>>,
    participant_id: Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HuddleError> {
    forward(
        NegotiationKind::Subscribe,
        state,
        participant_id,
        connect_info,
        ForwardParts { method, uri, headers, body },
    )
    .await
}

struct ForwardParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

async fn forward(
    kind: NegotiationKind,
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    parts: ForwardParts,
) -> Result<Response, HuddleError> {
    validate_participant_id(&participant_id)?;

    let request = ForwardRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body: parts.body,
        client_ip: connect_info.map(|ConnectInfo(addr)| addr.ip()),
    };

    state
        .gateway
        .forward(kind, &participant_id, &request)
        .await
}
