//! Signaling gateway.
//!
//! Reverse proxy for WHIP (publish) and WHEP (subscribe) negotiation
//! requests. Each request is forwarded once to the single configured
//! upstream media server with the service credential attached, and the
//! upstream response is streamed back unmodified.
//!
//! # Security
//!
//! - The service credential is built into a sensitive header value once at
//!   construction and only ever attached to the outbound request.
//! - Outbound headers are assembled into a fresh `HeaderMap`; the caller's
//!   request is borrowed, never mutated.
//! - Upstream transport errors are logged server-side and surfaced as a
//!   generic 502.

use crate::config::Config;
use crate::errors::HuddleError;
use crate::observability::metrics;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use axum::response::Response;
use bytes::Bytes;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Connect timeout for the upstream media server.
const UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Largest negotiation body accepted for forwarding (1 MiB).
/// SDP offers are a few kilobytes.
pub const MAX_NEGOTIATION_BODY_BYTES: usize = 1024 * 1024;

/// Headers that apply to a single connection and are never forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Class of negotiation request being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationKind {
    /// WHIP: a participant publishing media.
    Publish,
    /// WHEP: a participant subscribing to media.
    Subscribe,
}

impl NegotiationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationKind::Publish => "whip",
            NegotiationKind::Subscribe => "whep",
        }
    }
}

/// Caller's negotiation request as received by the router.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Address of the calling client, appended to `x-forwarded-for`.
    pub client_ip: Option<IpAddr>,
}

/// Credential-injecting reverse proxy to the upstream media server.
///
/// Holds no per-request state; one instance serves all rooms concurrently.
#[derive(Clone)]
pub struct SignalingGateway {
    client: Client,
    upstream: Url,
    authorization: Option<HeaderValue>,
}

impl SignalingGateway {
    /// Create a gateway for `upstream`.
    ///
    /// An empty `credential` disables injection and passes the caller's
    /// Authorization header through.
    ///
    /// # Errors
    ///
    /// Returns `HuddleError::Internal` if the credential cannot be encoded
    /// as a header value or the HTTP client cannot be built.
    pub fn new(
        upstream: Url,
        credential: &SecretString,
        timeout: Duration,
    ) -> Result<Self, HuddleError> {
        let authorization = if credential.expose_secret().is_empty() {
            None
        } else {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
                    .map_err(|_| {
                        warn!(target: "huddle.services.signaling_gateway", "Upstream credential contains characters not allowed in a header");
                        HuddleError::Internal
                    })?;
            value.set_sensitive(true);
            Some(value)
        };

        // 3xx responses are relayed to the caller, not followed
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(UPSTREAM_CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                warn!(target: "huddle.services.signaling_gateway", error = %e, "Failed to build HTTP client");
                HuddleError::Internal
            })?;

        Ok(Self {
            client,
            upstream,
            authorization,
        })
    }

    /// Create a gateway from service configuration.
    pub fn from_config(config: &Config) -> Result<Self, HuddleError> {
        Self::new(
            config.upstream_url.clone(),
            &config.upstream_token,
            Duration::from_secs(config.upstream_timeout_seconds),
        )
    }

    /// Upstream URL for an incoming request URI.
    ///
    /// The upstream base path and the request path are joined with exactly
    /// one slash; the query string is carried over verbatim.
    pub fn upstream_url_for(&self, uri: &Uri) -> Url {
        let mut url = self.upstream.clone();
        let joined = join_paths(self.upstream.path(), uri.path());
        url.set_path(&joined);
        url.set_query(uri.query());
        url
    }

    /// Build the outbound header set for a forwarded request.
    pub fn outbound_headers(&self, incoming: &HeaderMap, client_ip: Option<IpAddr>) -> HeaderMap {
        let mut headers = copy_end_to_end_headers(incoming);

        if let Some(authorization) = &self.authorization {
            headers.insert(header::AUTHORIZATION, authorization.clone());
        }

        if let Some(ip) = client_ip {
            let forwarded = match incoming
                .get_all("x-forwarded-for")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
            {
                prior if prior.is_empty() => ip.to_string(),
                prior => format!("{}, {}", prior.join(", "), ip),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded) {
                headers.insert(HeaderName::from_static("x-forwarded-for"), value);
            }
        }

        headers
    }

    /// Forward one negotiation request and relay the upstream response.
    ///
    /// `participant_id` is used only for logging. The request is borrowed
    /// so the caller keeps the original body intact if the forward fails.
    /// No retries are made.
    ///
    /// # Errors
    ///
    /// - `HuddleError::Gateway` if the upstream cannot be reached, times out,
    ///   or fails at the transport level. An upstream that answers with an
    ///   error status is not an error here; its response is relayed.
    #[instrument(
        skip_all,
        name = "huddle.gateway.forward",
        fields(kind = kind.as_str(), participant_id = %participant_id, method = %request.method)
    )]
    pub async fn forward(
        &self,
        kind: NegotiationKind,
        participant_id: &str,
        request: &ForwardRequest,
    ) -> Result<Response, HuddleError> {
        let url = self.upstream_url_for(&request.uri);
        let headers = self.outbound_headers(&request.headers, request.client_ip);
        let start = Instant::now();

        let upstream = self
            .client
            .request(request.method.clone(), url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                metrics::record_gateway_forward(kind.as_str(), "error", start.elapsed());
                let reason = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "transport error"
                };
                warn!(
                    target: "huddle.services.signaling_gateway",
                    error = %e,
                    reason,
                    "Upstream forward failed"
                );
                HuddleError::Gateway(format!("upstream {}: {}", reason, e))
            })?;

        let status = upstream.status();
        metrics::record_gateway_forward(kind.as_str(), "success", start.elapsed());
        debug!(
            target: "huddle.services.signaling_gateway",
            status = status.as_u16(),
            "Upstream responded"
        );

        let response_headers = copy_end_to_end_headers(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;

        Ok(response)
    }
}

/// Join two URL paths with a single slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, path.trim_start_matches('/')),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Copy all headers except hop-by-hop ones, `host`, and `content-length`.
///
/// Header names listed in the `connection` header are hop-by-hop too.
fn copy_end_to_end_headers(incoming: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = incoming
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        let lower = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&lower)
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || connection_listed.iter().any(|listed| listed == lower)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
