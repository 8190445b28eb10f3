//! HTTP routes for the Huddle service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::errors::HuddleError;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::signaling_gateway::MAX_NEGOTIATION_BODY_BYTES;
use crate::services::{RoomRegistry, SignalingGateway};
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get, post},
    BoxError, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Room membership operations.
    pub registry: RoomRegistry,

    /// WHIP/WHEP forwarder to the upstream media server.
    pub gateway: SignalingGateway,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/room` - Create room (POST)
/// - `/room/{room_id}` - Join room (PATCH), list members (GET)
/// - `/whip/{participant_id}`, `/whep/{participant_id}` - Forwarded negotiation, any method
/// - `/health` - Liveness probe
/// - `/ready` - Readiness probe (checks the membership store)
/// - `/metrics` - Prometheus metrics endpoint
/// - Bundled UI from `STATIC_DIR` for every other path, when configured
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);
    let static_dir = state.config.static_dir.clone();

    let room_routes = Router::new()
        .route("/room", post(handlers::create_room))
        .route("/room/", post(handlers::create_room))
        .route(
            "/room/:room_id",
            get(handlers::list_members).patch(handlers::join_room),
        );

    let signaling_routes = Router::new()
        .route("/whip/:participant_id", any(handlers::forward_publish))
        .route("/whep/:participant_id", any(handlers::forward_subscribe))
        .layer(DefaultBodyLimit::max(MAX_NEGOTIATION_BODY_BYTES));

    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .merge(room_routes)
        .merge(signaling_routes)
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let mut router = app_routes.merge(metrics_routes);

    // Unknown paths get the UI entry document so client-side routing works
    if let Some(dir) = static_dir {
        let index = Path::new(&dir).join("index.html");
        router = router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }

    // Layer order (bottom-to-top execution):
    // 1. Request timeout, answered with 504 (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    router
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Turn a request-level deadline into a server-side 504.
///
/// The request timeout is always longer than the upstream timeout, so a
/// slow media server is reported as 502 by the gateway before this fires.
async fn handle_timeout_error(err: BoxError) -> HuddleError {
    if err.is::<tower::timeout::error::Elapsed>() {
        HuddleError::Timeout
    } else {
        tracing::warn!(target: "huddle.routes", error = %err, "Unhandled middleware error");
        HuddleError::Internal
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{Role, RoomId};
    use crate::repositories::{InMemoryMembershipStore, MembershipStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_config(extra: &[(&str, &str)]) -> Config {
        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/huddle_test".to_string(),
            ),
            // Nothing listens on port 1
            ("UPSTREAM_URL".to_string(), "http://127.0.0.1:1".to_string()),
            ("UPSTREAM_TOKEN".to_string(), "secret".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        Config::from_vars(&vars).expect("test config should be valid")
    }

    fn router_for(store: Arc<dyn MembershipStore>, config: Config) -> Router {
        let gateway = SignalingGateway::from_config(&config).unwrap();
        let state = Arc::new(AppState {
            config,
            registry: RoomRegistry::new(store),
            gateway,
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    fn test_router_with(store: InMemoryMembershipStore, static_dir: Option<&str>) -> Router {
        let config = match static_dir {
            Some(dir) => test_config(&[("STATIC_DIR", dir)]),
            None => test_config(&[]),
        };
        router_for(Arc::new(store), config)
    }

    /// Store whose operations never finish within a test's request timeout.
    struct StalledStore;

    #[async_trait::async_trait]
    impl MembershipStore for StalledStore {
        async fn create_room(&self, _: &str, _: Role) -> Result<RoomId, HuddleError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RoomId(1))
        }

        async fn add_participant(&self, _: RoomId, _: &str, _: Role) -> Result<(), HuddleError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        async fn get_members(
            &self,
            _: RoomId,
        ) -> Result<std::collections::HashSet<String>, HuddleError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Default::default())
        }

        async fn ping(&self) -> Result<(), HuddleError> {
            Ok(())
        }
    }

    fn test_router() -> Router {
        test_router_with(InMemoryMembershipStore::new(), None)
    }

    async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_create_join_list_flow() {
        let router = test_router();

        let (status, room_id) = send(&router, "POST", "/room?uuid=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert!(room_id.parse::<i64>().is_ok(), "room id should be decimal: {room_id}");

        let (status, echoed) = send(&router, "PATCH", &format!("/room/{room_id}?uuid=bob")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed, room_id);

        // Joining again is a no-op
        let (status, _) = send(&router, "PATCH", &format!("/room/{room_id}?uuid=bob")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, "GET", &format!("/room/{room_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let members: Vec<String> = serde_json::from_str(&body).unwrap();
        assert_eq!(members, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_join_echoes_canonical_room_id() {
        let router = test_router();

        let (_, room_id) = send(&router, "POST", "/room?uuid=alice").await;
        let (status, echoed) = send(&router, "PATCH", &format!("/room/00{room_id}?uuid=bob")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed, room_id);
    }

    #[tokio::test]
    async fn test_create_with_trailing_slash() {
        let router = test_router();
        let (status, _) = send(&router, "POST", "/room/?uuid=alice").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_without_uuid_is_bad_request() {
        let router = test_router();

        let (status, body) = send(&router, "POST", "/room").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(&router, "POST", "/room?uuid=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found() {
        let router = test_router();

        let (status, _) = send(&router, "PATCH", "/room/999?uuid=bob").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, "GET", "/room/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_decimal_room_id_is_bad_request() {
        let router = test_router();

        let (status, _) = send(&router, "GET", "/room/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, "PATCH", "/room/-1?uuid=bob").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let router = test_router_with(InMemoryMembershipStore::unavailable(), None);

        let (status, body) = send(&router, "POST", "/room?uuid=alice").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn test_readiness_reflects_store_health() {
        let (status, body) = send(&test_router(), "GET", "/ready").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ready");

        let router = test_router_with(InMemoryMembershipStore::unavailable(), None);
        let (status, body) = send(&router, "GET", "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "not_ready");
        assert_eq!(json["database"], "unhealthy");
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let (status, body) = send(&test_router(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let router = test_router();

        let (status, body) = send(&router, "POST", "/whip/alice").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.contains("secret"));

        let (status, _) = send(&router, "DELETE", "/whep/bob").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_oversized_negotiation_body_is_rejected() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/whip/alice")
                    .header("content-type", "application/sdp")
                    .body(Body::from(vec![b'v'; MAX_NEGOTIATION_BODY_BYTES + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_path_without_static_dir_is_not_found() {
        let (status, _) = send(&test_router(), "GET", "/some/ui/route").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index() {
        let dir = std::env::temp_dir().join(format!("huddle-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>huddle</html>").unwrap();
        std::fs::write(dir.join("app.js"), "console.log(1)").unwrap();

        let router = test_router_with(InMemoryMembershipStore::new(), dir.to_str());

        let (status, body) = send(&router, "GET", "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = send(&router, "GET", "/rooms/42/call").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>huddle</html>");

        // API routes still win over the fallback
        let (status, _) = send(&router, "GET", "/room/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_request_timeout_is_gateway_timeout() {
        let config = test_config(&[
            ("UPSTREAM_TIMEOUT_SECONDS", "1"),
            ("REQUEST_TIMEOUT_SECONDS", "2"),
        ]);
        let router = router_for(Arc::new(StalledStore), config);

        let (status, body) = send(&router, "POST", "/room?uuid=alice").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "GATEWAY_TIMEOUT");
    }

    #[tokio::test]
    async fn test_slow_upstream_is_bad_gateway_not_timeout() {
        let upstream = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(201).set_delay(Duration::from_secs(3)),
            )
            .mount(&upstream)
            .await;

        let uri = upstream.uri();
        let config = test_config(&[
            ("UPSTREAM_URL", uri.as_str()),
            ("UPSTREAM_TIMEOUT_SECONDS", "1"),
            ("REQUEST_TIMEOUT_SECONDS", "2"),
        ]);
        let router = router_for(Arc::new(InMemoryMembershipStore::new()), config);

        let (status, _) = send(&router, "POST", "/whip/alice").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_router_config_rejects_upstream_timeout_at_or_above_request_timeout() {
        let vars = HashMap::from([
            ("DATABASE_URL".to_string(), "postgres://localhost/huddle_test".to_string()),
            ("UPSTREAM_URL".to_string(), "http://127.0.0.1:1".to_string()),
            ("UPSTREAM_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("REQUEST_TIMEOUT_SECONDS".to_string(), "1".to_string()),
        ]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(crate::config::ConfigError::InvalidTimeout(_))
        ));
    }
}
