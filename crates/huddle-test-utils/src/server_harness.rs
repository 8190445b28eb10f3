//! Test server harness for E2E testing
//!
//! Provides `TestHuddleServer` for spawning real Huddle server instances in
//! tests, backed by the PostgreSQL membership store.

use huddle_service::config::Config;
use huddle_service::observability::metrics::init_metrics_recorder;
use huddle_service::repositories::PgMembershipStore;
use huddle_service::routes::{self, AppState};
use huddle_service::services::{RoomRegistry, SignalingGateway};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Upstream used when a test does not care about signaling. Nothing listens
/// on port 1, so forwards fail fast with 502.
pub const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:1";

/// Test harness for spawning the Huddle server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health_flow_e2e(pool: PgPool) -> Result<()> {
///     let server = TestHuddleServer::spawn(pool).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestHuddleServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestHuddleServer {
    /// Spawn a server with an unreachable upstream media server.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with_upstream(pool, UNREACHABLE_UPSTREAM, "test-upstream-token").await
    }

    /// Spawn a server forwarding signaling to `upstream_url`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// # Arguments
    /// * `pool` - Database connection pool (typically from `#[sqlx::test]`)
    /// * `upstream_url` - Base URL of the media server (e.g. a wiremock server)
    /// * `upstream_token` - Service credential; empty disables injection
    pub async fn spawn_with_upstream(
        pool: PgPool,
        upstream_url: &str,
        upstream_token: &str,
    ) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("UPSTREAM_URL".to_string(), upstream_url.to_string()),
            ("UPSTREAM_TOKEN".to_string(), upstream_token.to_string()),
            ("UPSTREAM_TIMEOUT_SECONDS".to_string(), "5".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let gateway = SignalingGateway::from_config(&config)
            .map_err(|e| anyhow::anyhow!("Failed to create gateway: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            registry: RoomRegistry::new(Arc::new(PgMembershipStore::new(pool.clone()))),
            gateway,
        });

        // Only one global recorder per process; later servers get a detached handle
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => PrometheusBuilder::new().build_recorder().handle(),
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            _handle: handle,
        })
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestHuddleServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_spawns_successfully(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestHuddleServer::spawn(pool).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_is_ready_with_database(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestHuddleServer::spawn(pool).await?;

        let response = reqwest::get(format!("{}/ready", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["database"], "healthy");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_provides_pool_access(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestHuddleServer::spawn(pool).await?;

        let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(server.pool()).await?;
        assert_eq!(result.0, 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_provides_config_access(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestHuddleServer::spawn_with_upstream(pool, "http://media:8889", "").await?;

        let config = server.config();
        assert_eq!(config.upstream_url.as_str(), "http://media:8889/");
        assert!(!config.has_upstream_token());
        assert_eq!(config.bind_address, "127.0.0.1:0");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_multiple_servers_different_ports(pool: PgPool) -> Result<(), anyhow::Error> {
        let server1 = TestHuddleServer::spawn(pool.clone()).await?;
        let server2 = TestHuddleServer::spawn(pool).await?;

        assert_ne!(server1.addr(), server2.addr());

        let response1 = reqwest::get(format!("{}/health", server1.url())).await?;
        assert_eq!(response1.status(), 200);

        let response2 = reqwest::get(format!("{}/health", server2.url())).await?;
        assert_eq!(response2.status(), 200);

        Ok(())
    }
}
