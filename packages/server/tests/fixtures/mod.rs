//! Test fixtures for integration tests.

use std::time::Duration;

use tsudoi_server::ServerConfig;

/// Shared secret used by integration tests
pub const TEST_TOKEN: &str = "test-token";

/// A presence server running on a background task for the duration of a test.
pub struct TestServer {
    port: u16,
}

impl TestServer {
    /// Spawn a server on the given port and wait until it answers health checks.
    pub async fn start(port: u16) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            auth_token: TEST_TOKEN.to_string(),
            log_level: "warn".to_string(),
        };
        tokio::spawn(async move {
            if let Err(e) = tsudoi_server::run_server(config).await {
                eprintln!("Test server error: {e}");
            }
        });

        let server = Self { port };
        server.wait_ready().await;
        server
    }

    /// Base URL for HTTP requests
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn wait_ready(&self) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if let Ok(response) = client
                .get(format!("{}/api/health", self.base_url()))
                .send()
                .await
                && response.status() == 200
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Test server did not become ready on port {}", self.port);
    }
}
