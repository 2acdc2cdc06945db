//! Test server management.
//!
//! Spawns and manages `rendezvous-chat` instances for integration testing.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;

use tokio::time::sleep;

/// A test server instance, bound to a dedicated port and configured with
/// permissive rate limits so tests can drive the protocol quickly without
/// fighting the defaults.
pub struct TestServer {
    child: Child,
    port: u16,
}

impl TestServer {
    /// Spawn a new test server on `port` with the given environment
    /// variable overrides layered on top of permissive test defaults.
    pub async fn spawn_with_env(port: u16, env: &[(&str, &str)]) -> anyhow::Result<Self> {
        let cargo_manifest_dir = env!("CARGO_MANIFEST_DIR");
        let binary_path =
            PathBuf::from(cargo_manifest_dir).join("target/debug/rendezvous-chat");

        let mut command = Command::new(&binary_path);
        command
            .env("PORT", port.to_string())
            .env("LOG_LEVEL", "warn")
            .env("MAX_QUEUE_SIZE", "1000")
            .env("MAX_CONNECTIONS_PER_IP", "1000")
            .env("RATE_LIMIT_MESSAGES_PER_MINUTE", "1000")
            .env("RATE_LIMIT_SKIPS_PER_MINUTE", "1000")
            .env("RATE_LIMIT_REPORTS_PER_HOUR", "1000")
            .env("HEARTBEAT_INTERVAL_MS", "60000")
            .env("CONNECTION_TIMEOUT_MS", "120000");

        for (key, value) in env {
            command.env(key, value);
        }

        let child = command.spawn()?;
        let server = Self { child, port };
        server.wait_until_ready().await?;
        Ok(server)
    }

    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with_env(port, &[]).await
    }

    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server failed to start within 5 seconds")
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/", self.port)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub async fn connect(&self, user_id: &str, fingerprint: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = super::client::TestClient::connect(&self.ws_url()).await?;
        client.identify(user_id, fingerprint).await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
