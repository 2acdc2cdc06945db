//! Test WebSocket client.
//!
//! Wraps a raw `tokio-tungstenite` connection with JSON send/recv helpers
//! so tests read and write wire messages as `serde_json::Value`s rather
//! than hand-building frame text.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (socket, _response) = connect_async(url).await?;
        Ok(Self { socket })
    }

    pub async fn send(&mut self, value: Value) -> anyhow::Result<()> {
        self.socket.send(WsMessage::Text(value.to_string())).await?;
        Ok(())
    }

    pub async fn identify(&mut self, user_id: &str, fingerprint: &str) -> anyhow::Result<()> {
        self.send(json!({"type": "identify", "userId": user_id, "fingerprint": fingerprint}))
            .await
    }

    pub async fn join_text(&mut self, user_id: &str) -> anyhow::Result<()> {
        self.send(json!({"type": "join-text", "userId": user_id})).await
    }

    pub async fn join_video(&mut self, user_id: &str) -> anyhow::Result<()> {
        self.send(json!({"type": "join-video", "userId": user_id})).await
    }

    pub async fn text_message(&mut self, user_id: &str, target_id: &str, message: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "text-message",
            "userId": user_id,
            "targetId": target_id,
            "message": message,
        }))
        .await
    }

    pub async fn mode_switch_to_video(&mut self, user_id: &str, partner_id: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "mode-switch-to-video",
            "userId": user_id,
            "partnerId": partner_id,
        }))
        .await
    }

    pub async fn report_user(&mut self, user_id: &str, reported_id: &str, reason: &str) -> anyhow::Result<()> {
        self.send(json!({
            "type": "report-user",
            "userId": user_id,
            "reportedId": reported_id,
            "reason": reason,
        }))
        .await
    }

    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        loop {
            let next = timeout(dur, self.socket.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match next {
                WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                WsMessage::Close(_) => anyhow::bail!("connection closed by server"),
                _ => continue,
            }
        }
    }

    /// Receive messages until `predicate` matches one, returning every
    /// message seen along the way (including the match).
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Value>>
    where
        F: FnMut(&Value) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    pub fn msg_type(value: &Value) -> &str {
        value.get("type").and_then(Value::as_str).unwrap_or("")
    }
}
