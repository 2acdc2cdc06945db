//! Connection Manager — tracks live sockets and fans outbound frames out
//! to them.
//!
//! Each connection owns an `mpsc::UnboundedSender<ServerMessage>`; the
//! actual socket write loop lives in [`crate::gateway`], which owns the
//! matching receiver. Keeping the send side here (rather than writing to
//! the socket directly) lets any manager push a message to a user without
//! needing a reference to that user's WebSocket task.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::wire::ServerMessage;

pub type UserId = String;

#[derive(Clone)]
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Separate from `sender` so a forced disconnect (e.g. a report-cascade
    /// ban) can close the socket even if the outbound message queue is
    /// backed up or the peer stopped reading.
    pub close: mpsc::UnboundedSender<()>,
    /// Tells the connection's send task to emit a transport-level ping, for
    /// the heartbeat sweep.
    pub ping: mpsc::UnboundedSender<()>,
    pub ip: std::net::IpAddr,
    pub connected_at: Instant,
    pub last_seen: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

pub struct ConnectionManager {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection for `user_id`. If the user was already
    /// connected (e.g. a reconnect that reuses the same identity before the
    /// old socket's task noticed the drop), the old handle is replaced and
    /// returned so the caller can close it out.
    pub fn add_connection(
        &self,
        user_id: UserId,
        sender: mpsc::UnboundedSender<ServerMessage>,
        close: mpsc::UnboundedSender<()>,
        ping: mpsc::UnboundedSender<()>,
        ip: std::net::IpAddr,
    ) -> Option<ConnectionHandle> {
        let now = Instant::now();
        let handle = ConnectionHandle {
            sender,
            close,
            ping,
            ip,
            connected_at: now,
            last_seen: std::sync::Arc::new(parking_lot::Mutex::new(now)),
        };
        let previous = self.connections.insert(user_id.clone(), handle);
        if previous.is_some() {
            debug!(user_id = %user_id, "replaced existing connection on re-identify");
        } else {
            crate::metrics::CONNECTED_USERS.inc();
        }
        previous
    }

    pub fn remove_connection(&self, user_id: &str) -> Option<ConnectionHandle> {
        let removed = self.connections.remove(user_id).map(|(_, v)| v);
        if removed.is_some() {
            crate::metrics::CONNECTED_USERS.dec();
        }
        removed
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn ip_of(&self, user_id: &str) -> Option<std::net::IpAddr> {
        self.connections.get(user_id).map(|h| h.ip)
    }

    /// Signal the connection's task to close the transport. The task's own
    /// read loop notices the close and runs the normal disconnect sequence,
    /// so this does not itself mutate queue/pairing state.
    pub fn force_disconnect(&self, user_id: &str) -> bool {
        match self.connections.get(user_id) {
            Some(handle) => handle.close.send(()).is_ok(),
            None => false,
        }
    }

    pub fn send_ping(&self, user_id: &str) -> bool {
        match self.connections.get(user_id) {
            Some(handle) => handle.ping.send(()).is_ok(),
            None => false,
        }
    }

    pub fn all_user_ids(&self) -> Vec<UserId> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }

    /// Send a message to `user_id`. Returns `false` if the user has no live
    /// connection or their send channel has already closed.
    pub fn send_to_user(&self, user_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(user_id) {
            Some(handle) => handle.sender.send(message).is_ok(),
            None => false,
        }
    }

    pub fn broadcast_to_all(&self, message: ServerMessage) {
        for entry in self.connections.iter() {
            let _ = entry.value().sender.send(message.clone());
        }
    }

    pub fn touch(&self, user_id: &str) {
        if let Some(handle) = self.connections.get(user_id) {
            *handle.last_seen.lock() = Instant::now();
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connections_from_ip(&self, ip: std::net::IpAddr) -> usize {
        self.connections.iter().filter(|e| e.value().ip == ip).count()
    }

    /// Users whose `last_seen` predates `timeout`, for heartbeat eviction.
    pub fn stale_users(&self, timeout: Duration) -> Vec<UserId> {
        self.connections
            .iter()
            .filter(|e| crate::clock::elapsed_since(*e.value().last_seen.lock()) > timeout)
            .map(|e| e.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn handle(mgr: &ConnectionManager, user_id: &str) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (close_tx, _close_rx) = mpsc::unbounded_channel();
        let (ping_tx, _ping_rx) = mpsc::unbounded_channel();
        mgr.add_connection(user_id.to_string(), tx, close_tx, ping_tx, loopback());
        rx
    }

    #[test]
    fn add_and_send_round_trip() {
        let mgr = ConnectionManager::new();
        let mut rx = handle(&mgr, "a");
        assert!(mgr.send_to_user("a", ServerMessage::Waiting));
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Waiting));
    }

    #[test]
    fn send_to_unknown_user_fails() {
        let mgr = ConnectionManager::new();
        assert!(!mgr.send_to_user("ghost", ServerMessage::Waiting));
    }

    #[test]
    fn reidentify_replaces_prior_handle() {
        let mgr = ConnectionManager::new();
        let _rx1 = handle(&mgr, "a");
        let mut rx2 = handle(&mgr, "a");
        assert!(mgr.send_to_user("a", ServerMessage::Waiting));
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn connections_from_ip_counts_correctly() {
        let mgr = ConnectionManager::new();
        let _a = handle(&mgr, "a");
        let _b = handle(&mgr, "b");
        assert_eq!(mgr.connections_from_ip(loopback()), 2);
    }

    #[test]
    fn stale_users_detected_after_timeout() {
        let mgr = ConnectionManager::new();
        let _rx = handle(&mgr, "a");
        assert!(mgr.stale_users(Duration::from_millis(0)).contains(&"a".to_string()));
        assert!(mgr.stale_users(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn force_disconnect_signals_close_channel() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (close_tx, mut close_rx) = mpsc::unbounded_channel();
        let (ping_tx, _ping_rx) = mpsc::unbounded_channel();
        mgr.add_connection("a".into(), tx, close_tx, ping_tx, loopback());
        assert!(mgr.force_disconnect("a"));
        assert!(close_rx.try_recv().is_ok());
    }

    #[test]
    fn send_ping_signals_ping_channel() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (close_tx, _close_rx) = mpsc::unbounded_channel();
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();
        mgr.add_connection("a".into(), tx, close_tx, ping_tx, loopback());
        assert!(mgr.send_ping("a"));
        assert!(ping_rx.try_recv().is_ok());
    }
}
