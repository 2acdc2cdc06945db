//! Shared application state handed to every connection task and background
//! sweep. Each manager guards its own concurrency; `AppState` itself is
//! just a bag of `Arc`-shared handles cloned cheaply per task.

use std::sync::Arc;

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::pairing::PairingManager;
use crate::queue::QueueManager;
use crate::security::SecurityManager;

pub struct AppState {
    pub config: Config,
    pub queue: QueueManager,
    pub pairing: PairingManager,
    pub connections: ConnectionManager,
    pub security: SecurityManager,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let security = SecurityManager::new(&config);
        Arc::new(Self {
            queue: QueueManager::new(config.max_queue_size, config.queue_timeout),
            pairing: PairingManager::new(config.mode_switch_timeout),
            connections: ConnectionManager::new(),
            security,
            config,
        })
    }
}
