//! Round-robin backend selection

use std::sync::{Arc, Mutex};

/// Per-group round-robin cursor over the group's backend ports
///
/// Cloning shares the cursor. The cursor starts at the first backend every
/// time a selector is built, there is no persistence across generations.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    ports: Arc<[u16]>,
    cursor: Arc<Mutex<usize>>,
}

impl BackendSelector {
    /// Create a selector over a non-empty list of ports
    pub fn new(ports: Vec<u16>) -> Self {
        assert!(!ports.is_empty(), "backend selector needs at least one port");
        BackendSelector {
            ports: ports.into(),
            cursor: Arc::new(Mutex::new(0)),
        }
    }

    /// Pick the next backend port and advance the cursor
    pub fn next_port(&self) -> u16 {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let port = self.ports[*cursor];
        *cursor = (*cursor + 1) % self.ports.len();
        port
    }

    /// Backend ports in rotation order
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}
