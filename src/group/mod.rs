//! Load-balancing groups
//!
//! Discovery of groups from the engine document and the per-group
//! round-robin backend selector.

mod extract;
mod selector;

pub use extract::{extract_groups, load_document, load_groups};
pub use selector::BackendSelector;

use serde::Serialize;
use std::fmt;

/// A named cluster of one listen port and at least two backend ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Group id taken from the declaration tags
    pub id: String,
    /// Port the group's relay listener binds
    pub listen_port: u16,
    /// Backend ports in ascending declared index order
    pub backend_ports: Vec<u16>,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (:{} -> {:?})",
            self.id, self.listen_port, self.backend_ports
        )
    }
}
