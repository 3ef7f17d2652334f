//! Settings Models
//!
//! Engine configuration data structures.

use serde::{Deserialize, Serialize};

/// Reconciliation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// How long a pre-barrier event may sit in the buffer before eviction (ms)
    #[serde(default = "default_pending_event_ttl_ms")]
    pub pending_event_ttl_ms: u64,
    /// Hard cap on buffered pre-barrier events per session (oldest evicted first)
    #[serde(default = "default_pending_event_cap")]
    pub pending_event_cap: usize,
}

fn default_pending_event_ttl_ms() -> u64 {
    2000
}

fn default_pending_event_cap() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pending_event_ttl_ms: default_pending_event_ttl_ms(),
            pending_event_cap: default_pending_event_cap(),
        }
    }
}

impl EngineConfig {
    /// The pending-event TTL as a duration
    pub fn pending_event_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pending_event_ttl_ms)
    }
}
