//! Node registry: fixed-slot liveness table.
//!
//! One entry per sender address, never deleted.  A silent node is only
//! marked offline so its label survives a reconnect.  All operations hold
//! the registry lock for their whole duration; an update and a sweep never
//! interleave.
//!
//! ```text
//!            update()                 check_timeout()
//!   (none) ───────────▶ ONLINE ─────────────────────────▶ OFFLINE
//!                         ▲     now − last_seen > limit      │
//!                         └──────────────────────────────────┘
//!                                 update()  (reconnect)
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::config::bounded;

/// Number of nodes the server can track.
pub const REGISTRY_CAPACITY: usize = 10;

/// Mesh address, ≤ 63 bytes.
pub type Address = heapless::String<63>;
/// Location label, ≤ 19 bytes.
pub type Label = heapless::String<19>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub address: Address,
    pub label: Label,
    /// Uptime (ms) of the last message from this node.
    pub last_seen_ms: u64,
    pub online: bool,
}

/// What an [`NodeRegistry::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New address, stored in a free slot.
    Registered,
    /// Known online node, timestamp and label refreshed.
    Refreshed,
    /// Known offline node, back online.
    Reconnected,
    /// Table full; nothing stored.
    Dropped,
}

/// A node the sweep just declared lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostNode {
    pub address: Address,
    pub label: Label,
    pub silent_for_ms: u64,
}

pub struct NodeRegistry {
    slots: Mutex<[Option<NodeEntry>; REGISTRY_CAPACITY]>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new([const { None }; REGISTRY_CAPACITY]),
        }
    }

    fn slots(&self) -> MutexGuard<'_, [Option<NodeEntry>; REGISTRY_CAPACITY]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert by address.  Never evicts: a full table drops the update.
    pub fn update(&self, address: &str, label: &str, now_ms: u64) -> UpdateOutcome {
        let address: Address = bounded(address);
        let label: Label = bounded(label);
        let mut slots = self.slots();

        if let Some(entry) = slots
            .iter_mut()
            .flatten()
            .find(|e| e.address == address)
        {
            entry.last_seen_ms = now_ms;
            entry.label = label;
            if entry.online {
                debug!("REGISTRY | heartbeat {} ({})", entry.address, entry.label);
                return UpdateOutcome::Refreshed;
            }
            entry.online = true;
            info!("REGISTRY | node reconnected: {} ({})", entry.address, entry.label);
            return UpdateOutcome::Reconnected;
        }

        match slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                info!("REGISTRY | new node registered: {} ({})", address, label);
                *slot = Some(NodeEntry {
                    address,
                    label,
                    last_seen_ms: now_ms,
                    online: true,
                });
                UpdateOutcome::Registered
            }
            None => {
                warn!("REGISTRY | full, cannot track new node {}", address);
                UpdateOutcome::Dropped
            }
        }
    }

    /// Mark every online entry silent for longer than `threshold_ms` as
    /// offline and report it.  Offline entries are never reported twice.
    pub fn check_timeout(
        &self,
        now_ms: u64,
        threshold_ms: u64,
    ) -> heapless::Vec<LostNode, REGISTRY_CAPACITY> {
        let mut lost = heapless::Vec::new();
        let mut slots = self.slots();

        for entry in slots.iter_mut().flatten().filter(|e| e.online) {
            let silent_for_ms = now_ms.saturating_sub(entry.last_seen_ms);
            if silent_for_ms > threshold_ms {
                entry.online = false;
                warn!(
                    "REGISTRY | node lost: {} ({}) silent {} ms",
                    entry.address, entry.label, silent_for_ms
                );
                // At most one alert per slot, so this never overflows.
                let _ = lost.push(LostNode {
                    address: entry.address.clone(),
                    label: entry.label.clone(),
                    silent_for_ms,
                });
            }
        }
        lost
    }

    /// Copy of every occupied slot, in slot order.
    pub fn snapshot(&self) -> heapless::Vec<NodeEntry, REGISTRY_CAPACITY> {
        self.slots().iter().flatten().cloned().collect()
    }

    pub fn online_count(&self) -> usize {
        self.slots().iter().flatten().filter(|e| e.online).count()
    }

    pub fn len(&self) -> usize {
        self.slots().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
