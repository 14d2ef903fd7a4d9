//! Network pool
//!
//! Holds multiple live networks behind stable integer handles, for drivers
//! that manage several models at once. Handles are slot indices: creation
//! appends, removal leaves a hole, and indices are never reused, so a stale
//! handle fails fast instead of silently addressing a newer network.

use crate::error::NetError;
use crate::network::Network;

/// Append-only collection of networks addressed by handle.
#[derive(Debug, Default)]
pub struct NetworkPool {
    slots: Vec<Option<Network>>,
}

impl NetworkPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a network and return its handle.
    pub fn insert(&mut self, network: Network) -> usize {
        self.slots.push(Some(network));
        self.slots.len() - 1
    }

    /// Number of live networks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, handle: usize) -> Result<&Network, NetError> {
        self.slots
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(NetError::UnknownNetwork(handle))
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut Network, NetError> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(NetError::UnknownNetwork(handle))
    }

    /// Drop a network, leaving its slot empty. Returns the network so a
    /// caller can still inspect it.
    pub fn remove(&mut self, handle: usize) -> Result<Network, NetError> {
        self.slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(NetError::UnknownNetwork(handle))
    }
}
