//! Node handles

use std::fmt;

/// Handle to a node in a [`NodeStore`](super::NodeStore).
///
/// Handles carry a generation counter so a handle to a removed node never
/// silently aliases a node that later reuses the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Arena slot index of this node
    pub fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}
