//! Listener connections between nodes
//!
//! A node keeps one list of connections per sender; each entry names the
//! listening node and the event kind it waits for. Delivery goes through the
//! document so a listener can mutate the tree while being notified.

use crate::tree::NodeId;

/// Event kinds a node can signal to its listeners
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Sent just before the sender's runtime starts
    AboutToStart,
    /// Sender's runtime started
    Started,
    /// Sender finished
    Stopped,
    /// Pointer activation (click)
    Activated,
    /// Pointer entered the sender
    InBounds,
    /// Pointer left the sender
    OutBounds,
}

/// Identifier of one listener registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

/// A listener registration stored on the sending node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) kind: EventKind,
    pub(crate) listener: NodeId,
}
