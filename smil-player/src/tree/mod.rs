//! Document tree: node kinds, lifecycle states and arena storage

mod id;
mod node;
mod store;

pub use id::NodeId;
pub use node::{
    ExclData, MediaData, MediaKind, Node, NodeKind, NodeState, SeqData, SetData, SwitchData,
    TimedData,
};
pub(crate) use node::AppliedSet;
pub use store::{Children, NodeStore};
