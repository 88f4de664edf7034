//! # SMIL Player Library (smil-player)
//!
//! Timed-document engine for SMIL presentations.
//!
//! **Purpose:** Build a node tree from a SMIL byte stream, schedule its
//! `seq`/`par`/`excl`/`switch` groups, media and `set` elements against a
//! host-supplied clock, and report every visible effect to the host.
//!
//! **Architecture:** A single-threaded [`Document`] owns an arena of nodes and
//! one timer queue. The host feeds it XML through [`TreeBuilder`] (or the
//! quick-xml front-end in [`xml`]), calls [`Document::start`], then advances
//! the clock with [`Document::advance_to`] whenever the wake-up it asked for
//! through [`Host::arm_wake`] comes due.

/// Report a broken engine invariant: loud in debug builds, a logged no-op in
/// release builds.
macro_rules! invariant_violation {
    ($($arg:tt)+) => {{
        tracing::warn!($($arg)+);
        debug_assert!(false, $($arg)+);
    }};
}

pub mod builder;
pub mod config;
pub mod document;
pub mod elements;
pub mod error;
pub mod host;
pub mod serialize;
pub mod signal;
pub mod timer;
pub mod timing;
pub mod tree;
pub mod xml;

pub use builder::TreeBuilder;
pub use config::PlayerConfig;
pub use document::Document;
pub use error::{Error, Result};
pub use host::{BitRates, Host, NullHost, RecordingHost};
pub use signal::EventKind;
pub use timer::{Postpone, TimerId, TimerQueue, TimerTag, Wake};
pub use timing::{DurationItem, DurationKind, Fill, RepeatCount, Runtime, TimingState};
pub use tree::{MediaKind, Node, NodeId, NodeKind, NodeState};
