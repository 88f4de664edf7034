//! Timing model: attribute values, the per-element runtime state machine
//! and the scheduling semantics of composite groups

mod duration;
mod groups;
mod runtime;

pub use duration::{DurationItem, DurationKind};
pub use runtime::{Fill, RepeatCount, Runtime, TimingState};
