//! # SMIL Common Library
//!
//! Shared code for the SMIL player workspace including:
//! - Error types
//! - Deci-second time conversions (the engine's internal time unit)
//! - Human time parsing and formatting (`"12.5s"`, `"1:02:03"`, `"2min"`)
//! - Engine notification events and the EventBus
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod timing;

pub use error::{Error, Result};
pub use events::{EngineEvent, EventBus};
