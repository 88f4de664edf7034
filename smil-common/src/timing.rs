//! Deci-second timing system for timed documents
//!
//! The scheduling engine stores every begin/duration/end offset as an integer
//! number of **deci-seconds** (tenths of a second). The host clock that drives
//! the engine counts **milliseconds** (a monotonic tick counter supplied by the
//! host scheduler, never wall-clock time), so deadlines in the timer queue are
//! kept in milliseconds while offsets stay in deci-seconds.
//!
//! # Conversion Flow
//!
//! ```text
//! Attribute value ("12.5s")
//!     ↓
//! parse_time() → offset in deci-seconds (125)
//!     ↓
//! ds_to_ms() → timer delay in clock milliseconds (12_500)
//!     ↓
//! Timer queue deadline = now_ms + delay_ms
//! ```
//!
//! # Examples
//!
//! ```rust
//! use smil_common::timing::*;
//!
//! assert_eq!(ds_to_ms(125), 12_500);
//! assert_eq!(ms_to_ds(12_549), 125);
//! ```

// ============================================================================
// Constants
// ============================================================================

/// Milliseconds per deci-second
pub const MS_PER_DECISECOND: i64 = 100;

/// Deci-seconds per second
pub const DECISECONDS_PER_SECOND: i64 = 10;

/// Deci-seconds per minute
pub const DECISECONDS_PER_MINUTE: i64 = 600;

/// Deci-seconds per hour
pub const DECISECONDS_PER_HOUR: i64 = 36_000;

// ============================================================================
// Core Conversion Functions
// ============================================================================

/// Convert deci-seconds to clock milliseconds
///
/// Negative values are preserved so relative offsets (`x.begin-1s`) can be
/// converted before clamping.
///
/// ```rust
/// use smil_common::timing::ds_to_ms;
///
/// assert_eq!(ds_to_ms(0), 0);
/// assert_eq!(ds_to_ms(5), 500);
/// assert_eq!(ds_to_ms(-10), -1_000);
/// ```
pub fn ds_to_ms(deciseconds: i64) -> i64 {
    deciseconds.saturating_mul(MS_PER_DECISECOND)
}

/// Convert clock milliseconds to deci-seconds using truncating division
///
/// ```rust
/// use smil_common::timing::ms_to_ds;
///
/// assert_eq!(ms_to_ds(1_000), 10);
/// assert_eq!(ms_to_ds(1_099), 10);
/// assert_eq!(ms_to_ds(99), 0);
/// ```
pub fn ms_to_ds(milliseconds: i64) -> i64 {
    milliseconds / MS_PER_DECISECOND
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
