//! Unit tests for deci-second timing conversions

use super::*;

// ============================================================================
// Test Group 1: Constants
// ============================================================================

#[test]
fn test_unit_constants_consistent() {
    assert_eq!(MS_PER_DECISECOND * DECISECONDS_PER_SECOND, 1_000);
    assert_eq!(DECISECONDS_PER_MINUTE, 60 * DECISECONDS_PER_SECOND);
    assert_eq!(DECISECONDS_PER_HOUR, 60 * DECISECONDS_PER_MINUTE);
}

// ============================================================================
// Test Group 2: Deci-second ↔ Millisecond Conversions
// ============================================================================

#[test]
fn test_ds_to_ms_roundtrip() {
    for ds in [0_i64, 1, 5, 10, 125, 36_000, -7] {
        assert_eq!(ms_to_ds(ds_to_ms(ds)), ds, "roundtrip failed for {}", ds);
    }
}

#[test]
fn test_ms_to_ds_truncates() {
    assert_eq!(ms_to_ds(0), 0);
    assert_eq!(ms_to_ds(99), 0);
    assert_eq!(ms_to_ds(100), 1);
    assert_eq!(ms_to_ds(2_550), 25);
}

#[test]
fn test_ds_to_ms_saturates() {
    assert_eq!(ds_to_ms(i64::MAX), i64::MAX);
    assert_eq!(ds_to_ms(i64::MIN), i64::MIN);
}
