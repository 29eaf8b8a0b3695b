//! Allocation ledger tests
//!
//! Tests for the placement invariants:
//! - An allocation plan must distribute exactly the lot's head count
//! - Enclosure capacity is never exceeded
//! - Cached percentages follow the quantities

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{available_capacity, percent_of};
use shared::validation::{fits_capacity, validate_allocation_totals};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A plan summing to the lot quantity is accepted
    #[test]
    fn test_exact_distribution_accepted() {
        assert!(validate_allocation_totals(&[60, 38], 98).is_ok());
        assert!(validate_allocation_totals(&[98], 98).is_ok());
    }

    /// Plans over- or under-distributing are rejected
    #[test]
    fn test_mismatched_distribution_rejected() {
        assert!(validate_allocation_totals(&[60, 40], 98).is_err());
        assert!(validate_allocation_totals(&[60, 37], 98).is_err());
    }

    /// Empty plans and non-positive entries are rejected
    #[test]
    fn test_degenerate_plans_rejected() {
        assert!(validate_allocation_totals(&[], 98).is_err());
        assert!(validate_allocation_totals(&[98, 0], 98).is_err());
        assert!(validate_allocation_totals(&[100, -2], 98).is_err());
    }

    /// 120-head enclosure holding 80 accepts at most 40 more
    #[test]
    fn test_capacity_boundary() {
        assert!(fits_capacity(40, 120, 80));
        assert!(!fits_capacity(41, 120, 80));
        assert_eq!(available_capacity(120, 80), 40);
    }

    /// A full enclosure accepts nothing
    #[test]
    fn test_full_enclosure_rejects() {
        assert!(!fits_capacity(1, 120, 120));
        assert_eq!(available_capacity(120, 120), 0);
    }

    /// Over-occupancy never reports negative availability
    #[test]
    fn test_available_capacity_floors_at_zero() {
        assert_eq!(available_capacity(100, 130), 0);
    }

    /// Capacity math never overflows i32 arithmetic
    #[test]
    fn test_capacity_check_near_i32_max() {
        assert!(!fits_capacity(i32::MAX, i32::MAX, 1));
        assert!(fits_capacity(1, i32::MAX, i32::MAX - 1));
    }

    /// 60 of 98 head is 61.22% of the lot
    #[test]
    fn test_percent_of_lot() {
        assert_eq!(percent_of(60, 98), dec("61.22"));
        assert_eq!(percent_of(38, 98), dec("38.78"));
    }

    /// Percent of a zero or negative total collapses to zero
    #[test]
    fn test_percent_of_zero_total() {
        assert_eq!(percent_of(10, 0), Decimal::ZERO);
        assert_eq!(percent_of(10, -5), Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for head counts per enclosure
    fn head_strategy() -> impl Strategy<Value = i32> {
        1i32..=500
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A plan validates exactly when it sums to the expected total
        #[test]
        fn prop_plan_validates_iff_sum_matches(
            quantities in prop::collection::vec(head_strategy(), 1..8),
            expected in 1i32..=4000
        ) {
            let sum: i64 = quantities.iter().map(|q| i64::from(*q)).sum();
            let valid = validate_allocation_totals(&quantities, expected).is_ok();
            prop_assert_eq!(valid, sum == i64::from(expected));
        }

        /// Accepting a request never pushes occupancy past capacity
        #[test]
        fn prop_capacity_never_exceeded(
            requested in head_strategy(),
            capacity in 1i32..=2000,
            occupancy in 0i32..=2000
        ) {
            if fits_capacity(requested, capacity, occupancy) {
                prop_assert!(i64::from(occupancy) + i64::from(requested) <= i64::from(capacity));
            }
        }

        /// Availability plus occupancy covers capacity when not overfull
        #[test]
        fn prop_availability_complements_occupancy(
            capacity in 1i32..=2000,
            occupancy in 0i32..=2000
        ) {
            let available = available_capacity(capacity, occupancy);
            prop_assert!(available >= 0);
            if occupancy <= capacity {
                prop_assert_eq!(available + occupancy, capacity);
            }
        }

        /// Per-placement percentages of a full distribution sum close to 100
        #[test]
        fn prop_lot_percentages_sum_to_whole(
            quantities in prop::collection::vec(head_strategy(), 1..8)
        ) {
            let total: i32 = quantities.iter().sum();
            let percent_sum: Decimal = quantities
                .iter()
                .map(|q| percent_of(*q, total))
                .sum();

            // Each share is rounded to two decimals, so allow rounding drift
            let drift = (percent_sum - dec("100")).abs();
            prop_assert!(drift <= dec("0.08"), "percent sum {} drifts too far", percent_sum);
        }
    }
}
