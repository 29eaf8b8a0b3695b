//! Loss accounting tests
//!
//! Tests for mortality math:
//! - Quantity guards against the placement being drawn from
//! - Loss estimation from average unit weight and cost per kg
//! - Conservation of the lot's quantity identity through losses and
//!   reversals

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{average_unit_weight_kg, cost_per_kg, estimate_loss_value};
use shared::validation::validate_loss_quantity;

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

    /// A loss up to the placement's quantity is accepted
    #[test]
    fn test_loss_within_placement() {
        assert!(validate_loss_quantity(3, 60).is_ok());
        assert!(validate_loss_quantity(60, 60).is_ok());
    }

    /// A loss beyond the placement, or non-positive, is rejected
    #[test]
    fn test_invalid_loss_quantities() {
        assert!(validate_loss_quantity(61, 60).is_err());
        assert!(validate_loss_quantity(0, 60).is_err());
        assert!(validate_loss_quantity(-2, 60).is_err());
    }

    /// Received weight is preferred over the negotiated one
    #[test]
    fn test_average_weight_prefers_received() {
        let avg = average_unit_weight_kg(Some(dec("39200")), dec("40000"), 100);
        assert_eq!(avg, Some(dec("392")));
    }

    /// Without a received weighing, the purchase weight is used
    #[test]
    fn test_average_weight_falls_back_to_purchase() {
        let avg = average_unit_weight_kg(None, dec("40000"), 100);
        assert_eq!(avg, Some(dec("400")));
    }

    /// Degenerate lots yield no average
    #[test]
    fn test_average_weight_degenerate() {
        assert_eq!(average_unit_weight_kg(None, dec("40000"), 0), None);
        assert_eq!(average_unit_weight_kg(None, dec("0"), 100), None);
    }

    /// Cost per kg from the purchase principal
    #[test]
    fn test_cost_per_kg() {
        assert_eq!(cost_per_kg(dec("560000"), dec("60000")), dec("560000") / dec("60000"));
        assert_eq!(cost_per_kg(dec("560000"), Decimal::ZERO), Decimal::ZERO);
    }

    /// 3 head at 400 kg average and 9.33/kg loses 11,196.00
    #[test]
    fn test_loss_estimate() {
        let estimate = estimate_loss_value(3, dec("400"), dec("9.33"));
        assert_eq!(estimate, dec("11196.00"));
    }

    /// Reference scenario: 98 received across 60/38, 3 die in one pen.
    /// Placement drops to 57, current quantity to 95, death count to 5
    /// (2 already lost in transit).
    #[test]
    fn test_loss_bookkeeping_scenario() {
        let initial_quantity = 100;
        let transit_mortality = 2;
        let mut current_quantity = initial_quantity - transit_mortality;
        let mut death_count = transit_mortality;
        let mut placement_a = 60;
        let placement_b = 38;

        assert_eq!(placement_a + placement_b, current_quantity);

        let loss = 3;
        assert!(validate_loss_quantity(loss, placement_a).is_ok());
        placement_a -= loss;
        current_quantity -= loss;
        death_count += loss;

        assert_eq!(placement_a, 57);
        assert_eq!(current_quantity, 95);
        assert_eq!(death_count, 5);
        assert_eq!(current_quantity, initial_quantity - death_count);
        assert_eq!(placement_a + placement_b, current_quantity);
    }

    /// Reversal restores exactly the pre-loss counts
    #[test]
    fn test_reversal_is_exact_inverse() {
        let mut current_quantity = 95;
        let mut death_count = 5;
        let mut placement = 57;

        let recorded_loss = 3;
        placement += recorded_loss;
        current_quantity += recorded_loss;
        death_count -= recorded_loss;

        assert_eq!(placement, 60);
        assert_eq!(current_quantity, 98);
        assert_eq!(death_count, 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn head_strategy() -> impl Strategy<Value = i32> {
        1i32..=500
    }

    /// Strategy for per-head weights in kg
    fn unit_weight_strategy() -> impl Strategy<Value = Decimal> {
        (200_00i64..=700_00i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for acquisition cost per kg
    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (1_00i64..=30_00i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A loss validates exactly when positive and within the placement
        #[test]
        fn prop_loss_validation(loss in -100i32..=600, placement in head_strategy()) {
            let valid = validate_loss_quantity(loss, placement).is_ok();
            prop_assert_eq!(valid, loss > 0 && loss <= placement);
        }

        /// Recording then reversing a loss restores all three counters
        #[test]
        fn prop_loss_then_reversal_is_identity(
            placement in head_strategy(),
            current in head_strategy(),
            deaths in 0i32..=100,
            loss in head_strategy()
        ) {
            if validate_loss_quantity(loss, placement).is_ok() {
                let after = (placement - loss, current - loss, deaths + loss);
                let restored = (after.0 + loss, after.1 + loss, after.2 - loss);
                prop_assert_eq!(restored, (placement, current, deaths));
            }
        }

        /// Loss estimates are non-negative, rounded, and linear in quantity
        #[test]
        fn prop_loss_estimate_well_formed(
            quantity in 1i32..=50,
            unit_weight in unit_weight_strategy(),
            unit_cost in cost_strategy()
        ) {
            let estimate = estimate_loss_value(quantity, unit_weight, unit_cost);
            prop_assert!(estimate >= Decimal::ZERO);
            prop_assert_eq!(estimate, estimate.round_dp(2));

            let bigger = estimate_loss_value(quantity + 1, unit_weight, unit_cost);
            prop_assert!(bigger >= estimate);
        }

        /// The average unit weight times quantity recovers the lot weight
        #[test]
        fn prop_average_weight_consistency(
            weight in (10_000_00i64..=100_000_00i64).prop_map(|n| Decimal::new(n, 2)),
            quantity in head_strategy()
        ) {
            let avg = average_unit_weight_kg(None, weight, quantity);
            prop_assert!(avg.is_some());
            let avg = avg.unwrap();
            let reconstructed = avg * Decimal::from(quantity);
            let drift = (reconstructed - weight).abs();
            prop_assert!(drift < dec("0.01"));
        }
    }
}
