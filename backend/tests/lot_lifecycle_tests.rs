//! Lot lifecycle tests
//!
//! Tests for the purchase state machine and lot-level money math:
//! - Lifecycle graph correctness (forward-only, cancellation from any
//!   non-terminal state)
//! - Purchase value derivation from carcass weight and price per arroba
//! - Total cost and weight break invariants

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    compute_purchase_value, compute_total_cost, compute_weight_break, generate_lot_code,
    PurchaseStatus,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const ALL_STATUSES: [PurchaseStatus; 7] = [
    PurchaseStatus::Negotiating,
    PurchaseStatus::Confirmed,
    PurchaseStatus::InTransit,
    PurchaseStatus::Received,
    PurchaseStatus::Confined,
    PurchaseStatus::Sold,
    PurchaseStatus::Cancelled,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The forward path walks the whole lifecycle
    #[test]
    fn test_happy_path_transitions() {
        use PurchaseStatus::*;
        let path = [Negotiating, Confirmed, InTransit, Received, Confined, Sold];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    /// Reception is reachable directly from confirmed, skipping transit
    #[test]
    fn test_confirmed_straight_to_received() {
        assert!(PurchaseStatus::Confirmed.can_transition_to(PurchaseStatus::Received));
    }

    /// Backward edges are rejected
    #[test]
    fn test_no_backward_transitions() {
        use PurchaseStatus::*;
        assert!(!Confirmed.can_transition_to(Negotiating));
        assert!(!Received.can_transition_to(InTransit));
        assert!(!Confined.can_transition_to(Received));
        assert!(!Sold.can_transition_to(Confined));
    }

    /// A negotiating lot cannot jump straight into confinement
    #[test]
    fn test_negotiating_cannot_be_confined() {
        assert!(!PurchaseStatus::Negotiating.can_transition_to(PurchaseStatus::Confined));
    }

    /// Cancellation is reachable from every non-terminal state only
    #[test]
    fn test_cancellation_reachability() {
        for status in ALL_STATUSES {
            assert_eq!(
                status.can_transition_to(PurchaseStatus::Cancelled),
                !status.is_terminal()
            );
        }
    }

    /// Terminal states admit nothing
    #[test]
    fn test_terminal_states_are_dead_ends() {
        for terminal in [PurchaseStatus::Sold, PurchaseStatus::Cancelled] {
            for target in ALL_STATUSES {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    /// Status strings round-trip through their snake_case encoding
    #[test]
    fn test_status_string_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(PurchaseStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(PurchaseStatus::from_str("slaughtered"), None);
    }

    /// 60,000 kg at 50% yield and 280/arroba: (60000 * 0.5 / 15) * 280
    #[test]
    fn test_purchase_value_reference_scenario() {
        let value = compute_purchase_value(dec("60000"), dec("50"), dec("280"));
        assert_eq!(value, dec("560000.00"));
    }

    /// Purchase value is rounded to cents
    #[test]
    fn test_purchase_value_rounding() {
        let value = compute_purchase_value(dec("12345"), dec("53.5"), dec("287.90"));
        assert_eq!(value, value.round_dp(2));
    }

    /// Total cost is the plain sum of the three components
    #[test]
    fn test_total_cost() {
        let total = compute_total_cost(dec("560000.00"), dec("8500.00"), dec("5600.00"));
        assert_eq!(total, dec("574100.00"));
    }

    /// Weight break: 60,000 purchased, 58,200 received is a 3% break
    #[test]
    fn test_weight_break() {
        let (break_kg, break_percent) = compute_weight_break(dec("60000"), dec("58200"));
        assert_eq!(break_kg, dec("1800"));
        assert_eq!(break_percent, dec("3.00"));
    }

    /// A gain on the scale yields a negative break
    #[test]
    fn test_weight_gain_is_negative_break() {
        let (break_kg, break_percent) = compute_weight_break(dec("60000"), dec("60600"));
        assert_eq!(break_kg, dec("-600"));
        assert_eq!(break_percent, dec("-1.00"));
    }

    /// Lot codes are zero-padded and scoped by month
    #[test]
    fn test_lot_code_format() {
        assert_eq!(generate_lot_code(2026, 8, 3), "202608-003");
        assert_eq!(generate_lot_code(2026, 12, 117), "202612-117");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = PurchaseStatus> {
        prop::sample::select(ALL_STATUSES.to_vec())
    }

    /// Strategy for live weights in kg (whole lots, two decimals)
    fn weight_strategy() -> impl Strategy<Value = Decimal> {
        (100_00i64..=100_000_00i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for carcass yields in (0, 100]
    fn yield_strategy() -> impl Strategy<Value = Decimal> {
        (1_00i64..=100_00i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for prices per arroba
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (100_00i64..=500_00i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Terminal states never transition anywhere
        #[test]
        fn prop_terminal_states_admit_nothing(
            from in status_strategy(),
            to in status_strategy()
        ) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }

        /// Self-transitions are never on the graph
        #[test]
        fn prop_no_self_transitions(status in status_strategy()) {
            prop_assert!(!status.can_transition_to(status));
        }

        /// Purchase value scales linearly with the price per arroba
        #[test]
        fn prop_purchase_value_monotone_in_price(
            weight in weight_strategy(),
            carcass_yield in yield_strategy(),
            price in price_strategy()
        ) {
            let base = compute_purchase_value(weight, carcass_yield, price);
            let higher = compute_purchase_value(weight, carcass_yield, price + dec("10"));
            prop_assert!(higher >= base);
        }

        /// Purchase value is non-negative and rounded to cents
        #[test]
        fn prop_purchase_value_well_formed(
            weight in weight_strategy(),
            carcass_yield in yield_strategy(),
            price in price_strategy()
        ) {
            let value = compute_purchase_value(weight, carcass_yield, price);
            prop_assert!(value >= Decimal::ZERO);
            prop_assert_eq!(value, value.round_dp(2));
        }

        /// Total cost always equals the sum of its components
        #[test]
        fn prop_total_cost_is_component_sum(
            purchase in price_strategy(),
            freight in price_strategy(),
            commission in price_strategy()
        ) {
            let total = compute_total_cost(purchase, freight, commission);
            prop_assert_eq!(total, purchase + freight + commission);
        }

        /// Weight break kg plus received weight recovers the purchased weight
        #[test]
        fn prop_weight_break_conserves_weight(
            purchased in weight_strategy(),
            received in weight_strategy()
        ) {
            let (break_kg, _) = compute_weight_break(purchased, received);
            prop_assert_eq!(purchased - break_kg, received);
        }
    }
}
