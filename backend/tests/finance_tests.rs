//! Financial mirror tests
//!
//! Tests for the expense derivation and reconciliation planner:
//! - Zero-valued components are suppressed
//! - Reference strings are stable and reversible
//! - Reconciling twice with unchanged input plans nothing

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    ledger_components, plan_reconciliation, ExistingEntry, ExpenseKind, FinancialSyncStatus,
    LedgerAction, PurchaseStatus, PurchasedLot, EXPENSE_KINDS,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// A lot with the monetary fields under test; everything else is inert
fn lot_with_costs(purchase_value: Decimal, freight: Decimal, commission: Decimal) -> PurchasedLot {
    let now = Utc::now();
    PurchasedLot {
        id: Uuid::new_v4(),
        code: "202608-001".to_string(),
        vendor_id: Uuid::new_v4(),
        broker_id: Some(Uuid::new_v4()),
        transport_id: Some(Uuid::new_v4()),
        payer_account_id: Uuid::new_v4(),
        purchase_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
        animal_type: "Nelore".to_string(),
        age_range: None,
        initial_quantity: 100,
        current_quantity: 100,
        death_count: 0,
        purchase_weight_kg: dec("40000"),
        received_weight_kg: None,
        carcass_yield_percent: dec("52"),
        price_per_arroba: dec("280"),
        purchase_value,
        freight_cost: freight,
        commission,
        total_cost: purchase_value + freight + commission,
        payment_type: None,
        payment_due_date: Some(NaiveDate::from_ymd_opt(2026, 9, 10).unwrap()),
        commission_due_date: None,
        freight_due_date: None,
        received_date: None,
        weight_break_kg: None,
        weight_break_percent: None,
        status: PurchaseStatus::Confirmed,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Pretend the given components are already stored, assigning row ids
fn as_existing(lot: &PurchasedLot) -> Vec<ExistingEntry> {
    ledger_components(lot)
        .into_iter()
        .map(|c| ExistingEntry {
            id: Uuid::new_v4(),
            kind: c.kind,
            amount: c.amount,
            due_date: c.due_date,
            counterparty_id: c.counterparty_id,
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// All three components materialize when all values are positive
    #[test]
    fn test_all_components_present() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let components = ledger_components(&lot);
        assert_eq!(components.len(), 3);
        let kinds: Vec<ExpenseKind> = components.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, EXPENSE_KINDS.to_vec());
    }

    /// Zero-valued components are suppressed
    #[test]
    fn test_zero_components_suppressed() {
        let lot = lot_with_costs(dec("560000"), Decimal::ZERO, Decimal::ZERO);
        let components = ledger_components(&lot);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].kind, ExpenseKind::Purchase);
    }

    /// Due dates fall back to the purchase date when unset
    #[test]
    fn test_due_date_fallback() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let components = ledger_components(&lot);

        let purchase = components.iter().find(|c| c.kind == ExpenseKind::Purchase).unwrap();
        assert_eq!(purchase.due_date, lot.payment_due_date.unwrap());

        let freight = components.iter().find(|c| c.kind == ExpenseKind::Freight).unwrap();
        assert_eq!(freight.due_date, lot.purchase_date);
    }

    /// Reference strings carry the kind prefix and lot code
    #[test]
    fn test_reference_strings() {
        assert_eq!(
            ExpenseKind::Purchase.reference_for("202608-001"),
            "COMPRA-202608-001"
        );
        assert_eq!(
            ExpenseKind::Commission.reference_for("202608-001"),
            "COMISSAO-202608-001"
        );
        assert_eq!(
            ExpenseKind::Freight.reference_for("202608-001"),
            "FRETE-202608-001"
        );
    }

    /// References resolve back to their kind
    #[test]
    fn test_reference_round_trip() {
        for kind in EXPENSE_KINDS {
            let reference = kind.reference_for("202608-042");
            assert_eq!(ExpenseKind::from_reference(&reference), Some(kind));
        }
        assert_eq!(ExpenseKind::from_reference("VENDA-202608-001"), None);
    }

    /// A fresh lot plans three creates
    #[test]
    fn test_first_sync_creates_everything() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let plan = plan_reconciliation(&ledger_components(&lot), &[]);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|a| matches!(a, LedgerAction::Create(_))));
    }

    /// An aligned ledger plans nothing
    #[test]
    fn test_reconciliation_is_idempotent() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let existing = as_existing(&lot);
        let plan = plan_reconciliation(&ledger_components(&lot), &existing);
        assert!(plan.is_empty());
    }

    /// Changing an amount plans exactly one update
    #[test]
    fn test_amount_change_plans_update() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let existing = as_existing(&lot);

        let mut changed = lot.clone();
        changed.freight_cost = dec("9100");
        let plan = plan_reconciliation(&ledger_components(&changed), &existing);

        assert_eq!(plan.len(), 1);
        match &plan[0] {
            LedgerAction::Update { component, .. } => {
                assert_eq!(component.kind, ExpenseKind::Freight);
                assert_eq!(component.amount, dec("9100"));
            }
            other => panic!("expected an update, got {:?}", other),
        }
    }

    /// A commission dropping to zero plans a delete of its stored row
    #[test]
    fn test_zeroed_commission_plans_delete() {
        let lot = lot_with_costs(dec("560000"), dec("8500"), dec("5600"));
        let existing = as_existing(&lot);

        let mut changed = lot.clone();
        changed.commission = Decimal::ZERO;
        let plan = plan_reconciliation(&ledger_components(&changed), &existing);

        assert_eq!(plan.len(), 1);
        assert!(matches!(
            plan[0],
            LedgerAction::Delete {
                kind: ExpenseKind::Commission,
                ..
            }
        ));
    }

    /// Zero to positive to zero: create then delete, each a single action
    #[test]
    fn test_commission_round_trip() {
        let without = lot_with_costs(dec("560000"), dec("8500"), Decimal::ZERO);
        let stored = as_existing(&without);
        assert_eq!(stored.len(), 2);

        let mut with = without.clone();
        with.commission = dec("5600");
        let plan = plan_reconciliation(&ledger_components(&with), &stored);
        assert_eq!(plan.len(), 1);
        assert!(matches!(plan[0], LedgerAction::Create(_)));

        let stored_with = as_existing(&with);
        let plan_back = plan_reconciliation(&ledger_components(&without), &stored_with);
        assert_eq!(plan_back.len(), 1);
        assert!(matches!(
            plan_back[0],
            LedgerAction::Delete {
                kind: ExpenseKind::Commission,
                ..
            }
        ));
    }

    /// Sync status collects errors without losing the created count
    #[test]
    fn test_sync_status_degrades_gracefully() {
        let mut status = FinancialSyncStatus::ok(2);
        assert!(status.success);

        status.record_error("freight expense failed".to_string());
        assert!(!status.success);
        assert_eq!(status.expenses_created, 2);
        assert_eq!(status.errors.len(), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for monetary values including zero
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            Just(Decimal::ZERO),
            (1_00i64..=1_000_000_00i64).prop_map(|n| Decimal::new(n, 2)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Exactly the positive-valued components materialize
        #[test]
        fn prop_components_match_positive_values(
            purchase in amount_strategy(),
            freight in amount_strategy(),
            commission in amount_strategy()
        ) {
            let lot = lot_with_costs(purchase, freight, commission);
            let components = ledger_components(&lot);

            let expected = [purchase, freight, commission]
                .iter()
                .filter(|v| **v > Decimal::ZERO)
                .count();
            prop_assert_eq!(components.len(), expected);
        }

        /// Reconciliation is idempotent for any cost combination
        #[test]
        fn prop_reconciliation_idempotent(
            purchase in amount_strategy(),
            freight in amount_strategy(),
            commission in amount_strategy()
        ) {
            let lot = lot_with_costs(purchase, freight, commission);
            let existing = as_existing(&lot);
            let plan = plan_reconciliation(&ledger_components(&lot), &existing);
            prop_assert!(plan.is_empty());
        }

        /// Against an empty ledger the plan is all creates, one per component
        #[test]
        fn prop_empty_ledger_plans_only_creates(
            purchase in amount_strategy(),
            freight in amount_strategy(),
            commission in amount_strategy()
        ) {
            let lot = lot_with_costs(purchase, freight, commission);
            let components = ledger_components(&lot);
            let plan = plan_reconciliation(&components, &[]);

            prop_assert_eq!(plan.len(), components.len());
            prop_assert!(plan.iter().all(|a| matches!(a, LedgerAction::Create(_))));
        }

        /// The planned component amounts always sum to the lot's total cost
        #[test]
        fn prop_component_amounts_sum_to_total(
            purchase in amount_strategy(),
            freight in amount_strategy(),
            commission in amount_strategy()
        ) {
            let lot = lot_with_costs(purchase, freight, commission);
            let sum: Decimal = ledger_components(&lot).iter().map(|c| c.amount).sum();
            prop_assert_eq!(sum, lot.total_cost);
        }
    }
}
