//! Financial mirror models
//!
//! The three expense rows of a lot (principal, commission, freight) are a
//! pure function of the lot's monetary fields. This module derives the
//! expected component set and plans the create/update/delete actions needed
//! to bring the stored rows in line with it; the backend applies the plan.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lot::PurchasedLot;

/// Kind of derived expense row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    Purchase,
    Commission,
    Freight,
}

/// All kinds, in the order they are materialized
pub const EXPENSE_KINDS: [ExpenseKind; 3] = [
    ExpenseKind::Purchase,
    ExpenseKind::Commission,
    ExpenseKind::Freight,
];

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Purchase => "purchase",
            ExpenseKind::Commission => "commission",
            ExpenseKind::Freight => "freight",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(ExpenseKind::Purchase),
            "commission" => Some(ExpenseKind::Commission),
            "freight" => Some(ExpenseKind::Freight),
            _ => None,
        }
    }

    /// Prefix of the durable reference string joining a lot to its expense
    /// row. Must remain stable for the lot's lifetime.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            ExpenseKind::Purchase => "COMPRA",
            ExpenseKind::Commission => "COMISSAO",
            ExpenseKind::Freight => "FRETE",
        }
    }

    /// Reference string for a given lot code, e.g. "COMPRA-202608-001"
    pub fn reference_for(&self, lot_code: &str) -> String {
        format!("{}-{}", self.reference_prefix(), lot_code)
    }

    /// Resolve a kind back from a stored reference string
    pub fn from_reference(reference: &str) -> Option<Self> {
        let prefix = reference.split('-').next()?;
        match prefix {
            "COMPRA" => Some(ExpenseKind::Purchase),
            "COMISSAO" => Some(ExpenseKind::Commission),
            "FRETE" => Some(ExpenseKind::Freight),
            _ => None,
        }
    }

    pub fn description_for(&self, lot_code: &str) -> String {
        match self {
            ExpenseKind::Purchase => format!("Compra de gado - Lote {}", lot_code),
            ExpenseKind::Commission => format!("Comissao de compra - Lote {}", lot_code),
            ExpenseKind::Freight => format!("Frete de gado - Lote {}", lot_code),
        }
    }
}

/// One expected expense row, derived from the lot's current fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerComponent {
    pub kind: ExpenseKind,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub counterparty_id: Option<Uuid>,
}

/// A stored expense row as seen by the reconciliation planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingEntry {
    pub id: Uuid,
    pub kind: ExpenseKind,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub counterparty_id: Option<Uuid>,
}

/// Action required to align one stored row with its expected component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAction {
    Create(LedgerComponent),
    Update { id: Uuid, component: LedgerComponent },
    Delete { id: Uuid, kind: ExpenseKind },
}

/// Derive the expected component set from the lot's current monetary
/// fields. Zero-valued components are suppressed; each due date falls back
/// to the purchase date.
pub fn ledger_components(lot: &PurchasedLot) -> Vec<LedgerComponent> {
    let mut components = Vec::with_capacity(3);

    if lot.purchase_value > Decimal::ZERO {
        components.push(LedgerComponent {
            kind: ExpenseKind::Purchase,
            amount: lot.purchase_value,
            due_date: lot.payment_due_date.unwrap_or(lot.purchase_date),
            counterparty_id: Some(lot.vendor_id),
        });
    }
    if lot.commission > Decimal::ZERO {
        components.push(LedgerComponent {
            kind: ExpenseKind::Commission,
            amount: lot.commission,
            due_date: lot.commission_due_date.unwrap_or(lot.purchase_date),
            counterparty_id: lot.broker_id,
        });
    }
    if lot.freight_cost > Decimal::ZERO {
        components.push(LedgerComponent {
            kind: ExpenseKind::Freight,
            amount: lot.freight_cost,
            due_date: lot.freight_due_date.unwrap_or(lot.purchase_date),
            counterparty_id: lot.transport_id,
        });
    }

    components
}

/// Plan the actions that align the stored rows with the expected
/// components. Reconciling twice with unchanged input yields an empty plan.
pub fn plan_reconciliation(
    components: &[LedgerComponent],
    existing: &[ExistingEntry],
) -> Vec<LedgerAction> {
    let mut actions = Vec::new();

    for kind in EXPENSE_KINDS {
        let expected = components.iter().find(|c| c.kind == kind);
        let stored = existing.iter().find(|e| e.kind == kind);

        match (expected, stored) {
            (Some(component), Some(entry)) => {
                let unchanged = entry.amount == component.amount
                    && entry.due_date == component.due_date
                    && entry.counterparty_id == component.counterparty_id;
                if !unchanged {
                    actions.push(LedgerAction::Update {
                        id: entry.id,
                        component: component.clone(),
                    });
                }
            }
            (Some(component), None) => actions.push(LedgerAction::Create(component.clone())),
            (None, Some(entry)) => actions.push(LedgerAction::Delete {
                id: entry.id,
                kind,
            }),
            (None, None) => {}
        }
    }

    actions
}

/// Outcome of a financial mirror pass, returned alongside the owning lot.
///
/// Mirror failures never roll back the lot mutation; they are collected
/// here so callers can detect a partially synchronized ledger and retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSyncStatus {
    pub success: bool,
    pub expenses_created: u32,
    pub errors: Vec<String>,
}

impl FinancialSyncStatus {
    pub fn ok(expenses_created: u32) -> Self {
        Self {
            success: true,
            expenses_created,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, error: String) {
        self.success = false;
        self.errors.push(error);
    }
}

impl Default for FinancialSyncStatus {
    fn default() -> Self {
        Self::ok(0)
    }
}
