//! Purchased lot model and lifecycle state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight of one arroba in kilograms (Brazilian cattle trade unit)
pub const KG_PER_ARROBA: i64 = 15;

/// A purchased lot of cattle tracked from acquisition to disposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedLot {
    pub id: Uuid,
    /// Sequential per-month lot code (e.g., "202608-003")
    pub code: String,
    pub vendor_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub transport_id: Option<Uuid>,
    pub payer_account_id: Uuid,
    pub purchase_date: NaiveDate,
    pub animal_type: String,
    pub age_range: Option<String>,
    pub initial_quantity: i32,
    pub current_quantity: i32,
    pub death_count: i32,
    pub purchase_weight_kg: Decimal,
    pub received_weight_kg: Option<Decimal>,
    pub carcass_yield_percent: Decimal,
    pub price_per_arroba: Decimal,
    pub purchase_value: Decimal,
    pub freight_cost: Decimal,
    pub commission: Decimal,
    pub total_cost: Decimal,
    pub payment_type: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub commission_due_date: Option<NaiveDate>,
    pub freight_due_date: Option<NaiveDate>,
    pub received_date: Option<NaiveDate>,
    pub weight_break_kg: Option<Decimal>,
    pub weight_break_percent: Option<Decimal>,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a purchased lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Negotiating,
    Confirmed,
    InTransit,
    Received,
    Confined,
    Sold,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Negotiating => "negotiating",
            PurchaseStatus::Confirmed => "confirmed",
            PurchaseStatus::InTransit => "in_transit",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Confined => "confined",
            PurchaseStatus::Sold => "sold",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "negotiating" => Some(PurchaseStatus::Negotiating),
            "confirmed" => Some(PurchaseStatus::Confirmed),
            "in_transit" => Some(PurchaseStatus::InTransit),
            "received" => Some(PurchaseStatus::Received),
            "confined" => Some(PurchaseStatus::Confined),
            "sold" => Some(PurchaseStatus::Sold),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStatus::Sold | PurchaseStatus::Cancelled)
    }

    /// Whether a transition to `target` is on the lifecycle graph.
    ///
    /// Cancellation is reachable from every non-terminal state; the rest of
    /// the graph moves forward only.
    pub fn can_transition_to(&self, target: PurchaseStatus) -> bool {
        use PurchaseStatus::*;
        if target == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Negotiating, Confirmed)
                | (Confirmed, InTransit)
                | (Confirmed, Received)
                | (InTransit, Received)
                | (Received, Confined)
                | (Confined, Sold)
        )
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a lot code: YYYYMM-NNN, sequence scoped per month
pub fn generate_lot_code(year: i32, month: u32, sequence: i32) -> String {
    format!("{:04}{:02}-{:03}", year, month, sequence)
}

/// Purchase value from carcass weight and price per arroba:
/// `weight_kg × yield% / 15 × price`
pub fn compute_purchase_value(
    purchase_weight_kg: Decimal,
    carcass_yield_percent: Decimal,
    price_per_arroba: Decimal,
) -> Decimal {
    let carcass_weight_kg = purchase_weight_kg * carcass_yield_percent / Decimal::from(100);
    let arrobas = carcass_weight_kg / Decimal::from(KG_PER_ARROBA);
    (arrobas * price_per_arroba).round_dp(2)
}

/// Total cost is always the sum of the three monetary components
pub fn compute_total_cost(
    purchase_value: Decimal,
    freight_cost: Decimal,
    commission: Decimal,
) -> Decimal {
    purchase_value + freight_cost + commission
}

/// Weight break between purchased and received weight, with its percentage
/// of the purchased weight
pub fn compute_weight_break(
    purchase_weight_kg: Decimal,
    received_weight_kg: Decimal,
) -> (Decimal, Decimal) {
    let break_kg = purchase_weight_kg - received_weight_kg;
    let break_percent = if purchase_weight_kg > Decimal::ZERO {
        (break_kg / purchase_weight_kg * Decimal::from(100)).round_dp(2)
    } else {
        Decimal::ZERO
    };
    (break_kg, break_percent)
}
