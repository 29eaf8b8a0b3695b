//! Death/loss record models and loss estimation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discrete death/loss event recorded against a lot and enclosure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathRecord {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub enclosure_id: Uuid,
    pub quantity: i32,
    pub occurred_on: NaiveDate,
    pub cause: LossCause,
    pub veterinary_notes: Option<String>,
    pub estimated_loss: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cause classification for a loss event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    Disease,
    Accident,
    Weather,
    Transport,
    #[default]
    Unknown,
}

impl LossCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossCause::Disease => "disease",
            LossCause::Accident => "accident",
            LossCause::Weather => "weather",
            LossCause::Transport => "transport",
            LossCause::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "disease" => Some(LossCause::Disease),
            "accident" => Some(LossCause::Accident),
            "weather" => Some(LossCause::Weather),
            "transport" => Some(LossCause::Transport),
            "unknown" => Some(LossCause::Unknown),
            _ => None,
        }
    }
}

/// Average live weight per head, preferring the received weighing over the
/// negotiated one. `None` when the lot has no usable weight or quantity.
pub fn average_unit_weight_kg(
    received_weight_kg: Option<Decimal>,
    purchase_weight_kg: Decimal,
    quantity: i32,
) -> Option<Decimal> {
    if quantity <= 0 {
        return None;
    }
    let weight = received_weight_kg.unwrap_or(purchase_weight_kg);
    if weight <= Decimal::ZERO {
        return None;
    }
    Some(weight / Decimal::from(quantity))
}

/// Acquisition cost per live kilogram
pub fn cost_per_kg(purchase_value: Decimal, purchase_weight_kg: Decimal) -> Decimal {
    if purchase_weight_kg <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    purchase_value / purchase_weight_kg
}

/// Estimated financial loss: `quantity × average unit weight × cost per kg`
pub fn estimate_loss_value(
    quantity: i32,
    average_unit_weight_kg: Decimal,
    cost_per_kg: Decimal,
) -> Decimal {
    (Decimal::from(quantity) * average_unit_weight_kg * cost_per_kg).round_dp(2)
}
