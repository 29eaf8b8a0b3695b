//! Lot placement (allocation) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quantity of one lot held in one enclosure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotPlacement {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub enclosure_id: Uuid,
    pub quantity: i32,
    pub allocation_date: NaiveDate,
    pub removal_date: Option<DateTime<Utc>>,
    pub status: PlacementStatus,
    /// Share of the lot held here, cached at write time
    pub percent_of_lot: Decimal,
    /// Share of the enclosure capacity consumed, cached at write time
    pub percent_of_enclosure: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a placement still counts toward occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Active,
    Removed,
}

impl PlacementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementStatus::Active => "active",
            PlacementStatus::Removed => "removed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PlacementStatus::Active),
            "removed" => Some(PlacementStatus::Removed),
            _ => None,
        }
    }
}

/// Percentage of `part` over `total`, rounded to two decimals; zero when the
/// total is not positive.
pub fn percent_of(part: i32, total: i32) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) / Decimal::from(total) * Decimal::from(100)).round_dp(2)
}
