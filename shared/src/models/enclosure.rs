//! Enclosure (pen/pasture) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical holding unit with finite capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enclosure {
    pub id: Uuid,
    pub number: i32,
    pub name: Option<String>,
    pub capacity: i32,
    pub enclosure_type: EnclosureType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Classification of an enclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnclosureType {
    Pen,
    Pasture,
    Quarantine,
    Hospital,
}

impl EnclosureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnclosureType::Pen => "pen",
            EnclosureType::Pasture => "pasture",
            EnclosureType::Quarantine => "quarantine",
            EnclosureType::Hospital => "hospital",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pen" => Some(EnclosureType::Pen),
            "pasture" => Some(EnclosureType::Pasture),
            "quarantine" => Some(EnclosureType::Quarantine),
            "hospital" => Some(EnclosureType::Hospital),
            _ => None,
        }
    }
}

/// Space left in an enclosure given its current occupancy. Never negative
/// even if data drifted below zero somewhere upstream.
pub fn available_capacity(capacity: i32, occupancy: i32) -> i32 {
    (capacity - occupancy).max(0)
}
