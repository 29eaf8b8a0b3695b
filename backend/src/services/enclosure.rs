//! Enclosure registry service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{available_capacity, Enclosure, EnclosureType};

/// Enclosure registry service
#[derive(Clone)]
pub struct EnclosureService {
    db: PgPool,
}

/// Database row for an enclosure, joined with its current occupancy
#[derive(Debug, sqlx::FromRow)]
struct EnclosureRow {
    id: Uuid,
    number: i32,
    name: Option<String>,
    capacity: i32,
    enclosure_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    current_occupancy: i64,
}

impl TryFrom<EnclosureRow> for EnclosureWithOccupancy {
    type Error = AppError;

    fn try_from(row: EnclosureRow) -> Result<Self, Self::Error> {
        let enclosure_type = EnclosureType::from_str(&row.enclosure_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown enclosure type: {}", row.enclosure_type))
        })?;
        let current_occupancy = row.current_occupancy as i32;
        let available = available_capacity(row.capacity, current_occupancy);
        Ok(EnclosureWithOccupancy {
            enclosure: Enclosure {
                id: row.id,
                number: row.number,
                name: row.name,
                capacity: row.capacity,
                enclosure_type,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            current_occupancy,
            available_capacity: available,
        })
    }
}

const ENCLOSURE_SELECT: &str = r#"
    SELECT e.id, e.number, e.name, e.capacity, e.enclosure_type, e.is_active,
           e.created_at, e.updated_at,
           COALESCE(SUM(lp.quantity) FILTER (WHERE lp.status = 'active'), 0) AS current_occupancy
    FROM enclosures e
    LEFT JOIN lot_placements lp ON lp.enclosure_id = e.id
"#;

/// An enclosure together with its live occupancy figures
#[derive(Debug, Serialize)]
pub struct EnclosureWithOccupancy {
    #[serde(flatten)]
    pub enclosure: Enclosure,
    pub current_occupancy: i32,
    pub available_capacity: i32,
}

/// Input for registering an enclosure
#[derive(Debug, Deserialize)]
pub struct CreateEnclosureInput {
    pub number: i32,
    pub name: Option<String>,
    pub capacity: i32,
    pub enclosure_type: String,
}

/// Input for updating an enclosure (partial patch)
#[derive(Debug, Deserialize)]
pub struct UpdateEnclosureInput {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub enclosure_type: Option<String>,
    pub is_active: Option<bool>,
}

impl EnclosureService {
    /// Create a new EnclosureService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new enclosure
    pub async fn create_enclosure(
        &self,
        input: CreateEnclosureInput,
    ) -> AppResult<EnclosureWithOccupancy> {
        if input.number <= 0 {
            return Err(AppError::Validation {
                field: "number".to_string(),
                message: "Enclosure number must be positive".to_string(),
                message_pt: "O numero do curral deve ser positivo".to_string(),
            });
        }
        if input.capacity <= 0 {
            return Err(AppError::Validation {
                field: "capacity".to_string(),
                message: "Capacity must be positive".to_string(),
                message_pt: "A capacidade deve ser positiva".to_string(),
            });
        }
        let enclosure_type = EnclosureType::from_str(&input.enclosure_type).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Unknown enclosure type '{}'",
                input.enclosure_type
            ))
        })?;

        let number_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM enclosures WHERE number = $1)")
                .bind(input.number)
                .fetch_one(&self.db)
                .await?;
        if number_taken {
            return Err(AppError::Validation {
                field: "number".to_string(),
                message: format!("Enclosure number {} is already registered", input.number),
                message_pt: format!("O curral numero {} ja esta cadastrado", input.number),
            });
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO enclosures (number, name, capacity, enclosure_type, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id
            "#,
        )
        .bind(input.number)
        .bind(&input.name)
        .bind(input.capacity)
        .bind(enclosure_type.as_str())
        .fetch_one(&self.db)
        .await?;

        self.get_enclosure(id).await
    }

    /// Update an enclosure. Capacity can never drop below the current
    /// occupancy and an occupied enclosure cannot be deactivated.
    pub async fn update_enclosure(
        &self,
        enclosure_id: Uuid,
        input: UpdateEnclosureInput,
    ) -> AppResult<EnclosureWithOccupancy> {
        let existing = self.get_enclosure(enclosure_id).await?;

        let capacity = match input.capacity {
            Some(capacity) => {
                if capacity <= 0 {
                    return Err(AppError::Validation {
                        field: "capacity".to_string(),
                        message: "Capacity must be positive".to_string(),
                        message_pt: "A capacidade deve ser positiva".to_string(),
                    });
                }
                if capacity < existing.current_occupancy {
                    return Err(AppError::CapacityExceeded(format!(
                        "enclosure {} holds {} head, capacity cannot be reduced to {}",
                        existing.enclosure.number, existing.current_occupancy, capacity
                    )));
                }
                capacity
            }
            None => existing.enclosure.capacity,
        };

        if input.is_active == Some(false) && existing.current_occupancy > 0 {
            return Err(AppError::ValidationError(format!(
                "Enclosure {} still holds {} head and cannot be deactivated",
                existing.enclosure.number, existing.current_occupancy
            )));
        }

        let enclosure_type = match input.enclosure_type {
            Some(raw) => EnclosureType::from_str(&raw).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown enclosure type '{}'", raw))
            })?,
            None => existing.enclosure.enclosure_type,
        };

        sqlx::query(
            r#"
            UPDATE enclosures
            SET name = $2, capacity = $3, enclosure_type = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(enclosure_id)
        .bind(input.name.or(existing.enclosure.name))
        .bind(capacity)
        .bind(enclosure_type.as_str())
        .bind(input.is_active.unwrap_or(existing.enclosure.is_active))
        .execute(&self.db)
        .await?;

        self.get_enclosure(enclosure_id).await
    }

    /// All enclosures with their occupancy, ordered by number
    pub async fn get_enclosures(&self) -> AppResult<Vec<EnclosureWithOccupancy>> {
        let rows = sqlx::query_as::<_, EnclosureRow>(&format!(
            "{} GROUP BY e.id ORDER BY e.number",
            ENCLOSURE_SELECT
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(EnclosureWithOccupancy::try_from)
            .collect()
    }

    /// One enclosure with its occupancy
    pub async fn get_enclosure(&self, enclosure_id: Uuid) -> AppResult<EnclosureWithOccupancy> {
        let row = sqlx::query_as::<_, EnclosureRow>(&format!(
            "{} WHERE e.id = $1 GROUP BY e.id",
            ENCLOSURE_SELECT
        ))
        .bind(enclosure_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Enclosure".to_string()))?;

        row.try_into()
    }
}
