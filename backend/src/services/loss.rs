//! Loss accounting service
//!
//! The only path that mutates a lot's mortality counters. Every recording,
//! correction, and reversal moves the death record, the affected placement,
//! and the lot's counts together in one transaction so the conservation
//! invariant never observes a half-applied loss.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::with_transaction_retry;
use crate::error::{AppError, AppResult};
use crate::services::allocation;
use shared::models::{
    average_unit_weight_kg, cost_per_kg, estimate_loss_value, DeathRecord, LossCause,
    PurchaseStatus,
};
use shared::validation::{validate_loss_quantity, validate_quantity};

/// Loss accounting service
#[derive(Clone)]
pub struct LossService {
    db: PgPool,
    /// Fallback average live weight per head for loss estimation
    default_average_weight_kg: Decimal,
}

/// Database row for a death record
#[derive(Debug, sqlx::FromRow)]
struct DeathRecordRow {
    id: Uuid,
    lot_id: Uuid,
    enclosure_id: Uuid,
    quantity: i32,
    occurred_on: NaiveDate,
    cause: String,
    veterinary_notes: Option<String>,
    estimated_loss: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeathRecordRow> for DeathRecord {
    type Error = AppError;

    fn try_from(row: DeathRecordRow) -> Result<Self, Self::Error> {
        let cause = LossCause::from_str(&row.cause)
            .ok_or_else(|| AppError::Internal(format!("Unknown loss cause: {}", row.cause)))?;
        Ok(DeathRecord {
            id: row.id,
            lot_id: row.lot_id,
            enclosure_id: row.enclosure_id,
            quantity: row.quantity,
            occurred_on: row.occurred_on,
            cause,
            veterinary_notes: row.veterinary_notes,
            estimated_loss: row.estimated_loss,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const DEATH_RECORD_COLUMNS: &str = "id, lot_id, enclosure_id, quantity, occurred_on, cause, \
     veterinary_notes, estimated_loss, created_at, updated_at";

/// Input for recording a loss event
#[derive(Debug, Deserialize)]
pub struct RecordLossInput {
    pub lot_id: Uuid,
    pub enclosure_id: Uuid,
    pub quantity: i32,
    pub occurred_on: NaiveDate,
    #[serde(default)]
    pub cause: LossCause,
    pub veterinary_notes: Option<String>,
    /// Explicit financial loss; estimated from the lot's weighing when absent
    pub estimated_loss: Option<Decimal>,
}

/// Input for correcting a recorded loss
#[derive(Debug, Deserialize)]
pub struct UpdateLossInput {
    pub quantity: Option<i32>,
    pub occurred_on: Option<NaiveDate>,
    pub cause: Option<LossCause>,
    pub veterinary_notes: Option<String>,
    pub estimated_loss: Option<Decimal>,
}

/// Filters for listing loss records
#[derive(Debug, Default, Deserialize)]
pub struct LossFilter {
    pub lot_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl LossService {
    /// Create a new LossService instance
    pub fn new(db: PgPool, default_average_weight_kg: Decimal) -> Self {
        Self {
            db,
            default_average_weight_kg,
        }
    }

    /// Record a loss event against a lot's placement in one enclosure
    pub async fn record_loss(&self, input: RecordLossInput) -> AppResult<DeathRecord> {
        with_transaction_retry("record_loss", || self.record_loss_tx(&input)).await
    }

    async fn record_loss_tx(&self, input: &RecordLossInput) -> AppResult<DeathRecord> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        })?;
        if let Some(value) = input.estimated_loss {
            if value < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "estimated_loss".to_string(),
                    message: "Estimated loss cannot be negative".to_string(),
                    message_pt: "O prejuizo estimado nao pode ser negativo".to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;
        let lot = lock_lot(&mut tx, input.lot_id).await?;

        let status = lot.status()?;
        if status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is {} and cannot register losses",
                lot.code, status
            )));
        }

        let placement = allocation::active_placement_for_update(
            &mut tx,
            input.lot_id,
            input.enclosure_id,
        )
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Active placement of lot {} in enclosure {}",
                lot.code, input.enclosure_id
            ))
        })?;

        validate_loss_quantity(input.quantity, placement.quantity).map_err(|msg| {
            AppError::Validation {
                field: "quantity".to_string(),
                message: format!(
                    "{} ({} head placed, {} reported dead)",
                    msg, placement.quantity, input.quantity
                ),
                message_pt: "A perda excede os animais alojados no curral".to_string(),
            }
        })?;

        let estimated_loss = match input.estimated_loss {
            Some(value) => value,
            None => self.estimate_for(&lot, input.quantity),
        };

        let row = sqlx::query_as::<_, DeathRecordRow>(&format!(
            r#"
            INSERT INTO death_records (lot_id, enclosure_id, quantity, occurred_on, cause,
                                       veterinary_notes, estimated_loss)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            DEATH_RECORD_COLUMNS
        ))
        .bind(input.lot_id)
        .bind(input.enclosure_id)
        .bind(input.quantity)
        .bind(input.occurred_on)
        .bind(input.cause.as_str())
        .bind(&input.veterinary_notes)
        .bind(estimated_loss)
        .fetch_one(&mut *tx)
        .await?;

        allocation::adjust_quantity(&mut tx, placement.id, -input.quantity).await?;
        apply_lot_delta(&mut tx, input.lot_id, input.quantity).await?;
        allocation::refresh_cached_percentages(&mut tx, input.lot_id).await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Correct a recorded loss, propagating any quantity change to the
    /// placement and the lot's counters
    pub async fn update_loss(
        &self,
        record_id: Uuid,
        input: UpdateLossInput,
    ) -> AppResult<DeathRecord> {
        with_transaction_retry("update_loss", || self.update_loss_tx(record_id, &input)).await
    }

    async fn update_loss_tx(
        &self,
        record_id: Uuid,
        input: &UpdateLossInput,
    ) -> AppResult<DeathRecord> {
        let mut tx = self.db.begin().await?;
        let existing = self.get_record_for_update(&mut tx, record_id).await?;
        let lot = lock_lot(&mut tx, existing.lot_id).await?;

        let new_quantity = input.quantity.unwrap_or(existing.quantity);
        validate_quantity(new_quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        })?;

        let delta = new_quantity - existing.quantity;
        if delta != 0 {
            let placement = placement_for_record(&mut tx, &existing).await?;
            if placement.quantity - delta < 0 {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: format!(
                        "Correction would leave placement with {} head",
                        placement.quantity - delta
                    ),
                    message_pt: "A correcao deixaria o curral com saldo negativo".to_string(),
                });
            }
            allocation::adjust_quantity(&mut tx, placement.id, -delta).await?;
            apply_lot_delta(&mut tx, existing.lot_id, delta).await?;
            allocation::refresh_cached_percentages(&mut tx, existing.lot_id).await?;
        }

        // Re-estimate only when the quantity moved and no explicit figure
        // was supplied
        let estimated_loss = match input.estimated_loss {
            Some(value) => value,
            None if delta != 0 => self.estimate_for(&lot, new_quantity),
            None => existing.estimated_loss,
        };

        let row = sqlx::query_as::<_, DeathRecordRow>(&format!(
            r#"
            UPDATE death_records
            SET quantity = $2, occurred_on = $3, cause = $4, veterinary_notes = $5,
                estimated_loss = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DEATH_RECORD_COLUMNS
        ))
        .bind(record_id)
        .bind(new_quantity)
        .bind(input.occurred_on.unwrap_or(existing.occurred_on))
        .bind(input.cause.unwrap_or(existing.cause).as_str())
        .bind(
            input
                .veterinary_notes
                .clone()
                .or(existing.veterinary_notes.clone()),
        )
        .bind(estimated_loss)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Reverse a recorded loss: restore the placement and lot counts to what
    /// they were before the event, then delete the record
    pub async fn reverse_loss(&self, record_id: Uuid) -> AppResult<DeathRecord> {
        with_transaction_retry("reverse_loss", || self.reverse_loss_tx(record_id)).await
    }

    async fn reverse_loss_tx(&self, record_id: Uuid) -> AppResult<DeathRecord> {
        let mut tx = self.db.begin().await?;
        let existing = self.get_record_for_update(&mut tx, record_id).await?;
        lock_lot(&mut tx, existing.lot_id).await?;

        // The animals return to the placement the loss was recorded against,
        // even if it has since been retired
        let placement = placement_for_record(&mut tx, &existing).await?;
        allocation::adjust_quantity(&mut tx, placement.id, existing.quantity).await?;
        apply_lot_delta(&mut tx, existing.lot_id, -existing.quantity).await?;
        allocation::refresh_cached_percentages(&mut tx, existing.lot_id).await?;

        sqlx::query("DELETE FROM death_records WHERE id = $1")
            .bind(record_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(existing)
    }

    /// Loss records, newest occurrence first, optionally filtered by lot and
    /// date range
    pub async fn list_losses(&self, filter: LossFilter) -> AppResult<Vec<DeathRecord>> {
        let rows = sqlx::query_as::<_, DeathRecordRow>(&format!(
            r#"
            SELECT {}
            FROM death_records
            WHERE ($1::uuid IS NULL OR lot_id = $1)
              AND ($2::date IS NULL OR occurred_on >= $2)
              AND ($3::date IS NULL OR occurred_on <= $3)
            ORDER BY occurred_on DESC, created_at DESC
            "#,
            DEATH_RECORD_COLUMNS
        ))
        .bind(filter.lot_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(DeathRecord::try_from).collect()
    }

    /// Get a single loss record
    pub async fn get_loss(&self, record_id: Uuid) -> AppResult<DeathRecord> {
        let row = sqlx::query_as::<_, DeathRecordRow>(&format!(
            "SELECT {} FROM death_records WHERE id = $1",
            DEATH_RECORD_COLUMNS
        ))
        .bind(record_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Death record".to_string()))?;

        row.try_into()
    }

    async fn get_record_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record_id: Uuid,
    ) -> AppResult<DeathRecord> {
        let row = sqlx::query_as::<_, DeathRecordRow>(&format!(
            "SELECT {} FROM death_records WHERE id = $1 FOR UPDATE",
            DEATH_RECORD_COLUMNS
        ))
        .bind(record_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Death record".to_string()))?;

        row.try_into()
    }

    fn estimate_for(&self, lot: &LotSnapshot, quantity: i32) -> Decimal {
        let average = average_unit_weight_kg(
            lot.received_weight_kg,
            lot.purchase_weight_kg,
            lot.initial_quantity,
        )
        .unwrap_or(self.default_average_weight_kg);
        estimate_loss_value(
            quantity,
            average,
            cost_per_kg(lot.purchase_value, lot.purchase_weight_kg),
        )
    }
}

/// Narrow lot projection carrying only what loss accounting reads
#[derive(Debug, sqlx::FromRow)]
struct LotSnapshot {
    code: String,
    initial_quantity: i32,
    purchase_weight_kg: Decimal,
    received_weight_kg: Option<Decimal>,
    purchase_value: Decimal,
    status: String,
}

impl LotSnapshot {
    fn status(&self) -> AppResult<PurchaseStatus> {
        PurchaseStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown lot status: {}", self.status)))
    }
}

async fn lock_lot(tx: &mut Transaction<'_, Postgres>, lot_id: Uuid) -> AppResult<LotSnapshot> {
    sqlx::query_as::<_, LotSnapshot>(
        r#"
        SELECT code, initial_quantity, purchase_weight_kg, received_weight_kg,
               purchase_value, status
        FROM lots WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(lot_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Lot".to_string()))
}

async fn placement_for_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &DeathRecord,
) -> AppResult<shared::models::LotPlacement> {
    // Prefer the ACTIVE placement; fall back to the most recent one so a
    // reversal after reallocation still lands on a concrete row
    if let Some(placement) =
        allocation::active_placement_for_update(tx, record.lot_id, record.enclosure_id).await?
    {
        return Ok(placement);
    }

    let placement_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM lot_placements
        WHERE lot_id = $1 AND enclosure_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(record.lot_id)
    .bind(record.enclosure_id)
    .fetch_optional(&mut **tx)
    .await?;

    let placement_id = placement_id.ok_or_else(|| {
        AppError::NotFound(format!(
            "Placement of lot {} in enclosure {}",
            record.lot_id, record.enclosure_id
        ))
    })?;

    allocation::placement_for_update(tx, placement_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Placement".to_string()))
}

async fn apply_lot_delta(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    deaths: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE lots
        SET death_count = death_count + $2, current_quantity = current_quantity - $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(lot_id)
    .bind(deaths)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
