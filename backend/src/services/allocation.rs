//! Allocation ledger service
//!
//! Sole mutator of placement rows. Enforces the two conservation/capacity
//! invariants for every mutation path: the ACTIVE placements of a lot sum
//! to its current quantity, and the ACTIVE placements of an enclosure never
//! exceed its capacity. Occupancy is always recomputed from the placement
//! rows inside the same transaction that consumes the space, never read
//! from a stored counter.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{percent_of, LotPlacement, PlacementStatus};
use shared::validation::{fits_capacity, validate_allocation_totals};

/// Requested distribution of animals into one enclosure
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRequest {
    pub enclosure_id: Uuid,
    pub quantity: i32,
}

/// Database row for a placement
#[derive(Debug, sqlx::FromRow)]
struct PlacementRow {
    id: Uuid,
    lot_id: Uuid,
    enclosure_id: Uuid,
    quantity: i32,
    allocation_date: NaiveDate,
    removal_date: Option<DateTime<Utc>>,
    status: String,
    percent_of_lot: Decimal,
    percent_of_enclosure: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PlacementRow> for LotPlacement {
    type Error = AppError;

    fn try_from(row: PlacementRow) -> Result<Self, Self::Error> {
        let status = PlacementStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown placement status: {}", row.status))
        })?;
        Ok(LotPlacement {
            id: row.id,
            lot_id: row.lot_id,
            enclosure_id: row.enclosure_id,
            quantity: row.quantity,
            allocation_date: row.allocation_date,
            removal_date: row.removal_date,
            status,
            percent_of_lot: row.percent_of_lot,
            percent_of_enclosure: row.percent_of_enclosure,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PLACEMENT_COLUMNS: &str = "id, lot_id, enclosure_id, quantity, allocation_date, \
     removal_date, status, percent_of_lot, percent_of_enclosure, created_at, updated_at";

/// Current occupancy of an enclosure from its ACTIVE placements
pub async fn occupancy(tx: &mut Transaction<'_, Postgres>, enclosure_id: Uuid) -> AppResult<i32> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM lot_placements WHERE enclosure_id = $1 AND status = 'active'",
    )
    .bind(enclosure_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(total as i32)
}

/// Soft-retire every ACTIVE placement of a lot, stamping the removal time.
/// Returns the number of retired rows.
pub async fn retire_active(tx: &mut Transaction<'_, Postgres>, lot_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE lot_placements
        SET status = 'removed', removal_date = NOW(), updated_at = NOW()
        WHERE lot_id = $1 AND status = 'active'
        "#,
    )
    .bind(lot_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Create placements for a lot per the requested distribution.
///
/// Validates that the plan distributes exactly `expected_total` head and
/// that every target enclosure has the space, reading occupancy from a
/// committed view inside this transaction. Any failure aborts the whole
/// transaction, leaving no placement created.
pub async fn allocate(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    expected_total: i32,
    allocation_date: NaiveDate,
    requests: &[AllocationRequest],
) -> AppResult<Vec<LotPlacement>> {
    let quantities: Vec<i32> = requests.iter().map(|r| r.quantity).collect();
    validate_allocation_totals(&quantities, expected_total).map_err(|msg| {
        AppError::AllocationMismatch(format!(
            "{} (allocated {}, expected {})",
            msg,
            quantities.iter().map(|q| i64::from(*q)).sum::<i64>(),
            expected_total
        ))
    })?;

    for (idx, request) in requests.iter().enumerate() {
        if requests[..idx]
            .iter()
            .any(|r| r.enclosure_id == request.enclosure_id)
        {
            return Err(AppError::ValidationError(format!(
                "Enclosure {} appears more than once in the allocation",
                request.enclosure_id
            )));
        }
    }

    let mut placements = Vec::with_capacity(requests.len());

    for request in requests {
        // Lock the enclosure row so concurrent allocations serialize on it
        let enclosure = sqlx::query_as::<_, (i32, i32, bool)>(
            "SELECT number, capacity, is_active FROM enclosures WHERE id = $1 FOR UPDATE",
        )
        .bind(request.enclosure_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Enclosure {}", request.enclosure_id)))?;

        let (number, capacity, is_active) = enclosure;

        if !is_active {
            return Err(AppError::ValidationError(format!(
                "Enclosure {} is inactive",
                number
            )));
        }

        let current = occupancy(tx, request.enclosure_id).await?;
        if !fits_capacity(request.quantity, capacity, current) {
            return Err(AppError::CapacityExceeded(format!(
                "enclosure {} has only {} of {} requested spaces available",
                number,
                shared::models::available_capacity(capacity, current),
                request.quantity
            )));
        }

        let row = sqlx::query_as::<_, PlacementRow>(&format!(
            r#"
            INSERT INTO lot_placements (lot_id, enclosure_id, quantity, allocation_date,
                                        status, percent_of_lot, percent_of_enclosure)
            VALUES ($1, $2, $3, $4, 'active', $5, $6)
            RETURNING {}
            "#,
            PLACEMENT_COLUMNS
        ))
        .bind(lot_id)
        .bind(request.enclosure_id)
        .bind(request.quantity)
        .bind(allocation_date)
        .bind(percent_of(request.quantity, expected_total))
        .bind(percent_of(request.quantity, capacity))
        .fetch_one(&mut **tx)
        .await?;

        placements.push(row.try_into()?);
    }

    Ok(placements)
}

/// Apply a signed delta to a placement's quantity, returning the new value.
/// Callers are responsible for keeping the lot's counts in step within the
/// same transaction.
pub async fn adjust_quantity(
    tx: &mut Transaction<'_, Postgres>,
    placement_id: Uuid,
    delta: i32,
) -> AppResult<i32> {
    let new_quantity: i32 = sqlx::query_scalar(
        r#"
        UPDATE lot_placements
        SET quantity = quantity + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING quantity
        "#,
    )
    .bind(placement_id)
    .bind(delta)
    .fetch_one(&mut **tx)
    .await?;

    Ok(new_quantity)
}

/// Recompute the cached lot/enclosure percentages for a lot's ACTIVE
/// placements after its quantities changed.
pub async fn refresh_cached_percentages(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE lot_placements lp
        SET percent_of_lot = CASE WHEN l.current_quantity > 0
                THEN ROUND(lp.quantity::numeric / l.current_quantity * 100, 2)
                ELSE 0 END,
            percent_of_enclosure = CASE WHEN e.capacity > 0
                THEN ROUND(lp.quantity::numeric / e.capacity * 100, 2)
                ELSE 0 END,
            updated_at = NOW()
        FROM lots l, enclosures e
        WHERE lp.lot_id = l.id AND lp.enclosure_id = e.id
          AND lp.lot_id = $1 AND lp.status = 'active'
        "#,
    )
    .bind(lot_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Fetch the ACTIVE placement of a (lot, enclosure) pair with a row lock
pub async fn active_placement_for_update(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    enclosure_id: Uuid,
) -> AppResult<Option<LotPlacement>> {
    let row = sqlx::query_as::<_, PlacementRow>(&format!(
        r#"
        SELECT {}
        FROM lot_placements
        WHERE lot_id = $1 AND enclosure_id = $2 AND status = 'active'
        FOR UPDATE
        "#,
        PLACEMENT_COLUMNS
    ))
    .bind(lot_id)
    .bind(enclosure_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(LotPlacement::try_from).transpose()
}

/// Fetch a placement by id with a row lock, whatever its status
pub async fn placement_for_update(
    tx: &mut Transaction<'_, Postgres>,
    placement_id: Uuid,
) -> AppResult<Option<LotPlacement>> {
    let row = sqlx::query_as::<_, PlacementRow>(&format!(
        "SELECT {} FROM lot_placements WHERE id = $1 FOR UPDATE",
        PLACEMENT_COLUMNS
    ))
    .bind(placement_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(LotPlacement::try_from).transpose()
}

/// Pool-backed reads over the allocation ledger
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All placements of a lot, active first, newest first within status
    pub async fn get_lot_placements(&self, lot_id: Uuid) -> AppResult<Vec<LotPlacement>> {
        let lot_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lots WHERE id = $1)")
                .bind(lot_id)
                .fetch_one(&self.db)
                .await?;

        if !lot_exists {
            return Err(AppError::NotFound("Lot".to_string()));
        }

        let rows = sqlx::query_as::<_, PlacementRow>(&format!(
            r#"
            SELECT {}
            FROM lot_placements
            WHERE lot_id = $1
            ORDER BY status, created_at DESC
            "#,
            PLACEMENT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LotPlacement::try_from).collect()
    }
}
