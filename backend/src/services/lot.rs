//! Purchased lot service: lifecycle state machine and lot operations
//!
//! Owns the lot's status field and the quantity/cost invariants. Reception
//! and confinement allocate animals through the allocation ledger inside
//! the same transaction that advances the status, so a capacity failure
//! leaves both the lot and the placements untouched.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::db::with_transaction_retry;
use crate::error::{AppError, AppResult};
use crate::services::allocation::{self, AllocationRequest};
use shared::models::{
    compute_purchase_value, compute_total_cost, compute_weight_break, generate_lot_code,
    PurchaseStatus, PurchasedLot,
};
use shared::types::DateRange;
use shared::validation::{
    validate_amount, validate_carcass_yield, validate_quantity, validate_weight,
};

/// Lot service for managing purchased lots through their lifecycle
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

/// Database row for a purchased lot
#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    code: String,
    vendor_id: Uuid,
    broker_id: Option<Uuid>,
    transport_id: Option<Uuid>,
    payer_account_id: Uuid,
    purchase_date: NaiveDate,
    animal_type: String,
    age_range: Option<String>,
    initial_quantity: i32,
    current_quantity: i32,
    death_count: i32,
    purchase_weight_kg: Decimal,
    received_weight_kg: Option<Decimal>,
    carcass_yield_percent: Decimal,
    price_per_arroba: Decimal,
    purchase_value: Decimal,
    freight_cost: Decimal,
    commission: Decimal,
    total_cost: Decimal,
    payment_type: Option<String>,
    payment_due_date: Option<NaiveDate>,
    commission_due_date: Option<NaiveDate>,
    freight_due_date: Option<NaiveDate>,
    received_date: Option<NaiveDate>,
    weight_break_kg: Option<Decimal>,
    weight_break_percent: Option<Decimal>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for PurchasedLot {
    type Error = AppError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        let status = PurchaseStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown lot status: {}", row.status)))?;
        Ok(PurchasedLot {
            id: row.id,
            code: row.code,
            vendor_id: row.vendor_id,
            broker_id: row.broker_id,
            transport_id: row.transport_id,
            payer_account_id: row.payer_account_id,
            purchase_date: row.purchase_date,
            animal_type: row.animal_type,
            age_range: row.age_range,
            initial_quantity: row.initial_quantity,
            current_quantity: row.current_quantity,
            death_count: row.death_count,
            purchase_weight_kg: row.purchase_weight_kg,
            received_weight_kg: row.received_weight_kg,
            carcass_yield_percent: row.carcass_yield_percent,
            price_per_arroba: row.price_per_arroba,
            purchase_value: row.purchase_value,
            freight_cost: row.freight_cost,
            commission: row.commission,
            total_cost: row.total_cost,
            payment_type: row.payment_type,
            payment_due_date: row.payment_due_date,
            commission_due_date: row.commission_due_date,
            freight_due_date: row.freight_due_date,
            received_date: row.received_date,
            weight_break_kg: row.weight_break_kg,
            weight_break_percent: row.weight_break_percent,
            status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LOT_COLUMNS: &str = "id, code, vendor_id, broker_id, transport_id, payer_account_id, \
     purchase_date, animal_type, age_range, initial_quantity, current_quantity, death_count, \
     purchase_weight_kg, received_weight_kg, carcass_yield_percent, price_per_arroba, \
     purchase_value, freight_cost, commission, total_cost, payment_type, payment_due_date, \
     commission_due_date, freight_due_date, received_date, weight_break_kg, \
     weight_break_percent, status, notes, created_at, updated_at";

/// Input for creating a lot
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLotInput {
    pub vendor_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub transport_id: Option<Uuid>,
    pub payer_account_id: Uuid,
    pub purchase_date: NaiveDate,
    #[validate(length(min = 1, max = 60))]
    pub animal_type: String,
    pub age_range: Option<String>,
    pub quantity: i32,
    pub purchase_weight_kg: Decimal,
    pub carcass_yield_percent: Decimal,
    pub price_per_arroba: Decimal,
    /// Explicit purchase value; computed from carcass weight and price when
    /// absent
    pub purchase_value: Option<Decimal>,
    pub freight_cost: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub payment_type: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub commission_due_date: Option<NaiveDate>,
    pub freight_due_date: Option<NaiveDate>,
    /// Either "negotiating" or "confirmed"; defaults to confirmed
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a lot (partial patch)
#[derive(Debug, Deserialize)]
pub struct UpdateLotInput {
    pub broker_id: Option<Uuid>,
    pub transport_id: Option<Uuid>,
    pub animal_type: Option<String>,
    pub age_range: Option<String>,
    pub purchase_weight_kg: Option<Decimal>,
    pub carcass_yield_percent: Option<Decimal>,
    pub price_per_arroba: Option<Decimal>,
    pub purchase_value: Option<Decimal>,
    pub freight_cost: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub payment_type: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub commission_due_date: Option<NaiveDate>,
    pub freight_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for a status transition
#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub status: String,
}

/// Input for registering reception at the feedlot gate
#[derive(Debug, Deserialize)]
pub struct ReceptionInput {
    pub received_date: NaiveDate,
    pub received_weight_kg: Decimal,
    pub actual_quantity: i32,
    /// Animals lost in transit; implied by `initial - actual` when absent
    pub transit_mortality: Option<i32>,
    /// Freight settled at the gate overrides the negotiated value
    pub freight_cost: Option<Decimal>,
    pub allocations: Option<Vec<AllocationRequest>>,
    pub notes: Option<String>,
}

/// Input for confining a received lot into enclosures
#[derive(Debug, Deserialize)]
pub struct ConfineInput {
    pub allocations: Vec<AllocationRequest>,
    pub allocation_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Outcome of a lot deletion
#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub placements_removed: u64,
    pub death_records_removed: u64,
}

/// Per-status aggregate for the summary view
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusSummary {
    pub status: String,
    pub lot_count: i64,
    pub animals: i64,
    pub deaths: i64,
    pub total_invested: Decimal,
}

/// Lightweight dashboard summary of the herd
#[derive(Debug, Serialize)]
pub struct LotSummary {
    pub total_lots: i64,
    pub total_animals: i64,
    pub total_deaths: i64,
    pub total_invested: Decimal,
    pub by_status: Vec<StatusSummary>,
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Generate a unique lot code, sequential per month: YYYYMM-NNN
    async fn generate_code(&self, purchase_date: NaiveDate) -> AppResult<String> {
        let year = purchase_date.year();
        let month = purchase_date.month();

        let sequence: i32 = sqlx::query_scalar("SELECT get_next_lot_sequence($1, $2)")
            .bind(year)
            .bind(month as i32)
            .fetch_one(&self.db)
            .await?;

        Ok(generate_lot_code(year, month, sequence))
    }

    async fn partner_exists(&self, partner_id: Uuid) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM partners WHERE id = $1)")
                .bind(partner_id)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    /// Get all lots, newest first
    pub async fn get_lots(&self) -> AppResult<Vec<PurchasedLot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots ORDER BY purchase_date DESC, created_at DESC",
            LOT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(PurchasedLot::try_from).collect()
    }

    /// Get a lot by id
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<PurchasedLot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE id = $1",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        row.try_into()
    }

    /// Lock a lot row inside a transaction so per-lot operations serialize
    async fn get_lot_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lot_id: Uuid,
    ) -> AppResult<PurchasedLot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE id = $1 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        row.try_into()
    }

    /// Create a new purchased lot
    pub async fn create_lot(&self, input: CreateLotInput) -> AppResult<PurchasedLot> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade deve ser positiva".to_string(),
        })?;
        validate_weight(input.purchase_weight_kg).map_err(|msg| AppError::Validation {
            field: "purchase_weight_kg".to_string(),
            message: msg.to_string(),
            message_pt: "O peso deve ser positivo".to_string(),
        })?;
        validate_carcass_yield(input.carcass_yield_percent).map_err(|msg| {
            AppError::Validation {
                field: "carcass_yield_percent".to_string(),
                message: msg.to_string(),
                message_pt: "O rendimento de carcaca deve estar entre 0 e 100".to_string(),
            }
        })?;
        for (field, value) in [
            ("price_per_arroba", input.price_per_arroba),
            ("freight_cost", input.freight_cost.unwrap_or(Decimal::ZERO)),
            ("commission", input.commission.unwrap_or(Decimal::ZERO)),
        ] {
            validate_amount(value).map_err(|msg| AppError::Validation {
                field: field.to_string(),
                message: msg.to_string(),
                message_pt: "O valor nao pode ser negativo".to_string(),
            })?;
        }

        if !self.partner_exists(input.vendor_id).await? {
            return Err(AppError::NotFound("Vendor".to_string()));
        }
        for partner_id in [input.broker_id, input.transport_id].into_iter().flatten() {
            if !self.partner_exists(partner_id).await? {
                return Err(AppError::NotFound("Partner".to_string()));
            }
        }
        let account_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payer_accounts WHERE id = $1)")
                .bind(input.payer_account_id)
                .fetch_one(&self.db)
                .await?;
        if !account_exists {
            return Err(AppError::NotFound("Payer account".to_string()));
        }

        let status = match input.status.as_deref() {
            None => PurchaseStatus::Confirmed,
            Some(s) => match PurchaseStatus::from_str(s) {
                Some(st @ (PurchaseStatus::Negotiating | PurchaseStatus::Confirmed)) => st,
                _ => {
                    return Err(AppError::ValidationError(format!(
                        "A lot can only be created as negotiating or confirmed, got '{}'",
                        s
                    )))
                }
            },
        };

        let purchase_value = input.purchase_value.unwrap_or_else(|| {
            compute_purchase_value(
                input.purchase_weight_kg,
                input.carcass_yield_percent,
                input.price_per_arroba,
            )
        });
        let freight_cost = input.freight_cost.unwrap_or(Decimal::ZERO);
        let commission = input.commission.unwrap_or(Decimal::ZERO);
        let total_cost = compute_total_cost(purchase_value, freight_cost, commission);

        let code = self.generate_code(input.purchase_date).await?;

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO lots (code, vendor_id, broker_id, transport_id, payer_account_id,
                              purchase_date, animal_type, age_range, initial_quantity,
                              current_quantity, death_count, purchase_weight_kg,
                              carcass_yield_percent, price_per_arroba, purchase_value,
                              freight_cost, commission, total_cost, payment_type,
                              payment_due_date, commission_due_date, freight_due_date,
                              status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, 0, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(&code)
        .bind(input.vendor_id)
        .bind(input.broker_id)
        .bind(input.transport_id)
        .bind(input.payer_account_id)
        .bind(input.purchase_date)
        .bind(&input.animal_type)
        .bind(&input.age_range)
        .bind(input.quantity)
        .bind(input.purchase_weight_kg)
        .bind(input.carcass_yield_percent)
        .bind(input.price_per_arroba)
        .bind(purchase_value)
        .bind(freight_cost)
        .bind(commission)
        .bind(total_cost)
        .bind(&input.payment_type)
        .bind(input.payment_due_date)
        .bind(input.commission_due_date)
        .bind(input.freight_due_date)
        .bind(status.as_str())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    /// Update a lot's editable fields, recomputing derived monetary values
    pub async fn update_lot(&self, lot_id: Uuid, input: UpdateLotInput) -> AppResult<PurchasedLot> {
        let mut tx = self.db.begin().await?;
        let existing = self.get_lot_for_update(&mut tx, lot_id).await?;

        if existing.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is {} and can no longer be edited",
                existing.code, existing.status
            )));
        }

        if let Some(weight) = input.purchase_weight_kg {
            validate_weight(weight).map_err(|msg| AppError::Validation {
                field: "purchase_weight_kg".to_string(),
                message: msg.to_string(),
                message_pt: "O peso deve ser positivo".to_string(),
            })?;
        }
        if let Some(yield_pct) = input.carcass_yield_percent {
            validate_carcass_yield(yield_pct).map_err(|msg| AppError::Validation {
                field: "carcass_yield_percent".to_string(),
                message: msg.to_string(),
                message_pt: "O rendimento de carcaca deve estar entre 0 e 100".to_string(),
            })?;
        }
        for (field, value) in [
            ("price_per_arroba", input.price_per_arroba),
            ("purchase_value", input.purchase_value),
            ("freight_cost", input.freight_cost),
            ("commission", input.commission),
        ] {
            if let Some(v) = value {
                validate_amount(v).map_err(|msg| AppError::Validation {
                    field: field.to_string(),
                    message: msg.to_string(),
                    message_pt: "O valor nao pode ser negativo".to_string(),
                })?;
            }
        }

        let purchase_weight_kg = input
            .purchase_weight_kg
            .unwrap_or(existing.purchase_weight_kg);
        let carcass_yield_percent = input
            .carcass_yield_percent
            .unwrap_or(existing.carcass_yield_percent);
        let price_per_arroba = input.price_per_arroba.unwrap_or(existing.price_per_arroba);

        let pricing_changed = input.purchase_weight_kg.is_some()
            || input.carcass_yield_percent.is_some()
            || input.price_per_arroba.is_some();

        // An explicit purchase value wins; otherwise recompute it whenever
        // any of its inputs changed
        let purchase_value = match input.purchase_value {
            Some(value) => value,
            None if pricing_changed => {
                compute_purchase_value(purchase_weight_kg, carcass_yield_percent, price_per_arroba)
            }
            None => existing.purchase_value,
        };
        let freight_cost = input.freight_cost.unwrap_or(existing.freight_cost);
        let commission = input.commission.unwrap_or(existing.commission);
        let total_cost = compute_total_cost(purchase_value, freight_cost, commission);

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            UPDATE lots
            SET broker_id = $2, transport_id = $3, animal_type = $4, age_range = $5,
                purchase_weight_kg = $6, carcass_yield_percent = $7, price_per_arroba = $8,
                purchase_value = $9, freight_cost = $10, commission = $11, total_cost = $12,
                payment_type = $13, payment_due_date = $14, commission_due_date = $15,
                freight_due_date = $16, notes = $17, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(input.broker_id.or(existing.broker_id))
        .bind(input.transport_id.or(existing.transport_id))
        .bind(input.animal_type.unwrap_or(existing.animal_type))
        .bind(input.age_range.or(existing.age_range))
        .bind(purchase_weight_kg)
        .bind(carcass_yield_percent)
        .bind(price_per_arroba)
        .bind(purchase_value)
        .bind(freight_cost)
        .bind(commission)
        .bind(total_cost)
        .bind(input.payment_type.or(existing.payment_type))
        .bind(input.payment_due_date.or(existing.payment_due_date))
        .bind(input.commission_due_date.or(existing.commission_due_date))
        .bind(input.freight_due_date.or(existing.freight_due_date))
        .bind(input.notes.or(existing.notes))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Move a lot along the lifecycle graph
    pub async fn transition(
        &self,
        lot_id: Uuid,
        input: TransitionInput,
    ) -> AppResult<PurchasedLot> {
        let target = PurchaseStatus::from_str(&input.status).ok_or_else(|| {
            AppError::ValidationError(format!("Unknown status '{}'", input.status))
        })?;

        let mut tx = self.db.begin().await?;
        let lot = self.get_lot_for_update(&mut tx, lot_id).await?;

        if !lot.status.can_transition_to(target) {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} cannot move from {} to {}",
                lot.code, lot.status, target
            )));
        }
        // Confinement carries an allocation; a bare status flip would break
        // the conservation invariant
        if target == PurchaseStatus::Confined {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} must be confined through an enclosure allocation",
                lot.code
            )));
        }

        let lot = self.set_status(&mut tx, lot_id, target).await?;
        tx.commit().await?;
        Ok(lot)
    }

    async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lot_id: Uuid,
        status: PurchaseStatus,
    ) -> AppResult<PurchasedLot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "UPDATE lots SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    /// Register the lot's arrival at the feedlot: confirmed weight and head
    /// count, weight break, transit mortality, and optionally the enclosure
    /// allocation in the same atomic unit (jumping straight to confined).
    pub async fn register_reception(
        &self,
        lot_id: Uuid,
        input: ReceptionInput,
    ) -> AppResult<PurchasedLot> {
        with_transaction_retry("register_reception", || {
            self.register_reception_tx(lot_id, &input)
        })
        .await
    }

    async fn register_reception_tx(
        &self,
        lot_id: Uuid,
        input: &ReceptionInput,
    ) -> AppResult<PurchasedLot> {
        let mut tx = self.db.begin().await?;
        let lot = self.get_lot_for_update(&mut tx, lot_id).await?;

        if !matches!(
            lot.status,
            PurchaseStatus::Confirmed | PurchaseStatus::InTransit
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} cannot be received while {}",
                lot.code, lot.status
            )));
        }

        validate_weight(input.received_weight_kg).map_err(|msg| AppError::Validation {
            field: "received_weight_kg".to_string(),
            message: msg.to_string(),
            message_pt: "O peso recebido deve ser positivo".to_string(),
        })?;
        validate_quantity(input.actual_quantity).map_err(|msg| AppError::Validation {
            field: "actual_quantity".to_string(),
            message: msg.to_string(),
            message_pt: "A quantidade recebida deve ser positiva".to_string(),
        })?;
        if input.actual_quantity > lot.initial_quantity {
            return Err(AppError::Validation {
                field: "actual_quantity".to_string(),
                message: "Received quantity cannot exceed the purchased quantity".to_string(),
                message_pt: "A quantidade recebida nao pode exceder a quantidade comprada"
                    .to_string(),
            });
        }

        let implicit_mortality = lot.initial_quantity - input.actual_quantity;
        let transit_mortality = input.transit_mortality.unwrap_or(implicit_mortality);
        if transit_mortality != implicit_mortality {
            return Err(AppError::Validation {
                field: "transit_mortality".to_string(),
                message: format!(
                    "Transit mortality {} does not reconcile purchased {} with received {}",
                    transit_mortality, lot.initial_quantity, input.actual_quantity
                ),
                message_pt: "A mortalidade em transito nao fecha com as quantidades informadas"
                    .to_string(),
            });
        }

        let (weight_break_kg, weight_break_percent) =
            compute_weight_break(lot.purchase_weight_kg, input.received_weight_kg);

        let freight_cost = input.freight_cost.unwrap_or(lot.freight_cost);
        validate_amount(freight_cost).map_err(|msg| AppError::Validation {
            field: "freight_cost".to_string(),
            message: msg.to_string(),
            message_pt: "O valor nao pode ser negativo".to_string(),
        })?;
        let total_cost = compute_total_cost(lot.purchase_value, freight_cost, lot.commission);

        let status = if input.allocations.is_some() {
            PurchaseStatus::Confined
        } else {
            PurchaseStatus::Received
        };

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            UPDATE lots
            SET received_date = $2, received_weight_kg = $3, current_quantity = $4,
                death_count = death_count + $5, weight_break_kg = $6,
                weight_break_percent = $7, freight_cost = $8, total_cost = $9,
                status = $10, notes = COALESCE($11, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(input.received_date)
        .bind(input.received_weight_kg)
        .bind(input.actual_quantity)
        .bind(transit_mortality)
        .bind(weight_break_kg)
        .bind(weight_break_percent)
        .bind(freight_cost)
        .bind(total_cost)
        .bind(status.as_str())
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(allocations) = &input.allocations {
            allocation::allocate(
                &mut tx,
                lot_id,
                input.actual_quantity,
                input.received_date,
                allocations,
            )
            .await?;
        }

        tx.commit().await?;
        row.try_into()
    }

    /// Confine a received lot: retire any prior ACTIVE placements, then
    /// create the requested distribution, all in one transaction.
    pub async fn confine(&self, lot_id: Uuid, input: ConfineInput) -> AppResult<PurchasedLot> {
        with_transaction_retry("confine", || self.confine_tx(lot_id, &input)).await
    }

    async fn confine_tx(&self, lot_id: Uuid, input: &ConfineInput) -> AppResult<PurchasedLot> {
        let mut tx = self.db.begin().await?;
        let lot = self.get_lot_for_update(&mut tx, lot_id).await?;

        if lot.status != PurchaseStatus::Received {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} cannot be confined while {}",
                lot.code, lot.status
            )));
        }

        let retired = allocation::retire_active(&mut tx, lot_id).await?;
        if retired > 0 {
            tracing::debug!(lot = %lot.code, retired, "Retired prior placements before confinement");
        }

        let allocation_date = input
            .allocation_date
            .unwrap_or_else(|| Utc::now().date_naive());
        allocation::allocate(
            &mut tx,
            lot_id,
            lot.current_quantity,
            allocation_date,
            &input.allocations,
        )
        .await?;

        if let Some(notes) = &input.notes {
            sqlx::query("UPDATE lots SET notes = $2, updated_at = NOW() WHERE id = $1")
                .bind(lot_id)
                .bind(notes)
                .execute(&mut *tx)
                .await?;
        }

        let lot = self
            .set_status(&mut tx, lot_id, PurchaseStatus::Confined)
            .await?;
        tx.commit().await?;
        Ok(lot)
    }

    /// Delete a lot, cascading its placements and death records. Idempotent:
    /// deleting a missing lot is not an error.
    pub async fn delete_lot(
        &self,
        lot_id: Uuid,
    ) -> AppResult<(Option<PurchasedLot>, DeleteOutcome)> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE id = $1 FOR UPDATE",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok((
                None,
                DeleteOutcome {
                    deleted: false,
                    placements_removed: 0,
                    death_records_removed: 0,
                },
            ));
        };
        let lot: PurchasedLot = row.try_into()?;

        let death_records_removed = sqlx::query("DELETE FROM death_records WHERE lot_id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let placements_removed = sqlx::query("DELETE FROM lot_placements WHERE lot_id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if death_records_removed > 0 || placements_removed > 0 {
            tracing::warn!(
                lot = %lot.code,
                placements_removed,
                death_records_removed,
                "Deleting lot with dependent rows"
            );
        }

        sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((
            Some(lot),
            DeleteOutcome {
                deleted: true,
                placements_removed,
                death_records_removed,
            },
        ))
    }

    /// Aggregate view of lots by status, optionally limited to a purchase
    /// date range
    pub async fn summary(&self, range: Option<DateRange>) -> AppResult<LotSummary> {
        let (start, end) = match range {
            Some(r) => (Some(r.start), Some(r.end)),
            None => (None, None),
        };

        let by_status = sqlx::query_as::<_, StatusSummary>(
            r#"
            SELECT status, COUNT(*) as lot_count,
                   COALESCE(SUM(current_quantity), 0)::BIGINT as animals,
                   COALESCE(SUM(death_count), 0)::BIGINT as deaths,
                   COALESCE(SUM(total_cost), 0) as total_invested
            FROM lots
            WHERE ($1::date IS NULL OR purchase_date >= $1)
              AND ($2::date IS NULL OR purchase_date <= $2)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        let mut summary = LotSummary {
            total_lots: 0,
            total_animals: 0,
            total_deaths: 0,
            total_invested: Decimal::ZERO,
            by_status: Vec::new(),
        };
        for entry in by_status {
            summary.total_lots += entry.lot_count;
            summary.total_animals += entry.animals;
            summary.total_deaths += entry.deaths;
            summary.total_invested += entry.total_invested;
            summary.by_status.push(entry);
        }

        Ok(summary)
    }
}
