//! Financial mirror service
//!
//! Keeps the expense ledger aligned with each lot's monetary fields. The
//! expected rows are derived as pure data, diffed against what is stored,
//! and the plan is applied row by row. Ledger failures never fail the lot
//! operation that triggered them; they are reported in the sync status so
//! the caller can surface a degraded result and retry later.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::FinanceConfig;
use crate::error::{AppError, AppResult};
use shared::models::{
    ledger_components, plan_reconciliation, ExistingEntry, ExpenseKind, FinancialSyncStatus,
    LedgerAction, LedgerComponent, PurchasedLot, EXPENSE_KINDS,
};

/// Expense category ids resolved once at startup from configured names
#[derive(Debug, Clone, Copy)]
pub struct FinanceDefaults {
    pub purchase_category_id: Uuid,
    pub commission_category_id: Uuid,
    pub freight_category_id: Uuid,
}

impl FinanceDefaults {
    /// Resolve the configured category names against the expense_categories
    /// table. Missing rows are a deployment error, not a runtime condition.
    pub async fn resolve(db: &PgPool, config: &FinanceConfig) -> AppResult<Self> {
        let mut ids = [Uuid::nil(); 3];
        let names = [
            &config.purchase_category,
            &config.commission_category,
            &config.freight_category,
        ];
        for (slot, name) in ids.iter_mut().zip(names) {
            let id: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM expense_categories WHERE name = $1")
                    .bind(name)
                    .fetch_optional(db)
                    .await?;
            *slot = id.ok_or_else(|| {
                AppError::Configuration(format!("Expense category '{}' is not seeded", name))
            })?;
        }
        Ok(Self {
            purchase_category_id: ids[0],
            commission_category_id: ids[1],
            freight_category_id: ids[2],
        })
    }

    fn category_for(&self, kind: ExpenseKind) -> Uuid {
        match kind {
            ExpenseKind::Purchase => self.purchase_category_id,
            ExpenseKind::Commission => self.commission_category_id,
            ExpenseKind::Freight => self.freight_category_id,
        }
    }
}

/// A stored expense row as served over the API
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub reference: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: String,
    pub counterparty_id: Option<Uuid>,
    pub payer_account_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const EXPENSE_COLUMNS: &str = "id, reference, description, amount, due_date, status, \
     counterparty_id, payer_account_id, category_id, created_at, updated_at";

/// Financial mirror service
#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
    defaults: FinanceDefaults,
}

impl FinanceService {
    /// Create a new FinanceService instance
    pub fn new(db: PgPool, defaults: FinanceDefaults) -> Self {
        Self { db, defaults }
    }

    /// Align the stored expense rows with the lot's current monetary fields.
    /// Idempotent: running it twice against an unchanged lot applies nothing.
    pub async fn synchronize(&self, lot: &PurchasedLot) -> FinancialSyncStatus {
        let mut status = FinancialSyncStatus::default();

        let existing = match self.existing_entries(&lot.code).await {
            Ok(entries) => entries,
            Err(err) => {
                status.record_error(format!("Could not read expense rows: {}", err));
                return status;
            }
        };

        let components = ledger_components(lot);
        let plan = plan_reconciliation(&components, &existing);

        for action in plan {
            match self.apply(lot, &action).await {
                Ok(()) => {
                    if matches!(action, LedgerAction::Create(_)) {
                        status.expenses_created += 1;
                    }
                }
                Err(err) => {
                    let kind = match &action {
                        LedgerAction::Create(c) => c.kind,
                        LedgerAction::Update { component, .. } => component.kind,
                        LedgerAction::Delete { kind, .. } => *kind,
                    };
                    tracing::warn!(
                        lot = %lot.code,
                        kind = kind.as_str(),
                        "Expense sync step failed: {}",
                        err
                    );
                    status.record_error(format!(
                        "{} expense for lot {}: {}",
                        kind.as_str(),
                        lot.code,
                        err
                    ));
                }
            }
        }

        status
    }

    /// Remove every expense row mirroring the lot. Used when the lot itself
    /// is deleted.
    pub async fn purge(&self, lot: &PurchasedLot) -> FinancialSyncStatus {
        let mut status = FinancialSyncStatus::default();
        let references: Vec<String> = EXPENSE_KINDS
            .iter()
            .map(|kind| kind.reference_for(&lot.code))
            .collect();

        match sqlx::query("DELETE FROM expenses WHERE reference = ANY($1)")
            .bind(&references)
            .execute(&self.db)
            .await
        {
            Ok(result) => {
                tracing::debug!(lot = %lot.code, removed = result.rows_affected(), "Purged mirrored expenses");
            }
            Err(err) => {
                tracing::warn!(lot = %lot.code, "Expense purge failed: {}", err);
                status.record_error(format!("Purging expenses for lot {}: {}", lot.code, err));
            }
        }

        status
    }

    /// The expense rows mirroring a lot, in materialization order
    pub async fn get_lot_expenses(&self, lot_code: &str) -> AppResult<Vec<Expense>> {
        let references: Vec<String> = EXPENSE_KINDS
            .iter()
            .map(|kind| kind.reference_for(lot_code))
            .collect();

        let rows = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE reference = ANY($1) ORDER BY reference",
            EXPENSE_COLUMNS
        ))
        .bind(&references)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn existing_entries(&self, lot_code: &str) -> AppResult<Vec<ExistingEntry>> {
        let expenses = self.get_lot_expenses(lot_code).await?;

        let mut entries = Vec::with_capacity(expenses.len());
        for expense in expenses {
            let kind = ExpenseKind::from_reference(&expense.reference).ok_or_else(|| {
                AppError::Internal(format!(
                    "Expense {} carries an unrecognized reference '{}'",
                    expense.id, expense.reference
                ))
            })?;
            entries.push(ExistingEntry {
                id: expense.id,
                kind,
                amount: expense.amount,
                due_date: expense.due_date,
                counterparty_id: expense.counterparty_id,
            });
        }
        Ok(entries)
    }

    async fn apply(&self, lot: &PurchasedLot, action: &LedgerAction) -> AppResult<()> {
        match action {
            LedgerAction::Create(component) => self.create_expense(lot, component).await,
            LedgerAction::Update { id, component } => self.update_expense(*id, component).await,
            LedgerAction::Delete { id, .. } => {
                sqlx::query("DELETE FROM expenses WHERE id = $1")
                    .bind(id)
                    .execute(&self.db)
                    .await?;
                Ok(())
            }
        }
    }

    async fn create_expense(
        &self,
        lot: &PurchasedLot,
        component: &LedgerComponent,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (reference, description, amount, due_date, status,
                                  counterparty_id, payer_account_id, category_id)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
            "#,
        )
        .bind(component.kind.reference_for(&lot.code))
        .bind(component.kind.description_for(&lot.code))
        .bind(component.amount)
        .bind(component.due_date)
        .bind(component.counterparty_id)
        .bind(lot.payer_account_id)
        .bind(self.defaults.category_for(component.kind))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_expense(&self, id: Uuid, component: &LedgerComponent) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE expenses
            SET amount = $2, due_date = $3, counterparty_id = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(component.amount)
        .bind(component.due_date)
        .bind(component.counterparty_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
