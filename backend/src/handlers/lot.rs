//! Lot management HTTP handlers
//!
//! Handlers that change a lot's monetary fields run the financial mirror
//! after the lot mutation commits and return both results side by side, so
//! a degraded ledger sync still answers with the committed lot.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::allocation::AllocationService;
use crate::services::finance::FinanceService;
use crate::services::lot::{
    ConfineInput, CreateLotInput, LotService, ReceptionInput, TransitionInput, UpdateLotInput,
};
use crate::AppState;
use shared::types::DateRange;

/// List all lots
pub async fn list_lots(State(state): State<AppState>) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.get_lots().await {
        Ok(lots) => (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific lot
pub async fn get_lot(State(state): State<AppState>, Path(lot_id): Path<Uuid>) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.get_lot(lot_id).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new purchased lot and mirror its expenses
pub async fn create_lot(
    State(state): State<AppState>,
    Json(input): Json<CreateLotInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    match service.create_lot(input).await {
        Ok(lot) => {
            let sync = finance.synchronize(&lot).await;
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "lot": lot, "finance": sync })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Update a lot and re-align its mirrored expenses
pub async fn update_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<UpdateLotInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    match service.update_lot(lot_id, input).await {
        Ok(lot) => {
            let sync = finance.synchronize(&lot).await;
            (
                StatusCode::OK,
                Json(serde_json::json!({ "lot": lot, "finance": sync })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Delete a lot and purge its mirrored expenses
pub async fn delete_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    match service.delete_lot(lot_id).await {
        Ok((Some(lot), outcome)) => {
            let sync = finance.purge(&lot).await;
            (
                StatusCode::OK,
                Json(serde_json::json!({ "outcome": outcome, "finance": sync })),
            )
                .into_response()
        }
        Ok((None, outcome)) => {
            (StatusCode::OK, Json(serde_json::json!({ "outcome": outcome }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Move a lot along its lifecycle
pub async fn transition_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.transition(lot_id, input).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register a lot's arrival at the feedlot
pub async fn register_reception(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<ReceptionInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    match service.register_reception(lot_id, input).await {
        Ok(lot) => {
            // Freight settled at the gate may have changed the ledger
            let sync = finance.synchronize(&lot).await;
            (
                StatusCode::OK,
                Json(serde_json::json!({ "lot": lot, "finance": sync })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Confine a received lot into enclosures
pub async fn confine_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<ConfineInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.confine(lot_id, input).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// All placements of a lot
pub async fn list_lot_placements(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = AllocationService::new(state.db.clone());

    match service.get_lot_placements(lot_id).await {
        Ok(placements) => (
            StatusCode::OK,
            Json(serde_json::json!({ "placements": placements })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// The expense rows mirroring a lot
pub async fn list_lot_expenses(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    let lot = match service.get_lot(lot_id).await {
        Ok(lot) => lot,
        Err(e) => return e.into_response(),
    };

    match finance.get_lot_expenses(&lot.code).await {
        Ok(expenses) => (
            StatusCode::OK,
            Json(serde_json::json!({ "expenses": expenses })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Re-run the financial mirror for a lot on demand
pub async fn sync_lot_expenses(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());
    let finance = FinanceService::new(state.db.clone(), state.finance_defaults);

    match service.get_lot(lot_id).await {
        Ok(lot) => {
            let sync = finance.synchronize(&lot).await;
            (StatusCode::OK, Json(sync)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Optional purchase date window for the summary view
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub start: Option<chrono::NaiveDate>,
    pub end: Option<chrono::NaiveDate>,
}

/// Aggregate view of the herd by status
pub async fn lot_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    let range = match (query.start, query.end) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    };

    match service.summary(range).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}
