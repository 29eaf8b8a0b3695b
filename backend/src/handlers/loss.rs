//! Loss accounting HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::loss::{LossFilter, LossService, RecordLossInput, UpdateLossInput};
use crate::AppState;

/// List loss records, optionally filtered by lot and date range
pub async fn list_losses(
    State(state): State<AppState>,
    Query(filter): Query<LossFilter>,
) -> impl IntoResponse {
    let service = LossService::new(
        state.db.clone(),
        state.config.livestock.default_average_weight_kg,
    );

    match service.list_losses(filter).await {
        Ok(losses) => (StatusCode::OK, Json(serde_json::json!({ "losses": losses }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a single loss record
pub async fn get_loss(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LossService::new(
        state.db.clone(),
        state.config.livestock.default_average_weight_kg,
    );

    match service.get_loss(record_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a loss event
pub async fn record_loss(
    State(state): State<AppState>,
    Json(input): Json<RecordLossInput>,
) -> impl IntoResponse {
    let service = LossService::new(
        state.db.clone(),
        state.config.livestock.default_average_weight_kg,
    );

    match service.record_loss(input).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Correct a recorded loss
pub async fn update_loss(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(input): Json<UpdateLossInput>,
) -> impl IntoResponse {
    let service = LossService::new(
        state.db.clone(),
        state.config.livestock.default_average_weight_kg,
    );

    match service.update_loss(record_id, input).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reverse a recorded loss, restoring the lot's counts
pub async fn reverse_loss(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LossService::new(
        state.db.clone(),
        state.config.livestock.default_average_weight_kg,
    );

    match service.reverse_loss(record_id).await {
        Ok(record) => (
            StatusCode::OK,
            Json(serde_json::json!({ "reversed": record })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
