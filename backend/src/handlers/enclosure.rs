//! Enclosure registry HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::enclosure::{CreateEnclosureInput, EnclosureService, UpdateEnclosureInput};
use crate::AppState;

/// List all enclosures with their occupancy
pub async fn list_enclosures(State(state): State<AppState>) -> impl IntoResponse {
    let service = EnclosureService::new(state.db.clone());

    match service.get_enclosures().await {
        Ok(enclosures) => (
            StatusCode::OK,
            Json(serde_json::json!({ "enclosures": enclosures })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one enclosure with its occupancy
pub async fn get_enclosure(
    State(state): State<AppState>,
    Path(enclosure_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = EnclosureService::new(state.db.clone());

    match service.get_enclosure(enclosure_id).await {
        Ok(enclosure) => (StatusCode::OK, Json(enclosure)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register a new enclosure
pub async fn create_enclosure(
    State(state): State<AppState>,
    Json(input): Json<CreateEnclosureInput>,
) -> impl IntoResponse {
    let service = EnclosureService::new(state.db.clone());

    match service.create_enclosure(input).await {
        Ok(enclosure) => (StatusCode::CREATED, Json(enclosure)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update an enclosure
pub async fn update_enclosure(
    State(state): State<AppState>,
    Path(enclosure_id): Path<Uuid>,
    Json(input): Json<UpdateEnclosureInput>,
) -> impl IntoResponse {
    let service = EnclosureService::new(state.db.clone());

    match service.update_enclosure(enclosure_id, input).await {
        Ok(enclosure) => (StatusCode::OK, Json(enclosure)).into_response(),
        Err(e) => e.into_response(),
    }
}
