//! Route definitions for the Feedlot Purchase Management Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Lot management
        .nest("/lots", lot_routes())
        // Loss accounting
        .nest("/losses", loss_routes())
        // Enclosure registry
        .nest("/enclosures", enclosure_routes())
}

/// Lot management routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route("/summary", get(handlers::lot_summary))
        .route(
            "/:lot_id",
            get(handlers::get_lot)
                .put(handlers::update_lot)
                .delete(handlers::delete_lot),
        )
        .route("/:lot_id/transition", post(handlers::transition_lot))
        .route("/:lot_id/reception", post(handlers::register_reception))
        .route("/:lot_id/confine", post(handlers::confine_lot))
        .route("/:lot_id/placements", get(handlers::list_lot_placements))
        .route("/:lot_id/expenses", get(handlers::list_lot_expenses))
        .route("/:lot_id/expenses/sync", post(handlers::sync_lot_expenses))
}

/// Loss accounting routes
fn loss_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_losses).post(handlers::record_loss))
        .route(
            "/:record_id",
            get(handlers::get_loss)
                .put(handlers::update_loss)
                .delete(handlers::reverse_loss),
        )
}

/// Enclosure registry routes
fn enclosure_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_enclosures).post(handlers::create_enclosure),
        )
        .route(
            "/:enclosure_id",
            get(handlers::get_enclosure).put(handlers::update_enclosure),
        )
}
