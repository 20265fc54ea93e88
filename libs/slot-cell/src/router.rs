// libs/slot-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch, delete},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SlotState};

/// Mounted under `/slots`.
pub fn slot_routes(state: Arc<SlotState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_slots))
        .route("/doctors/available", get(handlers::available_doctors))
        .route("/{slot_id}", get(handlers::get_slot));

    let protected_routes = Router::new()
        .route("/generate", post(handlers::generate_slots))
        .route("/regenerate-future", post(handlers::regenerate_future))
        .route("/{slot_id}/status", patch(handlers::update_slot_status))
        .route("/{slot_id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
