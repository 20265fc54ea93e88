// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

/// Mounted under `/appointments`. Every route requires a bearer token.
pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
