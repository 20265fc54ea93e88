// libs/timetable-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch, delete},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, TimetableState};

/// Mounted under `/clinics`.
pub fn clinic_timetable_routes(state: Arc<TimetableState>) -> Router {
    let public_routes = Router::new()
        .route("/{clinic_id}/timetables", get(handlers::list_clinic_timetables))
        .route("/{clinic_id}/timetables/{entry_id}", get(handlers::get_clinic_timetable));

    let protected_routes = Router::new()
        .route("/{clinic_id}/timetables", post(handlers::create_clinic_timetable))
        .route("/{clinic_id}/timetables/initialize", post(handlers::initialize_clinic_timetables))
        .route("/{clinic_id}/timetables/{entry_id}", patch(handlers::update_clinic_timetable))
        .route("/{clinic_id}/timetables/{entry_id}", delete(handlers::delete_clinic_timetable))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Mounted under `/doctors`.
pub fn doctor_timetable_routes(state: Arc<TimetableState>) -> Router {
    let public_routes = Router::new()
        .route("/{doctor_id}/timetables", get(handlers::list_doctor_timetables))
        .route("/{doctor_id}/timetables/{entry_id}", get(handlers::get_doctor_timetable));

    let protected_routes = Router::new()
        .route("/{doctor_id}/timetables", post(handlers::create_doctor_timetable))
        .route("/{doctor_id}/timetables/initialize", post(handlers::initialize_doctor_timetables))
        .route("/{doctor_id}/timetables/{entry_id}", patch(handlers::update_doctor_timetable))
        .route("/{doctor_id}/timetables/{entry_id}", delete(handlers::delete_doctor_timetable))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
