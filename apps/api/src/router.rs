use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{AppointmentBookingService, AppointmentCommitments};
use shared_config::AppConfig;
use slot_cell::handlers::SlotState;
use slot_cell::router::slot_routes;
use slot_cell::services::DoctorCommitments;
use timetable_cell::handlers::TimetableState;
use timetable_cell::router::{clinic_timetable_routes, doctor_timetable_routes};
use timetable_cell::TimetableService;

use crate::backends::Backends;

pub fn create_router(config: Arc<AppConfig>, backends: Backends) -> Router {
    let timetables = Arc::new(TimetableService::new(backends.timetables));

    let timetable_state = Arc::new(TimetableState {
        config: config.clone(),
        service: timetables.clone(),
    });

    let commitments: Arc<dyn DoctorCommitments> = Arc::new(AppointmentCommitments::new(backends.appointments.clone()));
    let slot_state = Arc::new(SlotState::new(
        config.clone(),
        backends.slots.clone(),
        timetables,
        backends.directory,
        Some(commitments),
    ));

    let appointment_state = Arc::new(AppointmentState {
        config: config.clone(),
        service: Arc::new(AppointmentBookingService::new(
            backends.slots,
            slot_state.allocator.clone(),
            slot_state.resolver.clone(),
            backends.appointments,
        )),
    });

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/clinics", clinic_timetable_routes(timetable_state.clone()))
        .nest("/doctors", doctor_timetable_routes(timetable_state))
        .nest("/slots", slot_routes(slot_state))
        .nest("/appointments", appointment_routes(appointment_state))
}
