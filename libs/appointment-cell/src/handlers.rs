// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::{success, Page};
use shared_utils::permissions::{has_clinic_permission, Permission};

use crate::models::{
    Appointment, AppointmentFilter, AppointmentSearchQuery, BookAppointmentRequest,
    BookingCommand, CancelAppointmentRequest,
};
use crate::services::AppointmentBookingService;

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppointmentBookingService>,
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.user_uuid()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))
}

/// Patients see their own appointments, doctors their own schedule, and
/// clinic staff everything at their clinic.
fn can_access(user: &User, appointment: &Appointment) -> bool {
    let caller = user.user_uuid();
    caller == Some(appointment.patient_id)
        || caller == Some(appointment.doctor_id)
        || has_clinic_permission(user, Permission::ManageBookings, appointment.clinic_id)
}

pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;
    let patient_id = request.patient_id.unwrap_or(caller);

    if patient_id != caller {
        let slot = state.service.slot(request.slot_id).await?;
        if !has_clinic_permission(&user, Permission::ManageBookings, slot.clinic_id) {
            return Err(AppError::Forbidden("Cannot book on behalf of another patient".to_string()));
        }
    }

    let appointment = state
        .service
        .book(BookingCommand {
            slot_id: request.slot_id,
            patient_id,
            doctor_id: request.doctor_id,
            notes: request.notes,
        })
        .await?;

    Ok(success(appointment))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service.get(appointment_id).await?;
    if !can_access(&user, &appointment) {
        return Err(AppError::Forbidden("Not allowed to view this appointment".to_string()));
    }
    Ok(success(appointment))
}

pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let mut filter = AppointmentFilter::from(&query);

    let staff_view = query
        .clinic_id
        .is_some_and(|clinic_id| has_clinic_permission(&user, Permission::ManageBookings, clinic_id));
    if !staff_view {
        let caller = caller_id(&user)?;
        if filter.doctor_id != Some(caller) {
            filter.patient_id = Some(caller);
        }
    }

    debug!("Listing appointments with {:?}", filter);
    let appointments = state.service.list(filter).await?;
    Ok(success(Page::paginate(appointments, query.page, query.limit)))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service.get(appointment_id).await?;
    if !can_access(&user, &appointment) {
        return Err(AppError::Forbidden("Not allowed to cancel this appointment".to_string()));
    }

    let reason = request.and_then(|Json(body)| body.reason);
    let cancelled = state.service.cancel(appointment_id, reason).await?;
    Ok(success(cancelled))
}
