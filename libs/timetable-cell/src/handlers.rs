use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::success;
use shared_utils::permissions::{require_clinic_permission, require_doctor_schedule_access, Permission};

use crate::models::{
    CreateTimetableEntryRequest, InitializeDay, TimetableOwner, TimetableQuery,
    UpdateTimetableEntryRequest,
};
use crate::services::TimetableService;

pub struct TimetableState {
    pub config: Arc<AppConfig>,
    pub service: Arc<TimetableService>,
}

fn authorize(user: &User, owner: TimetableOwner) -> Result<(), AppError> {
    match owner.kind {
        crate::models::OwnerKind::Clinic => {
            require_clinic_permission(user, Permission::ManageSchedule, owner.id)
        }
        crate::models::OwnerKind::Doctor => require_doctor_schedule_access(user, owner.id),
    }
}

async fn create(
    state: &TimetableState,
    user: &User,
    owner: TimetableOwner,
    request: CreateTimetableEntryRequest,
) -> Result<Json<Value>, AppError> {
    authorize(user, owner)?;
    let entry = state.service.create_entry(owner, request).await?;
    Ok(success(entry))
}

async fn list(
    state: &TimetableState,
    owner: TimetableOwner,
    query: TimetableQuery,
) -> Result<Json<Value>, AppError> {
    let entries = state.service.list_entries(owner, &query).await?;
    Ok(success(entries))
}

async fn get(state: &TimetableState, owner: TimetableOwner, entry_id: Uuid) -> Result<Json<Value>, AppError> {
    let entry = state.service.get_entry(owner, entry_id).await?;
    Ok(success(entry))
}

async fn update(
    state: &TimetableState,
    user: &User,
    owner: TimetableOwner,
    entry_id: Uuid,
    request: UpdateTimetableEntryRequest,
) -> Result<Json<Value>, AppError> {
    authorize(user, owner)?;
    let entry = state.service.update_entry(owner, entry_id, request).await?;
    Ok(success(entry))
}

async fn delete(
    state: &TimetableState,
    user: &User,
    owner: TimetableOwner,
    entry_id: Uuid,
) -> Result<Json<Value>, AppError> {
    authorize(user, owner)?;
    state.service.delete_entry(owner, entry_id).await?;
    Ok(success(serde_json::json!({ "deleted": entry_id })))
}

async fn initialize(
    state: &TimetableState,
    user: &User,
    owner: TimetableOwner,
    days: Vec<InitializeDay>,
) -> Result<Json<Value>, AppError> {
    authorize(user, owner)?;
    let entries = state.service.initialize(owner, days).await?;
    Ok(success(entries))
}

// ==============================================================================
// CLINIC TIMETABLES
// ==============================================================================

pub async fn create_clinic_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<CreateTimetableEntryRequest>,
) -> Result<Json<Value>, AppError> {
    create(&state, &user, TimetableOwner::clinic(clinic_id), request).await
}

pub async fn list_clinic_timetables(
    State(state): State<Arc<TimetableState>>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<TimetableQuery>,
) -> Result<Json<Value>, AppError> {
    list(&state, TimetableOwner::clinic(clinic_id), query).await
}

pub async fn get_clinic_timetable(
    State(state): State<Arc<TimetableState>>,
    Path((clinic_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    get(&state, TimetableOwner::clinic(clinic_id), entry_id).await
}

pub async fn update_clinic_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path((clinic_id, entry_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTimetableEntryRequest>,
) -> Result<Json<Value>, AppError> {
    update(&state, &user, TimetableOwner::clinic(clinic_id), entry_id, request).await
}

pub async fn delete_clinic_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path((clinic_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    delete(&state, &user, TimetableOwner::clinic(clinic_id), entry_id).await
}

pub async fn initialize_clinic_timetables(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(days): Json<Vec<InitializeDay>>,
) -> Result<Json<Value>, AppError> {
    initialize(&state, &user, TimetableOwner::clinic(clinic_id), days).await
}

// ==============================================================================
// DOCTOR TIMETABLES
// ==============================================================================

pub async fn create_doctor_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateTimetableEntryRequest>,
) -> Result<Json<Value>, AppError> {
    create(&state, &user, TimetableOwner::doctor(doctor_id), request).await
}

pub async fn list_doctor_timetables(
    State(state): State<Arc<TimetableState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<TimetableQuery>,
) -> Result<Json<Value>, AppError> {
    list(&state, TimetableOwner::doctor(doctor_id), query).await
}

pub async fn get_doctor_timetable(
    State(state): State<Arc<TimetableState>>,
    Path((doctor_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    get(&state, TimetableOwner::doctor(doctor_id), entry_id).await
}

pub async fn update_doctor_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path((doctor_id, entry_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTimetableEntryRequest>,
) -> Result<Json<Value>, AppError> {
    update(&state, &user, TimetableOwner::doctor(doctor_id), entry_id, request).await
}

pub async fn delete_doctor_timetable(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path((doctor_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    delete(&state, &user, TimetableOwner::doctor(doctor_id), entry_id).await
}

pub async fn initialize_doctor_timetables(
    State(state): State<Arc<TimetableState>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(days): Json<Vec<InitializeDay>>,
) -> Result<Json<Value>, AppError> {
    initialize(&state, &user, TimetableOwner::doctor(doctor_id), days).await
}
