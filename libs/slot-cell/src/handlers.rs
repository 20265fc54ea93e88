use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::{success, Page};
use shared_utils::permissions::{require_clinic_permission, Permission};
use timetable_cell::TimetableService;

use crate::error::SlotError;
use crate::models::{
    to_views, AvailabilityQuery, AvailableDoctorsQuery, GenerationRequest, RegenerationRequest,
    SlotDefaults, SlotFilter, SlotListQuery, SlotView, UpdateSlotStatusRequest,
};
use crate::services::{
    AvailabilityResolver, BookingAllocator, DoctorCommitments, DoctorDirectory, RegenerationCoordinator,
    SlotGenerator, SlotRepository,
};

pub struct SlotState {
    pub config: Arc<AppConfig>,
    pub slots: Arc<dyn SlotRepository>,
    pub generator: Arc<SlotGenerator>,
    pub resolver: Arc<AvailabilityResolver>,
    pub allocator: Arc<BookingAllocator>,
    pub regeneration: Arc<RegenerationCoordinator>,
}

impl SlotState {
    pub fn new(
        config: Arc<AppConfig>,
        slots: Arc<dyn SlotRepository>,
        timetables: Arc<TimetableService>,
        directory: Arc<dyn DoctorDirectory>,
        commitments: Option<Arc<dyn DoctorCommitments>>,
    ) -> Self {
        let generator = Arc::new(SlotGenerator::new(
            Arc::clone(&slots),
            Arc::clone(&timetables),
            config.slot_max_generation_days,
        ));
        let defaults = SlotDefaults {
            slot_duration_minutes: config.slot_default_duration_minutes,
            max_concurrent_appointments: config.slot_default_capacity,
            horizon_days: config.slot_regeneration_horizon_days,
        };

        let mut resolver = AvailabilityResolver::new(directory, timetables, Arc::clone(&slots));
        if let Some(commitments) = commitments {
            resolver = resolver.with_commitments(commitments);
        }

        Self {
            resolver: Arc::new(resolver),
            allocator: Arc::new(BookingAllocator::new(Arc::clone(&slots))),
            regeneration: Arc::new(RegenerationCoordinator::new(Arc::clone(&slots), Arc::clone(&generator), defaults)),
            generator,
            slots,
            config,
        }
    }
}

fn list_filter(query: &SlotListQuery) -> Result<SlotFilter, SlotError> {
    if query.clinic_id.is_none() && query.doctor_id.is_none() {
        return Err(SlotError::Validation("clinic_id or doctor_id is required".to_string()));
    }

    let (date_from, date_to) = match query.slot_date {
        Some(date) => (Some(date), Some(date)),
        None => (query.date_from, query.date_to),
    };
    if let (Some(from), Some(to)) = (date_from, date_to) {
        if to < from {
            return Err(SlotError::Validation(format!("date_to {} is before date_from {}", to, from)));
        }
    }

    Ok(SlotFilter {
        clinic_id: query.clinic_id,
        doctor_id: query.doctor_id,
        service_id: query.service_id,
        date_from,
        date_to,
        statuses: query.status.map(|status| vec![status]),
        clinic_level: None,
        available_only: query.available_only.unwrap_or(false),
    })
}

pub async fn list_slots(
    State(state): State<Arc<SlotState>>,
    Query(query): Query<SlotListQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = list_filter(&query)?;
    let slots = state.slots.list(filter).await?;
    debug!("Listing {} slots", slots.len());

    Ok(success(Page::paginate(to_views(&slots), query.page, query.limit)))
}

pub async fn get_slot(
    State(state): State<Arc<SlotState>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot = state.slots.get(slot_id).await?;
    Ok(success(SlotView::from(&slot)))
}

pub async fn available_doctors(
    State(state): State<Arc<SlotState>>,
    Query(query): Query<AvailableDoctorsQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.resolver.resolve(&AvailabilityQuery::from(query)).await?;
    Ok(success(doctors))
}

pub async fn generate_slots(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinic_permission(&user, Permission::ManageSchedule, request.clinic_id)?;

    let result = state.generator.generate(&request).await?;
    Ok(success(json!({
        "created": result.created,
        "skipped": result.skipped,
        "slots": to_views(&result.slots),
    })))
}

pub async fn regenerate_future(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegenerationRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinic_permission(&user, Permission::ManageSchedule, request.clinic_id)?;

    let result = state.regeneration.regenerate_future(&request).await?;
    Ok(success(json!({
        "deleted": result.deleted,
        "regenerated": result.regenerated,
        "skipped": result.skipped,
        "slots": to_views(&result.slots),
    })))
}

pub async fn update_slot_status(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
    Json(request): Json<UpdateSlotStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let slot = state.slots.get(slot_id).await?;
    require_clinic_permission(&user, Permission::ManageSchedule, slot.clinic_id)?;

    let updated = state.slots.set_status(slot_id, request.status).await?;
    Ok(success(SlotView::from(&updated)))
}

pub async fn delete_slot(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot = state.slots.get(slot_id).await?;
    require_clinic_permission(&user, Permission::ManageSchedule, slot.clinic_id)?;

    state.slots.delete(slot_id).await?;
    Ok(success(json!({ "deleted": slot_id })))
}
