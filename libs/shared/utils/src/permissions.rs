use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CLINIC_ADMIN: &str = "clinic_admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_PATIENT: &str = "patient";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Generate, regenerate and edit slots and clinic timetables.
    ManageSchedule,
    /// Book or cancel appointments on behalf of any patient.
    ManageBookings,
}

/// Capability check run by handlers before calling into the scheduling core.
pub fn has_clinic_permission(user: &User, permission: Permission, clinic_id: Uuid) -> bool {
    if user.has_role(ROLE_ADMIN) {
        return true;
    }

    let staff_role = match permission {
        Permission::ManageSchedule => {
            user.has_role(ROLE_CLINIC_ADMIN) || user.has_role(ROLE_STAFF)
        }
        Permission::ManageBookings => {
            user.has_role(ROLE_CLINIC_ADMIN) || user.has_role(ROLE_STAFF) || user.has_role(ROLE_DOCTOR)
        }
    };

    staff_role && user.clinic_ids().contains(&clinic_id)
}

pub fn require_clinic_permission(user: &User, permission: Permission, clinic_id: Uuid) -> Result<(), AppError> {
    if has_clinic_permission(user, permission, clinic_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "{:?} permission required for clinic {}",
            permission, clinic_id
        )))
    }
}

/// Doctors may edit their own timetable; admins and clinic admins may edit any.
pub fn require_doctor_schedule_access(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    if user.has_role(ROLE_ADMIN) || user.has_role(ROLE_CLINIC_ADMIN) || user.user_uuid() == Some(doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "ManageSchedule permission required for doctor {}",
            doctor_id
        )))
    }
}
