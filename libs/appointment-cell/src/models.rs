use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use availability_cell::AvailabilityError;
use shared_database::ApiError;
use shared_models::auth::UserProfile;
use shared_models::time::TimeOfDay;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    /// Every status except CANCELLED keeps its slot occupied.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// PostgREST `in.(...)` filter matching the statuses that hold a slot.
    pub fn slot_holding_filter() -> String {
        let labels: Vec<&str> = Self::ALL
            .iter()
            .filter(|status| status.holds_slot())
            .map(AppointmentStatus::as_str)
            .collect();
        format!("in.({})", labels.join(","))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked consultation. `end_time` is always derived from `start_time`
/// and the configured consultation length; clients never send it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub nutritionist_id: i64,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: AppointmentStatus,
    pub created_at: Option<DateTime<Utc>>,
    // Counterpart users embedded by listing queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutritionist: Option<UserProfile>,
}

impl Appointment {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.patient_id == user_id || self.nutritionist_id == user_id
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(alias = "nutritionistId")]
    pub nutritionist_id: i64,
    pub date: String,
    #[serde(alias = "startTime")]
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: String,
    #[serde(alias = "startTime")]
    pub start_time: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Nutritionist not found")]
    NutritionistNotFound,

    #[error("Selected user is not a nutritionist")]
    NotNutritionist,

    #[error("Only patients can book appointments")]
    PatientOnly,

    #[error("You cannot book an appointment with yourself")]
    SelfBooking,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Selected time slot is not available for this nutritionist")]
    SlotNotAvailable,

    #[error("Appointment must end by midnight")]
    EndsAfterMidnight,

    #[error("This time slot is already booked")]
    ConflictDetected,

    #[error("You can only {0} appointments assigned to you")]
    NotAssigned(&'static str),

    #[error("You can only {0} your own appointments")]
    NotParticipant(&'static str),

    #[error("Only pending appointments can be confirmed")]
    NotPending,

    #[error("Only confirmed appointments can be completed")]
    NotConfirmed,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel a completed appointment")]
    CannotCancelCompleted,

    #[error("Cannot reschedule a {0} appointment")]
    CannotReschedule(AppointmentStatus),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        // The partial unique index on non-cancelled slots answers with 409.
        match err.downcast_ref::<ApiError>() {
            Some(api) if api.is_conflict() => AppointmentError::ConflictDetected,
            _ => AppointmentError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppointmentError {
    fn from(err: serde_json::Error) -> Self {
        AppointmentError::DatabaseError(format!("Unexpected row shape: {}", err))
    }
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::error::AppError;

        let message = err.to_string();
        match err {
            AppointmentError::NotFound | AppointmentError::NutritionistNotFound => {
                AppError::NotFound(message)
            }
            AppointmentError::PatientOnly
            | AppointmentError::NotAssigned(_)
            | AppointmentError::NotParticipant(_) => AppError::Forbidden(message),
            AppointmentError::ConflictDetected => AppError::Conflict(message),
            AppointmentError::Availability(inner) => AppError::from(inner),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
            AppointmentError::NotNutritionist
            | AppointmentError::SelfBooking
            | AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::SlotNotAvailable
            | AppointmentError::EndsAfterMidnight
            | AppointmentError::NotPending
            | AppointmentError::NotConfirmed
            | AppointmentError::AlreadyCancelled
            | AppointmentError::CannotCancelCompleted
            | AppointmentError::CannotReschedule(_) => AppError::BadRequest(message),
        }
    }
}
