use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::time::TimeOfDay;

pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 60;
pub const MIN_SLOT_DURATION_MINUTES: u32 = 15;
pub const MAX_SLOT_DURATION_MINUTES: u32 = shared_models::time::MINUTES_PER_DAY;

// ==============================================================================
// CORE AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    /// Indexed 0 = Sunday through 6 = Saturday.
    pub const SUNDAY_FIRST: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        Self::SUNDAY_FIRST[date.weekday().num_days_from_sunday() as usize]
    }

    /// Position in a Monday-first week. Listings sort by this, never by label.
    pub fn week_position(&self) -> u8 {
        match self {
            DayOfWeek::Monday => 0,
            DayOfWeek::Tuesday => 1,
            DayOfWeek::Wednesday => 2,
            DayOfWeek::Thursday => 3,
            DayOfWeek::Friday => 4,
            DayOfWeek::Saturday => 5,
            DayOfWeek::Sunday => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "SUNDAY",
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring weekly window in which a nutritionist accepts bookings.
/// Rows are never deleted; `is_active = false` retires them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    pub id: i64,
    pub nutritionist_id: i64,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub slot_duration: u32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityBlockRequest {
    #[serde(alias = "dayOfWeek")]
    pub day_of_week: DayOfWeek,
    #[serde(alias = "startTime")]
    pub start_time: TimeOfDay,
    #[serde(alias = "endTime")]
    pub end_time: TimeOfDay,
    #[serde(default, alias = "slotDuration")]
    pub slot_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAvailabilityBlockRequest {
    #[serde(default, alias = "dayOfWeek")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, alias = "endTime")]
    pub end_time: Option<TimeOfDay>,
    #[serde(default, alias = "slotDuration")]
    pub slot_duration: Option<u32>,
    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

impl UpdateAvailabilityBlockRequest {
    pub fn is_empty(&self) -> bool {
        self.day_of_week.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.slot_duration.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsQuery {
    #[serde(alias = "nutritionistId")]
    pub nutritionist_id: i64,
    pub date: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Nutritionist not found")]
    NutritionistNotFound,

    #[error("Availability block not found")]
    BlockNotFound,

    #[error("Only nutritionists can create availability blocks")]
    NotNutritionist,

    #[error("You can only {0} your own availability blocks")]
    NotOwner(&'static str),

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Slot duration must be between 15 and 1440 minutes, got {0}")]
    InvalidSlotDuration(u32),

    #[error("Availability block already exists for {0}")]
    DuplicateDay(DayOfWeek),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("No fields to update")]
    EmptyUpdate,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AvailabilityError {
    fn from(err: anyhow::Error) -> Self {
        AvailabilityError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AvailabilityError {
    fn from(err: serde_json::Error) -> Self {
        AvailabilityError::DatabaseError(format!("Unexpected row shape: {}", err))
    }
}

impl From<AvailabilityError> for shared_models::error::AppError {
    fn from(err: AvailabilityError) -> Self {
        use shared_models::error::AppError;

        let message = err.to_string();
        match err {
            AvailabilityError::NutritionistNotFound | AvailabilityError::BlockNotFound => {
                AppError::NotFound(message)
            }
            AvailabilityError::NotNutritionist | AvailabilityError::NotOwner(_) => {
                AppError::Forbidden(message)
            }
            AvailabilityError::InvalidTimeRange
            | AvailabilityError::InvalidSlotDuration(_)
            | AvailabilityError::DuplicateDay(_)
            | AvailabilityError::InvalidDate(_)
            | AvailabilityError::EmptyUpdate => AppError::BadRequest(message),
            AvailabilityError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
