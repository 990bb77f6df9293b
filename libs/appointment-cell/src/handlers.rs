use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::extractor::{caller_id, require_role};

use crate::models::{AppointmentError, CreateAppointmentRequest, RescheduleAppointmentRequest};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, UserRole::Patient)
        .map_err(|_| AppError::from(AppointmentError::PatientOnly))?;
    let patient_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.book_appointment(patient_id, request, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_all_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, UserRole::Admin)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.list_appointments(auth.token()).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service.list_patient_appointments(patient_id, auth.token()).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_nutritionist_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(nutritionist_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // A nutritionist's book is visible to that nutritionist and to admins
    if caller_id(&user)? != nutritionist_id && !user.is_admin() {
        return Err(AppointmentError::NotAssigned("view").into());
    }

    let booking_service = AppointmentBookingService::new(&state);
    let appointments = booking_service
        .list_nutritionist_appointments(nutritionist_id, auth.token())
        .await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let viewer_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .get_visible_appointment(appointment_id, viewer_id, user.is_admin(), auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.confirm_appointment(appointment_id, user_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.complete_appointment(appointment_id, user_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.cancel_appointment(appointment_id, user_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .reschedule_appointment(appointment_id, user_id, request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, UserRole::Admin)?;

    let booking_service = AppointmentBookingService::new(&state);
    booking_service.remove_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}
