use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::time::parse_iso_date;
use shared_utils::extractor::caller_id;

use crate::models::{
    AvailabilityError, CreateAvailabilityBlockRequest, SlotsQuery, UpdateAvailabilityBlockRequest,
};
use crate::services::availability::AvailabilityService;

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let nutritionist_id = caller_id(&user)?;
    let availability_service = AvailabilityService::new(&state);

    let block = availability_service.create_block(nutritionist_id, request, auth.token()).await?;

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn get_my_blocks(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let nutritionist_id = caller_id(&user)?;
    let availability_service = AvailabilityService::new(&state);

    let blocks = availability_service.list_blocks(nutritionist_id, auth.token()).await?;

    Ok(Json(json!(blocks)))
}

#[axum::debug_handler]
pub async fn get_nutritionist_blocks(
    State(state): State<Arc<AppConfig>>,
    Path(nutritionist_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let blocks = availability_service.list_blocks(nutritionist_id, auth.token()).await?;

    Ok(Json(json!(blocks)))
}

/// Bookable `HH:MM` start times for one nutritionist on one date.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let date = parse_iso_date(&query.date)
        .map_err(|e| AvailabilityError::InvalidDate(e.to_string()))?;

    let availability_service = AvailabilityService::new(&state);
    let slots = availability_service
        .get_available_slots(query.nutritionist_id, date, auth.token())
        .await?;

    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn get_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let block = availability_service.get_block(block_id, auth.token()).await?;

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn update_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAvailabilityBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let nutritionist_id = caller_id(&user)?;
    let availability_service = AvailabilityService::new(&state);

    let block = availability_service
        .update_block(block_id, nutritionist_id, request, auth.token())
        .await?;

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let nutritionist_id = caller_id(&user)?;
    let availability_service = AvailabilityService::new(&state);

    availability_service.remove_block(block_id, nutritionist_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability block deactivated"
    })))
}
