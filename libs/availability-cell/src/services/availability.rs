use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::UserRole;
use shared_models::time::TimeOfDay;

use crate::models::{
    AvailabilityBlock, AvailabilityError, CreateAvailabilityBlockRequest, DayOfWeek,
    UpdateAvailabilityBlockRequest, DEFAULT_SLOT_DURATION_MINUTES, MAX_SLOT_DURATION_MINUTES,
    MIN_SLOT_DURATION_MINUTES,
};
use crate::services::slots::collect_slots;

const BLOCKS_TABLE: &str = "/rest/v1/availability_blocks";

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create a weekly block owned by `nutritionist_id`.
    pub async fn create_block(
        &self,
        nutritionist_id: i64,
        request: CreateAvailabilityBlockRequest,
        auth_token: &str,
    ) -> Result<AvailabilityBlock, AvailabilityError> {
        debug!("Creating availability block for nutritionist {} on {}", nutritionist_id, request.day_of_week);

        let nutritionist = self.supabase.get_user(nutritionist_id, auth_token).await?
            .ok_or(AvailabilityError::NutritionistNotFound)?;

        if nutritionist.role != UserRole::Nutritionist {
            warn!("User {} with role {} tried to create an availability block", nutritionist_id, nutritionist.role);
            return Err(AvailabilityError::NotNutritionist);
        }

        let slot_duration = request.slot_duration.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES);
        validate_block_fields(request.start_time, request.end_time, slot_duration)?;

        if self.find_active_block(nutritionist_id, request.day_of_week, None, auth_token).await?.is_some() {
            return Err(AvailabilityError::DuplicateDay(request.day_of_week));
        }

        let block_data = json!({
            "nutritionist_id": nutritionist_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time,
            "end_time": request.end_time,
            "slot_duration": slot_duration,
            "is_active": true,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            BLOCKS_TABLE,
            Some(auth_token),
            Some(block_data),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let block = first_row(result)?;
        info!("Availability block {} created for nutritionist {}", block.id, nutritionist_id);
        Ok(block)
    }

    /// Active blocks of a nutritionist, by day then start time.
    pub async fn list_blocks(
        &self,
        nutritionist_id: i64,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityBlock>, AvailabilityError> {
        debug!("Fetching availability blocks for nutritionist {}", nutritionist_id);

        let path = format!(
            "{}?nutritionist_id=eq.{}&is_active=eq.true&order=start_time.asc",
            BLOCKS_TABLE, nutritionist_id
        );
        let mut blocks = self.fetch_blocks(&path, auth_token).await?;
        // The store orders day labels alphabetically; order by weekday here.
        blocks.sort_by_key(|block| (block.day_of_week.week_position(), block.start_time));
        Ok(blocks)
    }

    pub async fn get_block(
        &self,
        block_id: i64,
        auth_token: &str,
    ) -> Result<AvailabilityBlock, AvailabilityError> {
        let path = format!("{}?id=eq.{}", BLOCKS_TABLE, block_id);
        self.fetch_blocks(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AvailabilityError::BlockNotFound)
    }

    /// Apply a partial update. The merged block is validated as a whole, so a
    /// patch touching only one end of the window cannot invert it.
    pub async fn update_block(
        &self,
        block_id: i64,
        nutritionist_id: i64,
        request: UpdateAvailabilityBlockRequest,
        auth_token: &str,
    ) -> Result<AvailabilityBlock, AvailabilityError> {
        debug!("Updating availability block {}", block_id);

        if request.is_empty() {
            return Err(AvailabilityError::EmptyUpdate);
        }

        let current = self.get_block(block_id, auth_token).await?;
        if current.nutritionist_id != nutritionist_id {
            warn!("Nutritionist {} tried to update block {} owned by {}", nutritionist_id, block_id, current.nutritionist_id);
            return Err(AvailabilityError::NotOwner("update"));
        }

        let day_of_week = request.day_of_week.unwrap_or(current.day_of_week);
        let start_time = request.start_time.unwrap_or(current.start_time);
        let end_time = request.end_time.unwrap_or(current.end_time);
        let slot_duration = request.slot_duration.unwrap_or(current.slot_duration);
        let is_active = request.is_active.unwrap_or(current.is_active);

        validate_block_fields(start_time, end_time, slot_duration)?;

        // Only a block entering a day (moved or reactivated) can collide.
        let enters_day = day_of_week != current.day_of_week || !current.is_active;
        if is_active
            && enters_day
            && self.find_active_block(nutritionist_id, day_of_week, Some(block_id), auth_token).await?.is_some()
        {
            return Err(AvailabilityError::DuplicateDay(day_of_week));
        }

        let mut update_data = serde_json::Map::new();
        if let Some(day) = request.day_of_week {
            update_data.insert("day_of_week".to_string(), json!(day));
        }
        if let Some(start) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start));
        }
        if let Some(end) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end));
        }
        if let Some(duration) = request.slot_duration {
            update_data.insert("slot_duration".to_string(), json!(duration));
        }
        if let Some(active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(active));
        }

        let block = self.patch_block(block_id, Value::Object(update_data), auth_token).await?;
        info!("Availability block {} updated", block_id);
        Ok(block)
    }

    /// Soft delete: the row stays so past appointments remain attributable.
    pub async fn remove_block(
        &self,
        block_id: i64,
        nutritionist_id: i64,
        auth_token: &str,
    ) -> Result<(), AvailabilityError> {
        debug!("Deactivating availability block {}", block_id);

        let current = self.get_block(block_id, auth_token).await?;
        if current.nutritionist_id != nutritionist_id {
            warn!("Nutritionist {} tried to delete block {} owned by {}", nutritionist_id, block_id, current.nutritionist_id);
            return Err(AvailabilityError::NotOwner("delete"));
        }

        self.patch_block(block_id, json!({ "is_active": false }), auth_token).await?;
        info!("Availability block {} deactivated", block_id);
        Ok(())
    }

    /// Bookable start times for `date`, ordered and without duplicates.
    /// A weekday with no active block yields an empty list.
    pub async fn get_available_slots(
        &self,
        nutritionist_id: i64,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeOfDay>, AvailabilityError> {
        let day_of_week = DayOfWeek::from_date(date);
        debug!("Calculating slots for nutritionist {} on {} ({})", nutritionist_id, date, day_of_week);

        let path = format!(
            "{}?nutritionist_id=eq.{}&day_of_week=eq.{}&is_active=eq.true",
            BLOCKS_TABLE, nutritionist_id, day_of_week
        );
        let blocks = self.fetch_blocks(&path, auth_token).await?;

        if blocks.is_empty() {
            return Ok(vec![]);
        }

        let slots = collect_slots(&blocks);
        debug!("Found {} slots across {} blocks", slots.len(), blocks.len());
        Ok(slots)
    }

    // Private helper methods

    async fn fetch_blocks(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityBlock>, AvailabilityError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        let blocks = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityBlock>, _>>()?;

        Ok(blocks)
    }

    async fn find_active_block(
        &self,
        nutritionist_id: i64,
        day_of_week: DayOfWeek,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Option<AvailabilityBlock>, AvailabilityError> {
        let mut path = format!(
            "{}?nutritionist_id=eq.{}&day_of_week=eq.{}&is_active=eq.true",
            BLOCKS_TABLE, nutritionist_id, day_of_week
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        Ok(self.fetch_blocks(&path, auth_token).await?.into_iter().next())
    }

    async fn patch_block(
        &self,
        block_id: i64,
        body: Value,
        auth_token: &str,
    ) -> Result<AvailabilityBlock, AvailabilityError> {
        let path = format!("{}?id=eq.{}", BLOCKS_TABLE, block_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        first_row(result)
    }
}

fn validate_block_fields(
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    slot_duration: u32,
) -> Result<(), AvailabilityError> {
    if start_time >= end_time {
        return Err(AvailabilityError::InvalidTimeRange);
    }
    if !(MIN_SLOT_DURATION_MINUTES..=MAX_SLOT_DURATION_MINUTES).contains(&slot_duration) {
        return Err(AvailabilityError::InvalidSlotDuration(slot_duration));
    }
    Ok(())
}

fn first_row(rows: Vec<Value>) -> Result<AvailabilityBlock, AvailabilityError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| AvailabilityError::DatabaseError("Write returned no rows".to_string()))?;
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn t(raw: &str) -> TimeOfDay {
        raw.parse().unwrap()
    }

    #[test]
    fn equal_start_and_end_is_rejected() {
        assert_matches!(
            validate_block_fields(t("08:00"), t("08:00"), 60),
            Err(AvailabilityError::InvalidTimeRange)
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert_matches!(
            validate_block_fields(t("12:00"), t("09:00"), 60),
            Err(AvailabilityError::InvalidTimeRange)
        );
    }

    #[test]
    fn short_slot_duration_is_rejected() {
        assert_matches!(
            validate_block_fields(t("09:00"), t("12:00"), 10),
            Err(AvailabilityError::InvalidSlotDuration(10))
        );
        assert!(validate_block_fields(t("09:00"), t("12:00"), 15).is_ok());
    }

    #[test]
    fn slot_duration_longer_than_a_day_is_rejected() {
        assert!(validate_block_fields(t("00:00"), t("24:00"), 1440).is_ok());
        assert_matches!(
            validate_block_fields(t("09:00"), t("12:00"), 1441),
            Err(AvailabilityError::InvalidSlotDuration(1441))
        );
        assert_matches!(
            validate_block_fields(t("09:00"), t("12:00"), u32::MAX),
            Err(AvailabilityError::InvalidSlotDuration(u32::MAX))
        );
    }
}
