use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_database::supabase::SupabaseClient;
use shared_models::time::TimeOfDay;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Fail with `ConflictDetected` when a non-cancelled appointment already
    /// holds the exact (nutritionist, date, start) slot. `exclude_id` skips
    /// the appointment being moved.
    pub async fn ensure_slot_free(
        &self,
        nutritionist_id: i64,
        date: NaiveDate,
        start_time: TimeOfDay,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Checking slot {} {} for nutritionist {}", date, start_time, nutritionist_id);

        let mut path = format!(
            "/rest/v1/appointments?nutritionist_id=eq.{}&date=eq.{}&start_time=eq.{}&status={}&select=id,status",
            nutritionist_id, date, start_time, AppointmentStatus::slot_holding_filter()
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if let Some(row) = existing.first() {
            warn!(
                "Slot {} {} for nutritionist {} already held by appointment {}",
                date, start_time, nutritionist_id, row["id"]
            );
            return Err(AppointmentError::ConflictDetected);
        }

        Ok(())
    }
}
