use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use availability_cell::AvailabilityService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::UserRole;
use shared_models::time::{parse_iso_date, TimeOfDay};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::{AppointmentLifecycleService, LifecycleAction};

const APPOINTMENTS_TABLE: &str = "/rest/v1/appointments";
const PATIENT_EMBED: &str = "patient:users!patient_id(id,fullname,username,email,role,avatar_url)";
const NUTRITIONIST_EMBED: &str = "nutritionist:users!nutritionist_id(id,fullname,username,email,role,avatar_url)";
const MOST_RECENT_FIRST: &str = "order=date.desc,start_time.desc";

/// A validated (date, start, end) triple ready to be written.
#[derive(Debug, Clone, Copy)]
struct ResolvedSlot {
    date: NaiveDate,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    availability_service: AvailabilityService,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    duration_minutes: u32,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&supabase)),
            availability_service: AvailabilityService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
            duration_minutes: config.appointment_duration_minutes,
            supabase,
        }
    }

    /// Book a PENDING appointment for `patient_id`. Each check short-circuits:
    /// nutritionist exists and has the right role, the start time is one of
    /// the day's generated slots, the end time fits in the day, and no
    /// non-cancelled appointment already holds the slot.
    pub async fn book_appointment(
        &self,
        patient_id: i64,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for patient {} with nutritionist {}", patient_id, request.nutritionist_id);

        if request.nutritionist_id == patient_id {
            return Err(AppointmentError::SelfBooking);
        }

        let nutritionist = self.supabase.get_user(request.nutritionist_id, auth_token).await?
            .ok_or(AppointmentError::NutritionistNotFound)?;

        if nutritionist.role != UserRole::Nutritionist {
            warn!("User {} is {}, not a nutritionist", nutritionist.id, nutritionist.role);
            return Err(AppointmentError::NotNutritionist);
        }

        let slot = self.resolve_slot(
            request.nutritionist_id,
            &request.date,
            &request.start_time,
            None,
            auth_token,
        ).await?;

        let appointment_data = json!({
            "patient_id": patient_id,
            "nutritionist_id": request.nutritionist_id,
            "date": slot.date,
            "start_time": slot.start_time,
            "end_time": slot.end_time,
            "status": AppointmentStatus::Pending,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS_TABLE,
            Some(auth_token),
            Some(appointment_data),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let appointment = first_row(result)?;
        info!(
            "Appointment {} booked: patient {} with nutritionist {} on {} at {}",
            appointment.id, patient_id, request.nutritionist_id, slot.date, slot.start_time
        );
        Ok(appointment)
    }

    /// Every appointment with both participants attached.
    pub async fn list_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?select=*,{},{}&{}",
            APPOINTMENTS_TABLE, PATIENT_EMBED, NUTRITIONIST_EMBED, MOST_RECENT_FIRST
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// A patient's appointments with the nutritionist attached.
    pub async fn list_patient_appointments(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?patient_id=eq.{}&select=*,{}&{}",
            APPOINTMENTS_TABLE, patient_id, NUTRITIONIST_EMBED, MOST_RECENT_FIRST
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// A nutritionist's appointments with the patient attached.
    pub async fn list_nutritionist_appointments(
        &self,
        nutritionist_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?nutritionist_id=eq.{}&select=*,{}&{}",
            APPOINTMENTS_TABLE, nutritionist_id, PATIENT_EMBED, MOST_RECENT_FIRST
        );
        self.fetch_appointments(&path, auth_token).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "{}?id=eq.{}&select=*,{},{}",
            APPOINTMENTS_TABLE, appointment_id, PATIENT_EMBED, NUTRITIONIST_EMBED
        );
        self.fetch_appointments(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    /// Fetch an appointment as `viewer_id` sees it. Non-admins only match rows
    /// they take part in, so an existing but foreign id is `NotFound` too.
    pub async fn get_visible_appointment(
        &self,
        appointment_id: i64,
        viewer_id: i64,
        is_admin: bool,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if is_admin {
            return self.get_appointment(appointment_id, auth_token).await;
        }

        let path = format!(
            "{}?id=eq.{}&or=(patient_id.eq.{},nutritionist_id.eq.{})&select=*,{},{}",
            APPOINTMENTS_TABLE, appointment_id, viewer_id, viewer_id, PATIENT_EMBED, NUTRITIONIST_EMBED
        );
        self.fetch_appointments(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn confirm_appointment(
        &self,
        appointment_id: i64,
        caller_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.apply_transition(appointment_id, caller_id, LifecycleAction::Confirm, auth_token).await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: i64,
        caller_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.apply_transition(appointment_id, caller_id, LifecycleAction::Complete, auth_token).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        caller_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.apply_transition(appointment_id, caller_id, LifecycleAction::Cancel, auth_token).await
    }

    /// Move an appointment to another slot of the same nutritionist. The new
    /// slot is validated like a fresh booking and the status returns to PENDING.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        caller_id: i64,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment {} to {} {}", appointment_id, request.date, request.start_time);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.authorize_actor(&current, caller_id, LifecycleAction::Reschedule)?;
        let next_status = self.lifecycle_service
            .validate_status_transition(current.status, LifecycleAction::Reschedule)?;

        let slot = self.resolve_slot(
            current.nutritionist_id,
            &request.date,
            &request.start_time,
            Some(appointment_id),
            auth_token,
        ).await?;

        let update_data = json!({
            "date": slot.date,
            "start_time": slot.start_time,
            "end_time": slot.end_time,
            "status": next_status,
        });

        let appointment = self.patch_appointment(appointment_id, update_data, auth_token).await?;
        info!("Appointment {} moved to {} at {}", appointment_id, slot.date, slot.start_time);
        Ok(appointment)
    }

    /// Hard delete. Callers gate this to administrators.
    pub async fn remove_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        let path = format!("{}?id=eq.{}", APPOINTMENTS_TABLE, current.id);
        let _: Value = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    // Private helper methods

    async fn apply_transition(
        &self,
        appointment_id: i64,
        caller_id: i64,
        action: LifecycleAction,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        self.lifecycle_service.authorize_actor(&current, caller_id, action)?;
        let next_status = self.lifecycle_service.validate_status_transition(current.status, action)?;

        let appointment = self.patch_appointment(
            appointment_id,
            json!({ "status": next_status }),
            auth_token,
        ).await?;

        info!("Appointment {} is now {} ({} by user {})", appointment_id, next_status, action.verb(), caller_id);
        Ok(appointment)
    }

    async fn resolve_slot(
        &self,
        nutritionist_id: i64,
        raw_date: &str,
        raw_start: &str,
        exclude_id: Option<i64>,
        auth_token: &str,
    ) -> Result<ResolvedSlot, AppointmentError> {
        let date = parse_iso_date(raw_date)
            .map_err(|e| AppointmentError::InvalidDate(e.to_string()))?;
        let start_time = raw_start
            .parse::<TimeOfDay>()
            .map_err(|e| AppointmentError::InvalidTime(e.to_string()))?;

        let slots = self.availability_service
            .get_available_slots(nutritionist_id, date, auth_token)
            .await?;
        if !slots.contains(&start_time) {
            warn!("{} is not an open slot for nutritionist {} on {}", start_time, nutritionist_id, date);
            return Err(AppointmentError::SlotNotAvailable);
        }

        let end_time = start_time
            .checked_add_minutes(self.duration_minutes)
            .ok_or(AppointmentError::EndsAfterMidnight)?;

        self.conflict_service
            .ensure_slot_free(nutritionist_id, date, start_time, exclude_id, auth_token)
            .await?;

        Ok(ResolvedSlot { date, start_time, end_time })
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        let appointments = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()?;

        debug!("Fetched {} appointments", appointments.len());
        Ok(appointments)
    }

    async fn patch_appointment(
        &self,
        appointment_id: i64,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_TABLE, appointment_id);
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

fn first_row(rows: Vec<Value>) -> Result<Appointment, AppointmentError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppointmentError::DatabaseError("Write returned no rows".to_string()))?;
    Ok(serde_json::from_value(row)?)
}
