use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Named mutations an appointment accepts after creation. There is no
/// generic field patch; every change goes through one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Confirm,
    Complete,
    Cancel,
    Reschedule,
}

impl LifecycleAction {
    pub fn verb(&self) -> &'static str {
        match self {
            LifecycleAction::Confirm => "confirm",
            LifecycleAction::Complete => "complete",
            LifecycleAction::Cancel => "cancel",
            LifecycleAction::Reschedule => "reschedule",
        }
    }
}

#[derive(Debug, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status reached by applying `action` in `current`, or the reason the
    /// transition is refused. CANCELLED and COMPLETED accept nothing.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        action: LifecycleAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        use AppointmentStatus::*;

        let next = match (action, current) {
            (LifecycleAction::Confirm, Pending) => Ok(Confirmed),
            (LifecycleAction::Confirm, _) => Err(AppointmentError::NotPending),
            (LifecycleAction::Complete, Confirmed) => Ok(Completed),
            (LifecycleAction::Complete, _) => Err(AppointmentError::NotConfirmed),
            (LifecycleAction::Cancel, Pending | Confirmed) => Ok(Cancelled),
            (LifecycleAction::Cancel, Cancelled) => Err(AppointmentError::AlreadyCancelled),
            (LifecycleAction::Cancel, Completed) => Err(AppointmentError::CannotCancelCompleted),
            // A moved appointment needs a fresh confirmation.
            (LifecycleAction::Reschedule, Pending | Confirmed) => Ok(Pending),
            (LifecycleAction::Reschedule, status) => Err(AppointmentError::CannotReschedule(status)),
        };

        match &next {
            Ok(status) => debug!("Transition {} -> {} via {}", current, status, action.verb()),
            Err(e) => warn!("Refused {} on {} appointment: {}", action.verb(), current, e),
        }
        next
    }

    /// Confirm and complete belong to the assigned nutritionist. Cancel and
    /// reschedule are open to either participant.
    pub fn authorize_actor(
        &self,
        appointment: &Appointment,
        caller_id: i64,
        action: LifecycleAction,
    ) -> Result<(), AppointmentError> {
        let allowed = match action {
            LifecycleAction::Confirm | LifecycleAction::Complete => {
                appointment.nutritionist_id == caller_id
            }
            LifecycleAction::Cancel | LifecycleAction::Reschedule => {
                appointment.is_participant(caller_id)
            }
        };

        if allowed {
            return Ok(());
        }

        warn!("User {} may not {} appointment {}", caller_id, action.verb(), appointment.id);
        match action {
            LifecycleAction::Confirm | LifecycleAction::Complete => {
                Err(AppointmentError::NotAssigned(action.verb()))
            }
            LifecycleAction::Cancel | LifecycleAction::Reschedule => {
                Err(AppointmentError::NotParticipant(action.verb()))
            }
        }
    }
}
