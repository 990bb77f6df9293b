use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication. Mutations are the
    // named lifecycle actions only; there is no generic field patch.
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::get_all_appointments))
        .route("/my-appointments", get(handlers::get_my_appointments))
        .route("/nutritionist/{nutritionist_id}", get(handlers::get_nutritionist_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/confirm", patch(handlers::confirm_appointment))
        .route("/{appointment_id}/complete", patch(handlers::complete_appointment))
        .route("/{appointment_id}/cancel", patch(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
