use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use availability_cell::router::availability_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Nutri Clinic API is running!" }))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    async fn status_of(uri: &str) -> StatusCode {
        let app = create_router(TestConfig::default().to_arc());
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        assert_eq!(status_of("/").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn cell_routes_require_a_token() {
        assert_eq!(status_of("/availability/my-blocks").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/appointments/my-appointments").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        assert_eq!(status_of("/patients").await, StatusCode::NOT_FOUND);
    }
}
