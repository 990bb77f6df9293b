use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    // Every availability operation requires an authenticated caller
    let protected_routes = Router::new()
        .route("/", post(handlers::create_block))
        .route("/my-blocks", get(handlers::get_my_blocks))
        .route("/nutritionist/{nutritionist_id}", get(handlers::get_nutritionist_blocks))
        .route("/slots", get(handlers::get_available_slots))
        .route(
            "/{block_id}",
            get(handlers::get_block)
                .patch(handlers::update_block)
                .delete(handlers::delete_block),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
