use crate::{handlers, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/lists", get(handlers::get_lists).post(handlers::create_list))
        .route("/v1/lists/:id", get(handlers::get_list).delete(handlers::delete_list))
        .route("/v1/lists/:id/items", axum::routing::post(handlers::add_item))
        .route(
            "/v1/lists/:id/items/:index",
            axum::routing::put(handlers::update_item).delete(handlers::remove_item),
        )
}
