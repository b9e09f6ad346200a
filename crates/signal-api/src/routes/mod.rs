//! Route table

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Build the admin API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/rooms", post(handlers::create_room))
        .route(
            "/rooms/:room_id",
            get(handlers::get_room).delete(handlers::delete_room),
        )
        .route("/rooms/:room_id/rules", axum::routing::patch(handlers::update_rules))
}
