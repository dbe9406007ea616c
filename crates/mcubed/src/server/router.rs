//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", any(handlers::missing_table))
        .route(
            "/:table",
            get(handlers::list)
                .post(handlers::create)
                .put(handlers::update_many)
                .patch(handlers::update_many)
                .delete(handlers::remove_many),
        )
        .route(
            "/:table/:id",
            get(handlers::get_one)
                .put(handlers::update_one)
                .patch(handlers::update_one)
                .delete(handlers::remove_one),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
