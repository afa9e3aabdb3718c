pub mod types;
pub mod update;

use axum::routing::post;
use axum::Router;

use crate::server::state::AppState;

/// Build the update API routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/update",
        post(update::handler).fallback(update::method_not_found),
    )
}
