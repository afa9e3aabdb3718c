use std::path::Path;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::state::AppState;
use crate::api;

/// Build the complete axum Router: the update API plus the static file
/// service exposing finished patches.
pub fn build(state: AppState, patch_dir: &Path) -> Router {
    Router::new()
        .merge(api::routes())
        .nest_service("/patches", ServeDir::new(patch_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
