//! `POST /update`: the client-facing update check.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::UpdateQuery;
use crate::error::UpdateError;
use crate::server::state::AppState;

/// Resolve an update query.
///
/// Status contract: 200 with a JSON body on a resolved update, 204 when
/// the client is current, 400 on a malformed body, 417 on any other
/// resolver error.
pub async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateQuery>, JsonRejection>,
) -> Response {
    let Json(query) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            tracing::debug!(%rejection, "rejecting malformed update query");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    match state.resolver.check_for_update(query).await {
        Ok(mut response) => {
            // Hand out an absolute patch URL; the resolver only knows the
            // file name relative to the patch directory.
            if let Some(file_name) = response.patch_url.take() {
                response.patch_url = Some(format!(
                    "{}/patches/{file_name}",
                    state.config.public_url.trim_end_matches('/')
                ));
            }
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err @ UpdateError::NoUpdateAvailable) => err.into(),
        Err(err) => {
            tracing::warn!(%err, "update check failed");
            err.into()
        }
    }
}

/// Anything but POST on the update endpoint.
pub async fn method_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
