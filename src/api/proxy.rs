use crate::api::cookies;
use crate::api::AppState;
use crate::error::AppError;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

/// Current-user shortcut, the endpoint the frontend hits on every page load.
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Response {
    proxy_get(state, jar, "me").await
}

/// Generic read-only passthrough for the rest of the provider's API surface.
pub async fn passthrough(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(path): Path<String>,
) -> Response {
    proxy_get(state, jar, &path).await
}

/// Forwards a GET to the provider with the session's access token. When the
/// underlying call rotated tokens, the fresh set is written back into the
/// jar so the browser picks it up transparently. Terminal auth failures
/// clear the session cookies so the client falls back to login rather than
/// looping on a dead token.
async fn proxy_get(state: AppState, jar: CookieJar, path: &str) -> Response {
    let session = cookies::session_from_jar(&jar);

    match state.spotify_service.get(path, &session).await {
        Ok(outcome) => {
            let jar = match &outcome.rotated {
                Some(tokens) => cookies::apply_token_set(
                    jar,
                    tokens,
                    state.config.session.refresh_token_ttl_days,
                    state.config.session.secure_cookies,
                ),
                None => jar,
            };
            (outcome.status, jar, Json(outcome.body)).into_response()
        }
        Err(
            err @ (AppError::AuthError | AppError::NoRefreshToken | AppError::RefreshFailed(_)),
        ) => {
            let jar = cookies::clear_all_cookies(jar);
            (jar, err).into_response()
        }
        Err(err) => err.into_response(),
    }
}
