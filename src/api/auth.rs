use crate::api::cookies;
use crate::api::schemas::auth::{
    CallbackBody, CallbackResponse, CheckResponse, LogoutResponse, RefreshResponse,
};
use crate::api::AppState;
use crate::domain::token::TokenSet;
use crate::error::AppError;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

/// Starts the authorization flow: generates PKCE material, stores the
/// state -> verifier pairing server-side, and redirects the browser to the
/// provider's consent page. Any credentials left over from a previous
/// session are cleared so the callback starts from a clean slate.
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let login = state.auth_service.begin_login().await;
    let (state_cookie, verifier_cookie) = cookies::pkce_cookies(
        &login.state,
        &login.verifier,
        state.config.session.login_state_ttl_secs,
        state.config.session.secure_cookies,
    );
    let jar = cookies::clear_credential_cookies(jar)
        .add(state_cookie)
        .add(verifier_cookie);

    info!(state = %login.state, "login initiated");
    (jar, Redirect::to(&login.url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Browser-facing half of the flow: the provider redirects here with either
/// an authorization code or an error. Outcomes are communicated by redirect,
/// never by response body, since the user agent is a browser mid-navigation.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = &params.error {
        warn!(%error, "provider rejected the authorization request");
        return error_redirect(&state, "access_denied", cookies::clear_pkce_cookies(jar));
    }
    let (Some(code), Some(returned_state)) = (params.code, params.state) else {
        return error_redirect(&state, "bad_request", cookies::clear_pkce_cookies(jar));
    };

    match complete_login(&state, jar, &code, &returned_state).await {
        Ok(jar) => {
            let jar = cookies::clear_pkce_cookies(jar);
            (jar, Redirect::to(&state.config.session.login_redirect)).into_response()
        }
        Err((jar, err)) => error_redirect(&state, err.kind(), jar),
    }
}

/// JSON variant of the callback for frontends that intercept the provider
/// redirect themselves and finish the exchange over fetch.
pub async fn callback_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CallbackBody>,
) -> Response {
    match complete_login(&state, jar, &body.code, &body.state).await {
        Ok(jar) => {
            let jar = cookies::clear_pkce_cookies(jar);
            (jar, Json(CallbackResponse { success: true })).into_response()
        }
        Err((jar, err)) => (jar, err).into_response(),
    }
}

/// Exchanges the refresh-token cookie for a fresh access token. Both success
/// and failure rewrite the session cookies: success installs the new tokens,
/// failure tears the session down so the client re-authenticates instead of
/// retrying a dead refresh token.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let refresh_token = jar
        .get(cookies::REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string());
    let Some(refresh_token) = refresh_token else {
        let jar = cookies::clear_all_cookies(jar);
        return (jar, AppError::NoRefreshToken).into_response();
    };

    match state.auth_service.refresh(refresh_token).await {
        Ok(tokens) => {
            let body = RefreshResponse {
                expires_in: tokens.expires_in_secs,
                expires_at: tokens.expires_at.unix_timestamp(),
            };
            let jar = install_session(&state, jar, &tokens);
            (jar, Json(body)).into_response()
        }
        Err(err) => {
            // A provider outage mid-refresh is indistinguishable from a dead
            // token from the client's point of view: the session is gone
            // either way and a new login is the recovery path.
            let err = match err {
                AppError::ProviderUnavailable(detail) => AppError::RefreshFailed(detail),
                other => other,
            };
            let jar = cookies::clear_all_cookies(jar);
            (jar, err).into_response()
        }
    }
}

/// Clears all five session cookies. Idempotent: logging out twice is fine.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = cookies::clear_all_cookies(jar);
    (jar, Json(LogoutResponse { success: true }))
}

/// Cheap session probe for frontends: reports cookie presence without
/// calling the provider, so an expired-but-present token still reads as
/// authenticated until a real request fails.
pub async fn check(jar: CookieJar) -> Json<CheckResponse> {
    Json(CheckResponse {
        authenticated: jar.get(cookies::ACCESS_TOKEN_COOKIE).is_some(),
    })
}

async fn complete_login(
    state: &AppState,
    jar: CookieJar,
    code: &str,
    returned_state: &str,
) -> Result<CookieJar, (CookieJar, AppError)> {
    let cookie_state = cookies::auth_state(&jar);
    let cookie_verifier = cookies::code_verifier(&jar);

    match state
        .auth_service
        .exchange_code(
            code,
            returned_state,
            cookie_state.as_deref(),
            cookie_verifier.as_deref(),
        )
        .await
    {
        Ok(tokens) => Ok(install_session(state, jar, &tokens)),
        Err(err) => Err((cookies::clear_pkce_cookies(jar), err)),
    }
}

fn install_session(state: &AppState, jar: CookieJar, tokens: &TokenSet) -> CookieJar {
    cookies::apply_token_set(
        jar,
        tokens,
        state.config.session.refresh_token_ttl_days,
        state.config.session.secure_cookies,
    )
}

fn error_redirect(state: &AppState, kind: &str, jar: CookieJar) -> Response {
    let target = format!("{}?error={kind}", state.config.session.error_redirect);
    (jar, Redirect::to(&target)).into_response()
}
