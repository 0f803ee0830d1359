use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application error taxonomy.
///
/// Provider error bodies and internal detail are logged server-side only;
/// clients always receive a generic message. The enum is `Clone` so a single
/// refresh outcome can fan out to every coalesced waiter.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("authorization state mismatch")]
    StateMismatch,
    #[error("code verifier missing")]
    MissingVerifier,
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("no refresh token in session")]
    NoRefreshToken,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("authentication failed")]
    AuthError,
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        // Network-level failures (connect, timeout, body read) all count as
        // the provider being unreachable; HTTP-status failures are mapped at
        // the call sites where the operation is known.
        Self::ProviderUnavailable(e.to_string())
    }
}

impl AppError {
    /// Short machine-readable kind, used as the `?error=` query value on
    /// callback error redirects.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StateMismatch => "state_mismatch",
            Self::MissingVerifier => "missing_verifier",
            Self::TokenExchangeFailed(_) => "token_exchange_failed",
            Self::NoRefreshToken => "no_refresh_token",
            Self::RefreshFailed(_) => "refresh_failed",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::AuthError => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Internal => "server_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::StateMismatch => {
                tracing::warn!("OAuth state mismatch");
                (StatusCode::BAD_REQUEST, "Authentication failed".to_string())
            }
            Self::MissingVerifier => {
                tracing::warn!("PKCE code verifier missing at exchange time");
                (StatusCode::BAD_REQUEST, "Authentication failed".to_string())
            }
            Self::TokenExchangeFailed(detail) => {
                tracing::error!(detail = %detail, "Token exchange failed");
                (StatusCode::BAD_GATEWAY, "Authentication failed".to_string())
            }
            Self::NoRefreshToken => {
                tracing::debug!("Refresh requested without a refresh token");
                (StatusCode::UNAUTHORIZED, "Please sign in again".to_string())
            }
            Self::RefreshFailed(detail) => {
                tracing::warn!(detail = %detail, "Token refresh failed");
                (StatusCode::UNAUTHORIZED, "Please sign in again".to_string())
            }
            Self::ProviderUnavailable(detail) => {
                tracing::error!(detail = %detail, "Provider unreachable");
                (StatusCode::BAD_GATEWAY, "Service temporarily unavailable".to_string())
            }
            Self::AuthError => {
                tracing::debug!("Authentication failed");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
