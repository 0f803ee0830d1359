use crate::config::SpotifyConfig;
use crate::domain::auth_session::AuthSession;
use crate::domain::token::TokenSet;
use crate::error::{AppError, Result};
use crate::services::AuthService;
use axum::http::StatusCode;
use std::time::Duration;

/// Result of a proxied resource call: the upstream status and body, plus the
/// rotated credentials when a mid-request refresh happened (the handler must
/// write them back into the session cookies).
#[derive(Debug)]
pub struct ProxyOutcome {
    pub status: StatusCode,
    pub body: serde_json::Value,
    pub rotated: Option<TokenSet>,
}

/// Proxy to the provider's resource API with the refresh-and-retry
/// discipline: a 401 from the resource triggers exactly one coalesced
/// refresh, the original request is retried once with the new token, and a
/// renewed 401 propagates after the caller's session is cleared.
#[derive(Clone, Debug)]
pub struct SpotifyService {
    config: SpotifyConfig,
    http: reqwest::Client,
    auth_service: AuthService,
}

impl SpotifyService {
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: SpotifyConfig, auth_service: AuthService) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|_| AppError::Internal)?;

        Ok(Self { config, http, auth_service })
    }

    /// GETs a resource path on behalf of the session.
    #[tracing::instrument(skip(self, session), err(level = "debug"))]
    pub async fn get(&self, path: &str, session: &AuthSession) -> Result<ProxyOutcome> {
        let access_token = session.access_token.as_deref().ok_or(AppError::AuthError)?;

        let first = self.fetch(path, access_token).await?;
        if first.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(Self::outcome(first, None).await);
        }

        // One refresh attempt, coalesced with any concurrent ones. A timeout
        // or network failure here is a refresh failure, not a proxy failure:
        // the session is terminal either way and the caller must clear it.
        let refresh_token = session.refresh_token.clone().ok_or(AppError::NoRefreshToken)?;
        let tokens = self.auth_service.refresh(refresh_token).await.map_err(|err| match err {
            AppError::ProviderUnavailable(detail) => AppError::RefreshFailed(detail),
            other => other,
        })?;

        let retry = self.fetch(path, &tokens.access_token).await?;
        if retry.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %path, "resource still unauthorized after refresh");
            return Err(AppError::AuthError);
        }

        Ok(Self::outcome(retry, Some(tokens)).await)
    }

    async fn fetch(&self, path: &str, access_token: &str) -> Result<reqwest::Response> {
        if path.split('/').any(|segment| segment == "..") || path.contains("://") {
            return Err(AppError::BadRequest("invalid resource path".into()));
        }

        // Url::join would drop the base's last segment for a base without a
        // trailing slash, so the URL is assembled textually.
        let base = self.config.api_base_url.as_str().trim_end_matches('/');
        let url = format!("{base}/{}", path.trim_start_matches('/'));

        Ok(self.http.get(url).bearer_auth(access_token).send().await?)
    }

    async fn outcome(response: reqwest::Response, rotated: Option<TokenSet>) -> ProxyOutcome {
        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        ProxyOutcome { status, body, rotated }
    }
}
