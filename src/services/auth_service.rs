use crate::config::{SessionConfig, SpotifyConfig};
use crate::domain::pkce::PkceChallenge;
use crate::domain::token::{TokenResponse, TokenSet};
use crate::error::{AppError, Result};
use crate::storage::SharedSessionStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Authorization redirect handed to the login handler: the provider URL plus
/// the PKCE material the cookie layer persists alongside the server record.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
    pub verifier: String,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenSet>>>;

/// In-flight refresh registry keyed by a fingerprint of the refresh token.
///
/// The first caller for a given token inserts a shared future and drives it;
/// concurrent callers await a clone of the same future, so the provider sees
/// exactly one refresh per expiring token.
#[derive(Default)]
struct RefreshGate {
    in_flight: DashMap<String, RefreshFuture>,
}

impl fmt::Debug for RefreshGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshGate").field("in_flight", &self.in_flight.len()).finish()
    }
}

/// OAuth2 PKCE token lifecycle: authorization URL, code exchange and
/// coalesced token refresh against the provider token endpoint.
#[derive(Clone, Debug)]
pub struct AuthService {
    spotify: SpotifyConfig,
    session: SessionConfig,
    http: reqwest::Client,
    login_states: SharedSessionStore,
    refresh_gate: Arc<RefreshGate>,
}

impl AuthService {
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(
        spotify: SpotifyConfig,
        session: SessionConfig,
        login_states: SharedSessionStore,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(spotify.request_timeout_secs))
            .build()
            .map_err(|_| AppError::Internal)?;

        Ok(Self {
            spotify,
            session,
            http,
            login_states,
            refresh_gate: Arc::new(RefreshGate::default()),
        })
    }

    /// Starts a login attempt: generates the PKCE triple, persists the
    /// one-time `state → verifier` record and builds the authorization URL.
    #[tracing::instrument(skip(self), fields(state = tracing::field::Empty))]
    pub async fn begin_login(&self) -> LoginRedirect {
        let pkce = PkceChallenge::generate(self.spotify.verifier_length);
        tracing::Span::current().record("state", tracing::field::display(&pkce.state));

        self.login_states
            .set(
                &pkce.state,
                pkce.verifier.clone(),
                Duration::from_secs(self.session.login_state_ttl_secs),
            )
            .await;

        let mut url = self.spotify.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.spotify.client_id)
            .append_pair("redirect_uri", &self.spotify.redirect_uri)
            .append_pair("state", &pkce.state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", PkceChallenge::method())
            .append_pair("scope", &self.spotify.scopes);

        tracing::debug!("login attempt started");
        LoginRedirect { url: url.into(), state: pkce.state, verifier: pkce.verifier }
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// Preconditions are checked in order and each failure is distinct:
    /// 1. the state cookie must exist and equal the returned state, else
    ///    [`AppError::StateMismatch`] (the token endpoint is never called);
    /// 2. a verifier must exist (the consumed one-time server record, with
    ///    the verifier cookie as fallback for multi-replica deployments),
    ///    else [`AppError::MissingVerifier`].
    #[tracing::instrument(skip_all, err(level = "warn"))]
    pub async fn exchange_code(
        &self,
        code: &str,
        returned_state: &str,
        cookie_state: Option<&str>,
        cookie_verifier: Option<&str>,
    ) -> Result<TokenSet> {
        match cookie_state {
            Some(stored) if stored == returned_state => {}
            _ => return Err(AppError::StateMismatch),
        }

        // Consume the one-time record regardless of the outcome below, so a
        // replayed code can never reuse it.
        let stored_verifier = self.login_states.delete(returned_state).await;
        let verifier = stored_verifier
            .or_else(|| cookie_verifier.map(ToOwned::to_owned))
            .ok_or(AppError::MissingVerifier)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.spotify.redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];

        let response = Self::token_request(&self.http, &self.spotify, &params).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "provider rejected code exchange");
            return Err(AppError::TokenExchangeFailed(format!("provider status {status}")));
        }

        let token_response: TokenResponse = response.json().await?;
        tracing::info!("code exchange succeeded");
        Ok(TokenSet::from_response(token_response, None))
    }

    /// Refreshes an access token, coalescing concurrent callers.
    ///
    /// Any failure, provider rejection or timeout alike, is terminal for the
    /// session; callers clear their credentials and restart the login flow.
    /// There is no retry against the provider.
    pub async fn refresh(&self, refresh_token: String) -> Result<TokenSet> {
        let key = fingerprint(&refresh_token);

        let fut = match self.refresh_gate.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                tracing::debug!("joining in-flight refresh");
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                let http = self.http.clone();
                let spotify = self.spotify.clone();
                let fut: RefreshFuture =
                    async move { do_refresh(http, spotify, refresh_token).await }.boxed().shared();
                vacant.insert(fut.clone());
                fut
            }
        };

        let result = fut.clone().await;
        // Remove the entry only if it still holds the future we awaited; a
        // straggler from a completed wave must not evict a newer in-flight
        // refresh for the same token.
        self.refresh_gate.in_flight.remove_if(&key, |_, in_flight| fut.ptr_eq(in_flight));
        result
    }

    /// POSTs to the token endpoint with the configured client-credential
    /// mode: HTTP Basic when a client secret is present (confidential
    /// client), `client_id` in the body otherwise (public PKCE client).
    async fn token_request(
        http: &reqwest::Client,
        spotify: &SpotifyConfig,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let mut form: Vec<(&str, &str)> = params.to_vec();

        let request = http.post(spotify.token_url.clone());
        let request = if let Some(secret) = &spotify.client_secret {
            request.basic_auth(&spotify.client_id, Some(secret))
        } else {
            form.push(("client_id", spotify.client_id.as_str()));
            request
        };

        Ok(request.form(&form).send().await?)
    }
}

async fn do_refresh(
    http: reqwest::Client,
    spotify: SpotifyConfig,
    refresh_token: String,
) -> Result<TokenSet> {
    let params = [("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())];

    let response = AuthService::token_request(&http, &spotify, &params).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "provider rejected token refresh");
        return Err(AppError::RefreshFailed(format!("provider status {status}")));
    }

    let token_response: TokenResponse = response.json().await?;
    let tokens = TokenSet::from_response(token_response, Some(&refresh_token));
    tracing::info!(rotated_refresh = tokens.rotated_refresh_token(Some(&refresh_token)), "access token rotated");
    Ok(tokens)
}

/// Map key for the in-flight registry; raw refresh tokens are never used as
/// keys or logged.
fn fingerprint(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
