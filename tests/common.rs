#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use resona_server::api;
use resona_server::config::{
    Config, LogFormat, RateLimitConfig, ServerConfig, SessionConfig, SpotifyConfig,
    TelemetryConfig,
};
use resona_server::services::auth_service::AuthService;
use resona_server::services::spotify_service::SpotifyService;
use resona_server::storage::{MemoryStore, SharedSessionStore};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use url::Url;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("resona_server=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// Shared toggles and counters for the fake provider. Tests flip the
/// toggles and assert on the counters.
#[derive(Debug, Default)]
pub struct ProviderState {
    /// Total hits on the token endpoint, both grant types.
    pub token_hits: AtomicUsize,
    /// Hits on the token endpoint with `grant_type=refresh_token`.
    pub refresh_hits: AtomicUsize,
    /// Monotonic counter for issued credential pairs (AT-n / RT-n).
    pub issued: AtomicUsize,
    /// Reject refresh attempts with 400 invalid_grant.
    pub fail_refresh: AtomicBool,
    /// Leave `refresh_token` out of refresh responses.
    pub omit_refresh_token: AtomicBool,
    /// Make the resource API reject every bearer token.
    pub reject_all_resources: AtomicBool,
    /// Delay token endpoint responses, to provoke client-side timeouts.
    pub token_delay_ms: AtomicUsize,
}

async fn token_endpoint(
    State(state): State<Arc<ProviderState>>,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.token_hits.fetch_add(1, Ordering::SeqCst);

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
    }

    let grant_type = params.get("grant_type").map(String::as_str).unwrap_or_default();
    match grant_type {
        "authorization_code" => {
            if params.get("code_verifier").is_none_or(String::is_empty) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_request", "error_description": "code_verifier required"})),
                );
            }
            let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": format!("AT-{n}"),
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "refresh_token": format!("RT-{n}"),
                    "scope": "user-read-email"
                })),
            )
        }
        "refresh_token" => {
            state.refresh_hits.fetch_add(1, Ordering::SeqCst);
            if state.fail_refresh.load(Ordering::SeqCst) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "refresh token revoked"})),
                );
            }
            let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
            let mut body = json!({
                "access_token": format!("AT-{n}"),
                "token_type": "Bearer",
                "expires_in": 3600
            });
            if !state.omit_refresh_token.load(Ordering::SeqCst) {
                body["refresh_token"] = json!(format!("RT-{n}"));
            }
            (StatusCode::OK, Json(body))
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type", "error_description": other})),
        ),
    }
}

fn bearer_ok(state: &ProviderState, headers: &HeaderMap) -> bool {
    if state.reject_all_resources.load(Ordering::SeqCst) {
        return false;
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token.starts_with("AT-"))
}

async fn me_endpoint(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if bearer_ok(&state, &headers) {
        (StatusCode::OK, Json(json!({"id": "user-1", "display_name": "Test User"})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": {"status": 401, "message": "The access token expired"}})))
    }
}

async fn resource_endpoint(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Path(rest): Path<String>,
) -> impl IntoResponse {
    if bearer_ok(&state, &headers) {
        (StatusCode::OK, Json(json!({"path": rest})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": {"status": 401, "message": "The access token expired"}})))
    }
}

/// Spawns the fake provider (token endpoint plus a resource API) on an OS
/// chosen port and returns its base URL and shared state.
async fn spawn_provider() -> (String, Arc<ProviderState>) {
    let state = Arc::new(ProviderState::default());
    let router = Router::new()
        .route("/api/token", post(token_endpoint))
        .route("/v1/me", get(me_endpoint))
        .route("/v1/{*rest}", get(resource_endpoint))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub provider: Arc<ProviderState>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();

        let (provider_url, provider) = spawn_provider().await;
        let config = test_config(&provider_url);

        let login_states: SharedSessionStore = Arc::new(MemoryStore::new());
        let auth_service = AuthService::new(
            config.spotify.clone(),
            config.session.clone(),
            Arc::clone(&login_states),
        )
        .unwrap();
        let spotify_service =
            SpotifyService::new(config.spotify.clone(), auth_service.clone()).unwrap();

        let app = api::app_router(config, auth_service, spotify_service);
        let mgmt = api::mgmt_router();

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_addr = api_listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(api_listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_addr = mgmt_listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        // Auth outcomes are communicated through redirects and Set-Cookie
        // headers; following redirects would hide both.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            server_url: format!("http://{api_addr}"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client,
            provider,
        }
    }

    /// Runs the full login + callback handshake against the fake provider
    /// and returns the resulting session cookies.
    pub async fn authenticate(&self) -> CookieStore {
        let mut cookies = CookieStore::default();

        let resp = self
            .client
            .get(format!("{}/v1/auth/login", self.server_url))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_redirection(), "login should redirect");
        let authorize_url = Url::parse(resp.headers()["location"].to_str().unwrap()).unwrap();
        let state = authorize_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        cookies.apply_response(&resp);

        let resp = self
            .client
            .get(format!(
                "{}/v1/auth/callback?code=test-code&state={state}",
                self.server_url
            ))
            .header("cookie", cookies.header())
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_redirection(), "callback should redirect");
        cookies.apply_response(&resp);
        cookies
    }
}

fn test_config(provider_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mgmt_port: 0,
            shutdown_timeout_secs: 5,
        },
        spotify: SpotifyConfig {
            client_id: "test-client-id".to_string(),
            client_secret: Some("test-client-secret".to_string()),
            authorize_url: Url::parse(&format!("{provider_url}/authorize")).unwrap(),
            token_url: Url::parse(&format!("{provider_url}/api/token")).unwrap(),
            api_base_url: Url::parse(&format!("{provider_url}/v1")).unwrap(),
            redirect_uri: "http://localhost:3002/v1/auth/callback".to_string(),
            scopes: "user-read-email user-read-private".to_string(),
            request_timeout_secs: 1,
            verifier_length: 64,
        },
        session: SessionConfig {
            secure_cookies: false,
            refresh_token_ttl_days: 30,
            login_state_ttl_secs: 600,
            sweep_interval_secs: 60,
            login_redirect: "/dashboard".to_string(),
            error_redirect: "/login".to_string(),
        },
        rate_limit: RateLimitConfig {
            per_second: 10000,
            burst: 10000,
            auth_per_second: 10000,
            auth_burst: 10000,
        },
        telemetry: TelemetryConfig { log_format: LogFormat::Text },
    }
}

/// Minimal cookie jar for tests: tracks Set-Cookie headers across responses
/// the way a browser would, including Max-Age=0 removals.
#[derive(Debug, Default)]
pub struct CookieStore {
    values: HashMap<String, String>,
}

impl CookieStore {
    pub fn apply_response(&mut self, resp: &reqwest::Response) {
        for header in set_cookie_headers(resp) {
            let attrs: Vec<&str> = header.split(';').map(str::trim).collect();
            let Some((name, value)) = attrs[0].split_once('=') else {
                continue;
            };
            let removed =
                value.is_empty() || attrs.iter().any(|a| a.eq_ignore_ascii_case("max-age=0"));
            if removed {
                self.values.remove(name);
            } else {
                self.values.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn header(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// All raw Set-Cookie header values on a response, for attribute assertions.
pub fn set_cookie_headers(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The value of a named cookie set on a response, ignoring removals.
pub fn cookie_value(headers: &[String], name: &str) -> Option<String> {
    headers.iter().find_map(|header| {
        let pair = header.split(';').next().unwrap_or_default();
        let (n, v) = pair.split_once('=')?;
        (n.trim() == name && !v.is_empty()).then(|| v.to_string())
    })
}

/// Whether a response instructs the browser to drop a named cookie.
pub fn cookie_removed(headers: &[String], name: &str) -> bool {
    headers.iter().any(|header| {
        let mut attrs = header.split(';').map(str::trim);
        let is_named = attrs
            .next()
            .and_then(|pair| pair.split_once('='))
            .is_some_and(|(n, _)| n == name);
        is_named && header.split(';').map(str::trim).any(|a| a.eq_ignore_ascii_case("max-age=0"))
    })
}
