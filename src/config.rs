use clap::{Args, Parser, ValueEnum};
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub spotify: SpotifyConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "RESONA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "RESONA_PORT", default_value_t = 3002)]
    pub port: u16,

    /// Port for the management (health probe) listener
    #[arg(long, env = "RESONA_MGMT_PORT", default_value_t = 3003)]
    pub mgmt_port: u16,

    /// How long to wait for background tasks on shutdown
    #[arg(long, env = "RESONA_SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct SpotifyConfig {
    /// Spotify application client ID
    #[arg(long, env = "RESONA_SPOTIFY_CLIENT_ID")]
    pub client_id: String,

    /// Spotify application client secret. When set, token requests use HTTP
    /// Basic (confidential client); when absent, the client ID travels in the
    /// form body (public PKCE client). Pick one per deployment.
    #[arg(long, env = "RESONA_SPOTIFY_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Provider authorization endpoint
    #[arg(long, env = "RESONA_SPOTIFY_AUTHORIZE_URL", default_value = "https://accounts.spotify.com/authorize")]
    pub authorize_url: Url,

    /// Provider token endpoint
    #[arg(long, env = "RESONA_SPOTIFY_TOKEN_URL", default_value = "https://accounts.spotify.com/api/token")]
    pub token_url: Url,

    /// Resource API base URL
    #[arg(long, env = "RESONA_SPOTIFY_API_BASE_URL", default_value = "https://api.spotify.com/v1")]
    pub api_base_url: Url,

    /// OAuth2 redirect URI registered with the provider
    #[arg(long, env = "RESONA_SPOTIFY_REDIRECT_URI", default_value = "http://localhost:3002/v1/auth/callback")]
    pub redirect_uri: String,

    /// Requested scopes (space-separated allow-list)
    #[arg(
        long,
        env = "RESONA_SPOTIFY_SCOPES",
        default_value = "user-read-email user-read-private user-read-currently-playing user-read-recently-played user-top-read playlist-read-private playlist-read-collaborative user-library-read"
    )]
    pub scopes: String,

    /// Timeout for requests to the provider, in seconds
    #[arg(long, env = "RESONA_PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// PKCE code verifier length (RFC 7636 allows 43-128)
    #[arg(long, env = "RESONA_PKCE_VERIFIER_LENGTH", default_value_t = 64)]
    pub verifier_length: usize,
}

#[derive(Clone, Debug, Args)]
pub struct SessionConfig {
    /// Mark cookies Secure (set in production deployments behind TLS)
    #[arg(long, env = "RESONA_SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,

    /// Refresh token cookie time-to-live in days
    #[arg(long, env = "RESONA_REFRESH_TOKEN_TTL_DAYS", default_value_t = 30)]
    pub refresh_token_ttl_days: i64,

    /// Time-to-live for the per-login state/verifier record, in seconds
    #[arg(long, env = "RESONA_LOGIN_STATE_TTL_SECS", default_value_t = 600)]
    pub login_state_ttl_secs: u64,

    /// How often to sweep expired login-state records
    #[arg(long, env = "RESONA_LOGIN_STATE_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Where to send the browser after a successful login
    #[arg(long, env = "RESONA_LOGIN_REDIRECT", default_value = "/dashboard")]
    pub login_redirect: String,

    /// Where to send the browser when the callback fails
    #[arg(long, env = "RESONA_ERROR_REDIRECT", default_value = "/login")]
    pub error_redirect: String,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for standard endpoints
    #[arg(long, env = "RESONA_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance for standard endpoints
    #[arg(long, env = "RESONA_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,

    /// Stricter rate limit for the auth endpoints (login/callback/refresh)
    #[arg(long, env = "RESONA_AUTH_RATE_LIMIT_PER_SECOND", default_value_t = 2)]
    pub auth_per_second: u32,

    /// Burst allowance for the auth endpoints
    #[arg(long, env = "RESONA_AUTH_RATE_LIMIT_BURST", default_value_t = 5)]
    pub auth_burst: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "RESONA_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
