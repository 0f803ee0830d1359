use serde::Deserialize;
use time::OffsetDateTime;

/// Providers that omit `expires_in` get the Spotify default of one hour.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Ceiling for provider-supplied `expires_in`: adding an absurd value to
/// `OffsetDateTime` would overflow, so anything above a year is clamped.
const MAX_EXPIRES_IN_SECS: u64 = 365 * 24 * 3600;

/// Raw token endpoint response. Treated as opaque beyond the two tokens and
/// the expiry; `token_type` and `scope` are accepted but not persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// The credentials the session actually persists: access token, refresh
/// token and an absolute expiry instant.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in_secs: u64,
    pub expires_at: OffsetDateTime,
}

impl TokenSet {
    /// Builds a token set from a provider response.
    ///
    /// The access token always rotates. The refresh token rotates only when
    /// the response carries a new one; otherwise `previous_refresh_token` is
    /// retained, since providers are allowed to keep reusing the old token and it
    /// must not be discarded.
    #[must_use]
    pub fn from_response(response: TokenResponse, previous_refresh_token: Option<&str>) -> Self {
        let expires_in_secs = response
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .min(MAX_EXPIRES_IN_SECS);
        let expires_at = OffsetDateTime::now_utc()
            + time::Duration::seconds(i64::try_from(expires_in_secs).unwrap_or(0));

        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh_token.map(ToOwned::to_owned));

        Self {
            access_token: response.access_token,
            refresh_token,
            expires_in_secs,
            expires_at,
        }
    }

    /// Whether the refresh token differs from what the session held before.
    #[must_use]
    pub fn rotated_refresh_token(&self, previous: Option<&str>) -> bool {
        self.refresh_token.as_deref() != previous
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}
