use serde::{Deserialize, Serialize};

/// Body of the POST variant of the callback (frontend-driven completion).
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
}

/// Tokens themselves never appear in response bodies; the session cookies
/// are the only transport. Clients get expiry metadata to schedule the next
/// refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub expires_in: u64,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}
