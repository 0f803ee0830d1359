/// Snapshot of the caller's session as carried by the request cookies.
///
/// The cookie jar is the source of truth; this struct is only a per-request
/// read model assembled by the cookie layer.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
}

impl AuthSession {
    /// True when the session holds a usable bearer credential.
    #[must_use]
    pub const fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }
}
