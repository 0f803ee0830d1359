//! The five session cookies and their attribute discipline.
//!
//! Token, state and verifier cookies are httpOnly and never readable by
//! client script; `spotify_is_authenticated` is the one deliberately
//! client-readable flag the frontend polls.

use crate::domain::auth_session::AuthSession;
use crate::domain::token::TokenSet;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "spotify_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "spotify_refresh_token";
pub const AUTH_STATE_COOKIE: &str = "spotify_auth_state";
pub const CODE_VERIFIER_COOKIE: &str = "spotify_code_verifier";
pub const IS_AUTHENTICATED_COOKIE: &str = "spotify_is_authenticated";

/// Every key the session can own; logout clears them all in one response.
pub const ALL_COOKIES: [&str; 5] = [
    ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
    AUTH_STATE_COOKIE,
    CODE_VERIFIER_COOKIE,
    IS_AUTHENTICATED_COOKIE,
];

fn credential_cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").max_age(Duration::ZERO).build()
}

/// State + verifier cookies for a freshly started login attempt.
pub fn pkce_cookies(
    state: &str,
    verifier: &str,
    ttl_secs: u64,
    secure: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let ttl = Duration::seconds(i64::try_from(ttl_secs).unwrap_or(600));
    (
        credential_cookie(AUTH_STATE_COOKIE, state.to_owned(), ttl, secure),
        credential_cookie(CODE_VERIFIER_COOKIE, verifier.to_owned(), ttl, secure),
    )
}

/// Applies a token set to the jar: access cookie scoped to `expires_in`, the
/// refresh cookie (when present) to its long TTL, and the client-readable
/// authenticated flag.
///
/// A token set without a refresh token leaves any existing refresh cookie
/// untouched: the provider reusing the old token must not cost the session
/// its credential.
pub fn apply_token_set(
    jar: CookieJar,
    tokens: &TokenSet,
    refresh_ttl_days: i64,
    secure: bool,
) -> CookieJar {
    let access_age = Duration::seconds(i64::try_from(tokens.expires_in_secs).unwrap_or(3600));
    let mut jar = jar.add(credential_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        access_age,
        secure,
    ));

    if let Some(refresh_token) = &tokens.refresh_token {
        jar = jar.add(credential_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token.clone(),
            Duration::days(refresh_ttl_days),
            secure,
        ));
    }

    // Readable by the frontend on purpose: presence/polling flag only.
    let flag = Cookie::build((IS_AUTHENTICATED_COOKIE, "true"))
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(access_age)
        .build();

    jar.add(flag)
}

/// Removal cookies for the two PKCE keys (after a completed or failed
/// callback).
pub fn clear_pkce_cookies(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(AUTH_STATE_COOKIE)).add(removal_cookie(CODE_VERIFIER_COOKIE))
}

/// Removal cookies for every session key. From the caller's point of view
/// the clear is atomic: all five removals travel in a single response.
pub fn clear_all_cookies(mut jar: CookieJar) -> CookieJar {
    for name in ALL_COOKIES {
        jar = jar.add(removal_cookie(name));
    }
    jar
}

/// Removal cookies for the credential keys only (used when starting a new
/// login while PKCE cookies are being freshly set).
pub fn clear_credential_cookies(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE))
        .add(removal_cookie(IS_AUTHENTICATED_COOKIE))
}

pub fn auth_state(jar: &CookieJar) -> Option<String> {
    jar.get(AUTH_STATE_COOKIE).map(|c| c.value().to_owned())
}

pub fn code_verifier(jar: &CookieJar) -> Option<String> {
    jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_owned())
}

/// Assembles the per-request session snapshot from the jar.
pub fn session_from_jar(jar: &CookieJar) -> AuthSession {
    AuthSession {
        access_token: jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_owned()),
        refresh_token: jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_owned()),
        is_authenticated: jar.get(ACCESS_TOKEN_COOKIE).is_some(),
    }
}
