pub mod auth_session;
pub mod pkce;
pub mod token;
