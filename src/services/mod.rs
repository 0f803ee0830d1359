pub mod auth_service;
pub mod spotify_service;

pub use auth_service::AuthService;
pub use spotify_service::SpotifyService;
