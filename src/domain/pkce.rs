//! PKCE (Proof Key for Code Exchange) primitives, RFC 7636.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Unreserved URI characters permitted in a code verifier (RFC 7636 §4.1).
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

pub const MIN_VERIFIER_LENGTH: usize = 43;
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Per-login-attempt PKCE material plus the CSRF state nonce.
///
/// Created once per login, persisted transiently, consumed exactly once at
/// code exchange.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier/challenge/state triple.
    ///
    /// Lengths outside the RFC range are clamped rather than rejected; the
    /// length comes from configuration and a misconfigured deployment should
    /// still produce valid login attempts.
    #[must_use]
    pub fn generate(verifier_length: usize) -> Self {
        let verifier = generate_verifier(verifier_length);
        let challenge = generate_challenge(&verifier);
        let state = generate_state();
        Self { verifier, challenge, state }
    }

    /// The only challenge method this crate emits.
    #[must_use]
    pub const fn method() -> &'static str {
        "S256"
    }
}

/// Generates a cryptographically random code verifier of the given length,
/// drawn from the unreserved character set.
#[must_use]
pub fn generate_verifier(length: usize) -> String {
    let length = length.clamp(MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH);
    let mut rng = OsRng;
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..VERIFIER_CHARSET.len());
            char::from(VERIFIER_CHARSET[idx])
        })
        .collect()
}

/// Computes the S256 code challenge: `BASE64URL(SHA256(verifier))`, unpadded.
#[must_use]
pub fn generate_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates the CSRF state nonce (16 random bytes, base64url).
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
