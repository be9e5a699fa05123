//! # Orbit Auth
//!
//! `orbit-auth` is the authentication and session authority for the Orbit
//! invoicing API. It issues short-lived signed access tokens and opaque
//! refresh tokens, guards the login endpoint with per-IP rate limiting, and
//! keeps an append-only audit trail of security-relevant events.
//!
//! ## Sessions
//!
//! A successful login mints a 15-minute HS256 access token plus a 7-day
//! opaque refresh token. Logging in again revokes every prior refresh token
//! for that user, so each account holds at most one active session.
//! Access tokens are stateless and verified by signature and expiry alone;
//! they cannot be revoked before they expire.
//!
//! ## Roles
//!
//! Users carry one of three roles (`superadmin`, `admin`, `employee`). Each
//! role maps to a fixed capability set resolved once per request into the
//! [`api::handlers::auth::Principal`]; user administration requires the
//! `ManageUsers` capability.
//!
//! ## Client
//!
//! The [`client`] module is the consumer-side counterpart: it stores the
//! token pair, refreshes proactively near expiry with a single-flight lock,
//! and retries a request exactly once after a 401 before declaring the
//! session expired.

pub mod api;
pub mod cli;
pub mod client;
pub mod db;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
