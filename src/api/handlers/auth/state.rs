//! Auth configuration and shared per-server state.

use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use super::rate_limit::LoginRateLimiter;
use super::tokens::TokenService;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_ATTEMPTS: u32 = 5;
const MIN_SIGNING_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    rate_limit_window_seconds: u64,
    rate_limit_max_attempts: u32,
}

impl AuthConfig {
    /// Build a config around the signing secret.
    ///
    /// # Errors
    ///
    /// Returns an error when the secret is shorter than 32 characters; the
    /// process must refuse to start rather than sign with a weak key.
    pub fn new(signing_secret: SecretString) -> Result<Self> {
        if signing_secret.expose_secret().len() < MIN_SIGNING_SECRET_LENGTH {
            bail!("signing secret must be at least {MIN_SIGNING_SECRET_LENGTH} characters");
        }
        Ok(Self {
            signing_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            rate_limit_max_attempts: DEFAULT_RATE_LIMIT_MAX_ATTEMPTS,
        })
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_attempts(mut self, attempts: u32) -> Self {
        self.rate_limit_max_attempts = attempts;
        self
    }

    pub(super) fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }
}

/// Shared auth state, constructed once at startup and handed to routes via an
/// extension layer. Owning the rate limiter here (instead of module-level
/// globals) keeps lifecycle and tests explicit.
pub struct AuthState {
    tokens: TokenService,
    rate_limiter: Arc<LoginRateLimiter>,
    refresh_ttl_seconds: i64,
}

impl AuthState {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let tokens = TokenService::new(&config.signing_secret, config.access_ttl_seconds);
        let rate_limiter = Arc::new(LoginRateLimiter::new(
            config.rate_limit_max_attempts,
            Duration::from_secs(config.rate_limit_window_seconds),
        ));
        Self {
            tokens,
            rate_limiter,
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<LoginRateLimiter> {
        &self.rate_limiter
    }

    pub(super) fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }
}
