//! Access-token mint and verify (HS256, stateless).

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::errors::AuthError;
use super::principal::Role;
use super::utils::unix_now;

/// Claim set carried by an access token. Self-contained: the middleware
/// trusts signature and expiry alone, with no per-request database hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier around the shared signing secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_seconds: i64) -> Self {
        let secret = secret.expose_secret();
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_seconds,
        }
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    /// Mint a signed access token for the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if signing fails.
    pub fn mint_access_token(
        &self,
        user_id: i64,
        email: &str,
        name: &str,
        role: Role,
    ) -> Result<String, AuthError> {
        let now = unix_now();
        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            name: name.to_string(),
            role,
            jti: ulid::Ulid::new().to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Internal(format!("failed to sign access token: {err}")))
    }

    /// Verify signature and expiry, returning the decoded claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] for an expired claim set and
    /// [`AuthError::InvalidToken`] for any signature or format problem.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: an expired token is expired, the client refreshes.
        validation.leeway = 0;

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(
            |err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            },
        )?;

        Ok(data.claims)
    }

    #[cfg(test)]
    pub(crate) fn mint_with_ttl(
        &self,
        user_id: i64,
        role: Role,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        let now = unix_now();
        let claims = AccessClaims {
            sub: user_id,
            email: "test@orbit.com".to_string(),
            name: "Test".to_string(),
            role,
            jti: ulid::Ulid::new().to_string(),
            iat: now,
            exp: now + ttl_seconds,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Internal(format!("failed to sign access token: {err}")))
    }
}
