//! The auth error taxonomy and its wire mapping.
//!
//! Authentication failures (401) keep uniform, machine-distinguishable
//! strings; internal errors log full detail server-side and return only a
//! generic message to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token provided")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Too many login attempts, please try again later")]
    RateLimited { retry_after_seconds: u64 },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidCredentials
            | Self::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::RateLimited {
                retry_after_seconds,
            } => json!({
                "error": self.to_string(),
                "retryAfter": retry_after_seconds,
            }),
            Self::Internal(detail) => {
                // Detail stays in the server log only.
                error!("Internal error: {detail}");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_variants_share_status() {
        for err in [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::TokenExpired,
            AuthError::InvalidCredentials,
            AuthError::InvalidRefreshToken,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn middleware_errors_are_machine_distinguishable() {
        assert_eq!(AuthError::MissingToken.to_string(), "no token provided");
        assert_eq!(AuthError::InvalidToken.to_string(), "invalid token");
        assert_eq!(AuthError::TokenExpired.to_string(), "token expired");
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = AuthError::Internal("connection refused at 10.0.0.5".to_string());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let err = AuthError::RateLimited {
            retry_after_seconds: 42,
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
