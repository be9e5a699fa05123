//! Login endpoint: credential check, token mint, session bookkeeping.

use axum::{extract::Extension, http::HeaderMap, Json};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::info;

use super::audit::{record, AuditContext, AuditEvent};
use super::errors::AuthError;
use super::password::verify_password;
use super::rate_limit::RateLimitDecision;
use super::state::AuthState;
use super::storage::{issue_refresh_token, lookup_user_by_email};
use super::types::{LoginRequest, LoginResponse, UserResponse};
use super::utils::{
    extract_client_ip, extract_user_agent, generate_refresh_token, normalize_email, unix_now,
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts from this address")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<Pool<Sqlite>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, AuthError> {
    let ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);
    let audit_ctx = |email: Option<String>, success: bool, details: &str| AuditContext {
        user_id: None,
        email,
        ip: ip.clone(),
        user_agent: user_agent.clone(),
        success,
        details: Some(details.to_string()),
    };

    let request = match payload {
        Some(Json(request)) if !request.email.is_empty() && !request.password.is_empty() => request,
        _ => {
            record(
                &pool,
                AuditEvent::LoginAttempt,
                audit_ctx(None, false, "missing credentials"),
            )
            .await;
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }
    };

    let email = normalize_email(&request.email);

    // Gate on the rate limiter before touching stored credentials.
    let limiter_key = ip.clone().unwrap_or_else(|| "unknown".to_string());
    if let RateLimitDecision::Limited {
        retry_after_seconds,
    } = auth_state.rate_limiter().check(&limiter_key)
    {
        return Err(AuthError::RateLimited {
            retry_after_seconds,
        });
    }

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            record(
                &pool,
                AuditEvent::Error,
                audit_ctx(Some(email.clone()), false, "login lookup failed"),
            )
            .await;
            return Err(err.into());
        }
    };

    // Unknown email and wrong password produce the same response so callers
    // cannot enumerate accounts.
    let Some(user) = user else {
        record(
            &pool,
            AuditEvent::LoginFailure,
            audit_ctx(Some(email.clone()), false, "unknown email"),
        )
        .await;
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&request.password, &user.password_hash) {
        record(
            &pool,
            AuditEvent::LoginFailure,
            AuditContext {
                user_id: Some(user.id),
                ..audit_ctx(Some(email.clone()), false, "wrong password")
            },
        )
        .await;
        return Err(AuthError::InvalidCredentials);
    }

    let access_token = auth_state
        .tokens()
        .mint_access_token(user.id, &user.email, &user.name, user.role)?;
    let refresh_token = generate_refresh_token()?;
    let refresh_expires_at = unix_now() + auth_state.refresh_ttl_seconds();

    // Revoke-all-then-insert in one transaction: one active session per user.
    if let Err(err) = issue_refresh_token(&pool, user.id, &refresh_token, refresh_expires_at).await
    {
        record(
            &pool,
            AuditEvent::Error,
            audit_ctx(Some(email.clone()), false, "failed to store refresh token"),
        )
        .await;
        return Err(err.into());
    }

    // A successful login stops earlier failed attempts from counting against
    // this address.
    auth_state.rate_limiter().clear(&limiter_key);

    record(
        &pool,
        AuditEvent::LoginSuccess,
        AuditContext {
            user_id: Some(user.id),
            ..audit_ctx(Some(user.email.clone()), true, "login")
        },
    )
    .await;

    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        expires_in: auth_state.tokens().access_ttl_seconds(),
        user: UserResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}
