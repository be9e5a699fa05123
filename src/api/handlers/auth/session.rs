//! Session endpoints: refresh, logout, and identity echo.

use axum::{extract::Extension, http::HeaderMap, Json};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use super::audit::{record, AuditContext, AuditEvent};
use super::errors::AuthError;
use super::principal::Principal;
use super::state::AuthState;
use super::storage::{lookup_active_refresh_token, lookup_user_by_id, revoke_refresh_token};
use super::types::{
    LogoutRequest, LogoutResponse, RefreshRequest, RefreshResponse, UserResponse,
};
use super::utils::{extract_client_ip, extract_user_agent};

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<Pool<Sqlite>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);

    let token = match payload {
        Some(Json(request)) if !request.refresh_token.is_empty() => request.refresh_token,
        _ => {
            return Err(AuthError::Validation(
                "Refresh token is required".to_string(),
            ))
        }
    };

    // Revocation and expiry are both enforced inside the query.
    let user_id = lookup_active_refresh_token(&pool, &token).await?;
    let Some(user_id) = user_id else {
        record(
            &pool,
            AuditEvent::RefreshFailure,
            AuditContext {
                ip,
                user_agent,
                success: false,
                details: Some("unknown, revoked, or expired token".to_string()),
                ..AuditContext::default()
            },
        )
        .await;
        return Err(AuthError::InvalidRefreshToken);
    };

    // Re-read the user so new claims reflect current email/name/role rather
    // than whatever the previous access token carried.
    let user = lookup_user_by_id(&pool, user_id)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

    let access_token = auth_state
        .tokens()
        .mint_access_token(user.id, &user.email, &user.name, user.role)?;

    record(
        &pool,
        AuditEvent::RefreshSuccess,
        AuditContext {
            user_id: Some(user.id),
            email: Some(user.email),
            ip,
            user_agent,
            success: true,
            details: None,
        },
    )
    .await;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: auth_state.tokens().access_ttl_seconds(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Refresh token revoked (idempotent)", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<Pool<Sqlite>>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Json<LogoutResponse>, AuthError> {
    let ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);

    // Idempotent: an unknown or already-revoked token still yields success,
    // so a double logout never turns into an error or an information leak.
    if let Some(Json(request)) = payload {
        if !request.refresh_token.is_empty() {
            revoke_refresh_token(&pool, &request.refresh_token).await?;
        }
    }

    record(
        &pool,
        AuditEvent::Logout,
        AuditContext {
            ip,
            user_agent,
            success: true,
            ..AuditContext::default()
        },
    )
    .await;

    Ok(Json(LogoutResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Identity from the presented access token", body = UserResponse),
        (status = 401, description = "Missing, invalid, or expired token")
    ),
    tag = "auth",
    security(("bearer" = []))
)]
pub async fn me(principal: Principal) -> Json<UserResponse> {
    Json(UserResponse {
        id: principal.user_id,
        email: principal.email,
        name: principal.name,
        role: principal.role,
    })
}
