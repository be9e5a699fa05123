//! User administration. Requires the `ManageUsers` capability.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Sqlite};

use super::errors::AuthError;
use super::password::hash_password;
use super::principal::{Capability, Principal};
use super::storage::{create_user, delete_user, list_users};
use super::types::{CreateUserRequest, UserListEntry, UserResponse};
use super::utils::{normalize_email, valid_email};

#[utoipa::path(
    get,
    path = "/auth/users",
    responses(
        (status = 200, description = "All users", body = [UserListEntry]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role cannot manage users")
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn list(
    principal: Principal,
    pool: Extension<Pool<Sqlite>>,
) -> Result<Json<Vec<UserListEntry>>, AuthError> {
    principal.require(Capability::ManageUsers)?;

    let users = list_users(&pool).await?;
    Ok(Json(
        users
            .into_iter()
            .map(|user| UserListEntry {
                id: user.id,
                email: user.email,
                name: user.name,
                role: user.role,
                created_at: user.created_at,
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Role cannot manage users"),
        (status = 409, description = "Email already registered")
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn create(
    principal: Principal,
    pool: Extension<Pool<Sqlite>>,
    payload: Option<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    principal.require(Capability::ManageUsers)?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let id = create_user(&pool, &email, request.name.trim(), &password_hash, request.role)
        .await?
        .ok_or_else(|| AuthError::Conflict("Email already registered".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id,
            email,
            name: request.name.trim().to_string(),
            role: request.role,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/auth/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Attempted to delete own account"),
        (status = 403, description = "Role cannot manage users"),
        (status = 404, description = "No such user")
    ),
    tag = "users",
    security(("bearer" = []))
)]
pub async fn delete(
    principal: Principal,
    pool: Extension<Pool<Sqlite>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AuthError> {
    principal.require(Capability::ManageUsers)?;

    // Admins cannot remove themselves; another admin must do it.
    if id == principal.user_id {
        return Err(AuthError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    if delete_user(&pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AuthError::NotFound("No such user".to_string()))
    }
}
