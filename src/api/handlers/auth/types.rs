//! Request/response types for the auth endpoints. Shared with the client
//! module so both sides agree on the wire shape.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::Role;

/// Login body. Fields default to empty so a missing field surfaces as a 400
/// with an audit entry instead of a bare deserialization error.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_response_uses_camel_case_keys() -> Result<()> {
        let response = LoginResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 900,
            user: UserResponse {
                id: 1,
                email: "admin@orbit.com".to_string(),
                name: "Admin".to_string(),
                role: Role::Admin,
            },
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("accessToken").is_some());
        assert!(value.get("refreshToken").is_some());
        assert!(value.get("expiresIn").is_some());
        let role = value
            .pointer("/user/role")
            .and_then(serde_json::Value::as_str)
            .context("missing role")?;
        assert_eq!(role, "admin");
        Ok(())
    }

    #[test]
    fn login_request_defaults_missing_fields_to_empty() -> Result<()> {
        let request: LoginRequest = serde_json::from_str(r#"{"email":"a@orbit.com"}"#)?;
        assert_eq!(request.email, "a@orbit.com");
        assert!(request.password.is_empty());
        Ok(())
    }

    #[test]
    fn refresh_request_reads_camel_case() -> Result<()> {
        let request: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"tok"}"#)?;
        assert_eq!(request.refresh_token, "tok");
        Ok(())
    }
}
