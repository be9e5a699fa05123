//! OpenAPI document for the auth surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth, health};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::login,
        auth::session::refresh,
        auth::session::logout,
        auth::session::me,
        auth::users::list,
        auth::users::create,
        auth::users::delete,
    ),
    components(schemas(
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::RefreshRequest,
        auth::types::RefreshResponse,
        auth::types::LogoutRequest,
        auth::types::LogoutResponse,
        auth::types::UserResponse,
        auth::types::UserListEntry,
        auth::types::CreateUserRequest,
        auth::principal::Role,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, refresh, and logout"),
        (name = "users", description = "User administration"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_all_auth_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/login",
            "/auth/refresh",
            "/auth/logout",
            "/auth/me",
            "/auth/users",
            "/auth/users/{id}",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing path in OpenAPI document: {path}"
            );
        }
    }
}
