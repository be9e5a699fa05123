//! Request identity: roles, capabilities, and the bearer-token extractor.

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::errors::AuthError;
use super::state::AuthState;
use super::utils::extract_bearer_token;

/// User role. The set is fixed; authorization is a static mapping from role
/// to capabilities rather than a per-check lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Employee,
}

impl Role {
    /// Parse the database representation.
    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "superadmin" => Some(Self::Superadmin),
            "admin" => Some(Self::Admin),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }

    /// Resolve the fixed capability set for this role.
    #[must_use]
    pub fn permissions(self) -> Permissions {
        match self {
            Self::Superadmin => Permissions::of(&[
                Capability::ManageUsers,
                Capability::ManageCatalog,
                Capability::ManageInvoices,
                Capability::ViewAnalytics,
            ]),
            Self::Admin => Permissions::of(&[
                Capability::ManageUsers,
                Capability::ManageCatalog,
                Capability::ManageInvoices,
                Capability::ViewAnalytics,
            ]),
            Self::Employee => {
                Permissions::of(&[Capability::ManageInvoices, Capability::ViewAnalytics])
            }
        }
    }
}

/// Things a signed-in user may do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    ManageUsers,
    ManageCatalog,
    ManageInvoices,
    ViewAnalytics,
}

impl Capability {
    const fn bit(self) -> u32 {
        match self {
            Self::ManageUsers => 1 << 0,
            Self::ManageCatalog => 1 << 1,
            Self::ManageInvoices => 1 << 2,
            Self::ViewAnalytics => 1 << 3,
        }
    }
}

/// Capability set resolved once per identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permissions(u32);

impl Permissions {
    fn of(capabilities: &[Capability]) -> Self {
        Self(
            capabilities
                .iter()
                .fold(0, |mask, capability| mask | capability.bit()),
        )
    }

    #[must_use]
    pub fn allows(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

/// Identity attached to an authenticated request.
///
/// Built from access-token claims alone; no database lookup happens here, so
/// a token stays valid until its expiry even if the account changes.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    permissions: Permissions,
}

impl Principal {
    pub(crate) fn new(user_id: i64, email: String, name: String, role: Role) -> Self {
        let permissions = role.permissions();
        Self {
            user_id,
            email,
            name,
            role,
            permissions,
        }
    }

    /// Check a capability against the set resolved at extraction time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] when the role lacks the capability.
    pub fn require(&self, capability: Capability) -> Result<(), AuthError> {
        if self.permissions.allows(capability) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(auth_state) =
            Extension::<Arc<AuthState>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::Internal("auth state missing from request".to_string()))?;

        let token = extract_bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = auth_state.tokens().verify_access_token(&token)?;

        Ok(Self::new(
            claims.sub,
            claims.email,
            claims.name,
            claims.role,
        ))
    }
}
