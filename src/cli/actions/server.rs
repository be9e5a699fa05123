use crate::api;
use crate::api::handlers::auth::{password, storage, AuthConfig, AuthState};
use crate::cli::actions::Action;
use crate::db;
use anyhow::Result;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        db_path,
        signing_secret,
        rate_limit_window_seconds,
        rate_limit_max_attempts,
        cors_origins,
        seed_admin_email,
        seed_admin_password,
    } = action;

    let pool = db::connect(&db_path).await?;

    if let (Some(email), Some(seed_password)) = (seed_admin_email, seed_admin_password) {
        let password_hash = password::hash_password(seed_password.expose_secret())?;
        if storage::seed_admin(&pool, &email.to_lowercase(), "Administrator", &password_hash)
            .await?
        {
            info!("Seeded admin account {email}");
        }
    }

    let config = AuthConfig::new(signing_secret)?
        .with_rate_limit_window_seconds(rate_limit_window_seconds)
        .with_rate_limit_max_attempts(rate_limit_max_attempts);
    let auth_state = Arc::new(AuthState::new(&config));

    api::serve(port, pool, auth_state, &cors_origins).await
}
