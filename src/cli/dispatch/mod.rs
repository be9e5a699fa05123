use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let signing_secret = matches
        .get_one::<String>("signing-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --signing-secret")?;

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        db_path: matches
            .get_one::<String>("database")
            .cloned()
            .context("missing required argument: --database")?,
        signing_secret,
        rate_limit_window_seconds: matches
            .get_one::<u64>("rate-limit-window")
            .copied()
            .unwrap_or(900),
        rate_limit_max_attempts: matches
            .get_one::<u32>("rate-limit-max-attempts")
            .copied()
            .unwrap_or(5),
        cors_origins: matches
            .get_many::<String>("cors-origin")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        seed_admin_email: matches.get_one::<String>("seed-admin-email").cloned(),
        seed_admin_password: matches
            .get_one::<String>("seed-admin-password")
            .cloned()
            .map(SecretString::from),
    })
}
