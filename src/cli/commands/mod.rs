use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub mod logging;

/// Refuse secrets that are too short to sign with.
pub fn validator_signing_secret() -> ValueParser {
    ValueParser::from(
        move |secret: &str| -> std::result::Result<String, String> {
            if secret.len() < 32 {
                return Err("signing secret must be at least 32 characters".to_string());
            }
            Ok(secret.to_string())
        },
    )
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("orbit-auth")
        .about("Authentication service for the Orbit invoicing API")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ORBIT_AUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("database")
                .short('d')
                .long("database")
                .help("Path to the SQLite database file")
                .env("ORBIT_AUTH_DB")
                .required(true),
        )
        .arg(
            Arg::new("signing-secret")
                .long("signing-secret")
                .help("HS256 signing secret for access tokens (at least 32 characters)")
                .env("ORBIT_AUTH_SIGNING_SECRET")
                .value_parser(validator_signing_secret())
                .required(true),
        )
        .arg(
            Arg::new("rate-limit-window")
                .long("rate-limit-window")
                .help("Login rate-limit window in seconds")
                .default_value("900")
                .env("ORBIT_AUTH_RATE_LIMIT_WINDOW")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("rate-limit-max-attempts")
                .long("rate-limit-max-attempts")
                .help("Login attempts allowed per window and address")
                .default_value("5")
                .env("ORBIT_AUTH_RATE_LIMIT_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("cors-origin")
                .long("cors-origin")
                .help("Allowed CORS origin, repeatable (comma-separated in the environment)")
                .env("ORBIT_AUTH_CORS_ORIGINS")
                .value_delimiter(',')
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("seed-admin-email")
                .long("seed-admin-email")
                .help("Create this admin account at startup if it does not exist")
                .env("ORBIT_AUTH_SEED_ADMIN_EMAIL")
                .requires("seed-admin-password"),
        )
        .arg(
            Arg::new("seed-admin-password")
                .long("seed-admin-password")
                .help("Password for the seeded admin account")
                .env("ORBIT_AUTH_SEED_ADMIN_PASSWORD")
                .requires("seed-admin-email"),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "orbit-auth");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Authentication service for the Orbit invoicing API"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_database() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "orbit-auth",
            "--port",
            "8080",
            "--database",
            "/var/lib/orbit/auth.db",
            "--signing-secret",
            SECRET,
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
        assert_eq!(
            matches.get_one::<String>("database").map(String::as_str),
            Some("/var/lib/orbit/auth.db")
        );
        assert_eq!(
            matches
                .get_one::<String>("signing-secret")
                .map(String::as_str),
            Some(SECRET)
        );
        assert_eq!(
            matches.get_one::<u64>("rate-limit-window").copied(),
            Some(900)
        );
        assert_eq!(
            matches.get_one::<u32>("rate-limit-max-attempts").copied(),
            Some(5)
        );
    }

    #[test]
    fn test_short_signing_secret_is_rejected() {
        let command = new();
        let result = command.try_get_matches_from(vec![
            "orbit-auth",
            "--database",
            "auth.db",
            "--signing-secret",
            "too-short",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("ORBIT_AUTH_PORT", Some("443")),
                ("ORBIT_AUTH_DB", Some("/tmp/orbit-auth.db")),
                ("ORBIT_AUTH_SIGNING_SECRET", Some(SECRET)),
                (
                    "ORBIT_AUTH_CORS_ORIGINS",
                    Some("http://localhost:5173,https://admin.orbit-studio.dev"),
                ),
                ("ORBIT_AUTH_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["orbit-auth"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("database").map(String::as_str),
                    Some("/tmp/orbit-auth.db")
                );
                let origins: Vec<_> = matches
                    .get_many::<String>("cors-origin")
                    .map(|values| values.map(String::as_str).collect())
                    .unwrap_or_default();
                assert_eq!(
                    origins,
                    vec!["http://localhost:5173", "https://admin.orbit-studio.dev"]
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_seed_admin_requires_both_fields() {
        let command = new();
        let result = command.try_get_matches_from(vec![
            "orbit-auth",
            "--database",
            "auth.db",
            "--signing-secret",
            SECRET,
            "--seed-admin-email",
            "admin@orbit.com",
        ]);
        assert!(result.is_err());
    }
}
