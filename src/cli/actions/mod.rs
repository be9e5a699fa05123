pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        db_path: String,
        signing_secret: SecretString,
        rate_limit_window_seconds: u64,
        rate_limit_max_attempts: u32,
        cors_origins: Vec<String>,
        seed_admin_email: Option<String>,
        seed_admin_password: Option<SecretString>,
    },
}
