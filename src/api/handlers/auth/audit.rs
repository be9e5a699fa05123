//! Append-only audit trail for security-relevant events.

use sqlx::{Pool, Sqlite};
use tracing::{error, Instrument};

/// Security events worth keeping. The table is write-only; the application
/// never updates or deletes rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditEvent {
    LoginAttempt,
    LoginSuccess,
    LoginFailure,
    RefreshSuccess,
    RefreshFailure,
    Logout,
    Error,
}

impl AuditEvent {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::LoginAttempt => "login_attempt",
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::RefreshSuccess => "refresh_success",
            Self::RefreshFailure => "refresh_failure",
            Self::Logout => "logout",
            Self::Error => "error",
        }
    }
}

/// Context captured with every entry. Everything except the success flag is
/// optional; failed logins often have no user id to attach.
#[derive(Debug, Default)]
pub struct AuditContext {
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub details: Option<String>,
}

/// Append an entry. Fire-and-forget: a failed write is logged to process
/// output and never aborts the request that triggered it.
pub(super) async fn record(pool: &Pool<Sqlite>, event: AuditEvent, context: AuditContext) {
    let query = r"
        INSERT INTO audit_logs (event_type, user_id, email, ip_address, user_agent, success, details)
        VALUES (?, ?, ?, ?, ?, ?, ?)
    ";
    let span = tracing::info_span!("db.query", db.system = "sqlite", db.operation = "INSERT");
    let result = sqlx::query(query)
        .bind(event.as_str())
        .bind(context.user_id)
        .bind(&context.email)
        .bind(&context.ip)
        .bind(&context.user_agent)
        .bind(i64::from(context.success))
        .bind(&context.details)
        .execute(pool)
        .instrument(span)
        .await;

    if let Err(err) = result {
        error!("Failed to write audit log entry: {err}");
    }
}
