//! Router assembly and HTTP server lifecycle.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{delete, get, post},
    Extension, Router,
};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

use handlers::auth::{self, rate_limit, AuthState};

/// Build the application router with all layers applied.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(
    pool: Pool<Sqlite>,
    auth_state: Arc<AuthState>,
    allowed_origins: &[String],
) -> Result<Router> {
    let cors = cors_layer(allowed_origins)?;

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(auth::login::login))
        .route("/auth/refresh", post(auth::session::refresh))
        .route("/auth/logout", post(auth::session::logout))
        .route("/auth/me", get(auth::session::me))
        .route(
            "/auth/users",
            get(auth::users::list).post(auth::users::create),
        )
        .route("/auth/users/:id", delete(auth::users::delete))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        );

    Ok(app)
}

/// Start the server and run until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(
    port: u16,
    pool: Pool<Sqlite>,
    auth_state: Arc<AuthState>,
    allowed_origins: &[String],
) -> Result<()> {
    // Periodic cleanup keeps the rate limiter map bounded.
    rate_limit::spawn_sweeper(auth_state.rate_limiter().clone());

    let app = router(pool, auth_state, allowed_origins)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{port}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| origin_header_value(origin))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(AllowOrigin::list(origins)))
}

/// Normalize a configured origin to `scheme://host[:port]`.
fn origin_header_value(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let normalized = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&normalized).context("Failed to build CORS origin header")
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layer_rejects_invalid_origin() {
        let result = cors_layer(&["http://ok.example".to_string(), "\u{0}bad".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn cors_layer_accepts_origin_list() {
        let origins = vec![
            "http://localhost:5173".to_string(),
            "https://admin.orbit-studio.dev/".to_string(),
        ];
        assert!(cors_layer(&origins).is_ok());
    }
}
