//! # VisionSprint HTTP API Module
//!
//! JSON API consumed by the web front end, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health`, `GET /status`, `GET /stage` - public state
//! - `POST /stage/advance`, `PUT /stage` - admin stage control
//! - `POST /auth/session`, `GET /auth/me` - sign-in and the current user
//! - `GET /users`, `PUT /users/{id}/role` - admin user management
//! - `/ideas`, `/ideas/{id}`, `/ideas/{id}/vote`, `/ideas/{id}/join`
//! - `/teams`, `/teams/auto`, `/teams/{id}`, `/teams/{id}/members[/{user_id}]`
//! - `PUT /teams/{id}/submission` - demo upload by a team member
//! - `GET /submissions[/{id}]`, `POST /submissions/{id}/reactions`
//! - `GET /showcase` - submissions ranked by reactions
//! - `POST /export`, `GET /hash` - admin snapshot tools
//!
//! ## Security Configuration
//!
//! - `cors_origins` / `VISIONSPRINT_CORS_ORIGINS`: comma-separated origins, or `*` (default: localhost only)
//! - `rate_limit` / `VISIONSPRINT_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `auth_secret` / `VISIONSPRINT_AUTH_SECRET`: signs identity assertions and sessions

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;

pub use auth::{AuthKeys, CurrentUser, MIN_SECRET_LENGTH, MaybeUser};
pub use error::ApiError;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::*;

use crate::config::Config;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use visionsprint_core::{Hackathon, VisionSprintError};

/// Maximum request body size (2 MiB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub hackathon: Arc<RwLock<Hackathon>>,
    pub auth: Arc<AuthKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state from a hackathon and config. Fails without a usable auth secret.
    pub fn new(hackathon: Hackathon, config: Config) -> Result<Self, VisionSprintError> {
        let auth = AuthKeys::from_secret(config.require_auth_secret()?, config.session_ttl_secs)?;
        Ok(Self {
            hackathon: Arc::new(RwLock::new(hackathon)),
            auth: Arc::new(auth),
            config: Arc::new(config),
        })
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origins.
///
/// - `*`: any origin (development only)
/// - unset: localhost only
/// - otherwise: the comma-separated list
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (VISIONSPRINT_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", s);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", s, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for local front-end development.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = state.config.rate_limit;

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/stage",
            get(handlers::stage_handler).put(handlers::set_stage_handler),
        )
        .route("/stage/advance", post(handlers::advance_stage_handler))
        .route("/auth/session", post(handlers::session_handler))
        .route("/auth/me", get(handlers::me_handler))
        .route("/users", get(handlers::list_users_handler))
        .route("/users/{id}/role", put(handlers::set_role_handler))
        .route(
            "/ideas",
            get(handlers::list_ideas_handler).post(handlers::create_idea_handler),
        )
        .route(
            "/ideas/{id}",
            get(handlers::get_idea_handler)
                .put(handlers::update_idea_handler)
                .delete(handlers::delete_idea_handler),
        )
        .route(
            "/ideas/{id}/vote",
            post(handlers::vote_handler).delete(handlers::unvote_handler),
        )
        .route(
            "/ideas/{id}/join",
            post(handlers::join_handler).delete(handlers::leave_handler),
        )
        .route(
            "/teams",
            get(handlers::list_teams_handler).post(handlers::create_team_handler),
        )
        .route("/teams/auto", post(handlers::auto_teams_handler))
        .route(
            "/teams/{id}",
            get(handlers::get_team_handler).delete(handlers::disband_team_handler),
        )
        .route("/teams/{id}/members", post(handlers::add_member_handler))
        .route(
            "/teams/{id}/members/{user_id}",
            axum::routing::delete(handlers::remove_member_handler),
        )
        .route("/teams/{id}/submission", put(handlers::submit_demo_handler))
        .route("/submissions", get(handlers::list_submissions_handler))
        .route("/submissions/{id}", get(handlers::get_submission_handler))
        .route("/submissions/{id}/reactions", post(handlers::react_handler))
        .route("/showcase", get(handlers::showcase_handler))
        .route("/export", post(handlers::export_handler))
        .route("/hash", get(handlers::hash_handler));

    if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    let cors = build_cors_layer(state.config.cors_origins.as_deref());

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(config: Config, hackathon: Hackathon) -> Result<(), VisionSprintError> {
    let addr = config.bind_addr();
    let state = AppState::new(hackathon, config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VisionSprintError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("VisionSprint HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VisionSprintError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_requires_secret() {
        assert!(AppState::new(Hackathon::new(), Config::default()).is_err());

        let config = Config {
            auth_secret: Some("x".repeat(MIN_SECRET_LENGTH)),
            ..Config::default()
        };
        assert!(AppState::new(Hackathon::new(), config).is_ok());
    }
}
