//! HTTP server for the survey API
//!
//! Serves the JSON API described in [`routes`]. Authentication is a tower
//! layer in front of every handler; CORS wraps everything so preflight
//! requests never reach the auth check.

pub mod auth;
pub mod routes;
pub mod state;

pub use auth::{AuthLayer, AuthSession, CurrentUser};
pub use state::ServerAppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::SessionRegistry;
use crate::config::ServerConfig;
use crate::survey::SurveyRegistry;

/// Build the CORS layer. An empty origin list allows any origin.
fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    // Explicit headers instead of Any, since Authorization is not covered by a wildcard
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    if cors_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let allowed_origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(allowed_origins)
    }
}

/// Assemble the application router
///
/// Layer order: cors (outer) -> auth -> handler
pub fn build_router(state: ServerAppState, cors_origins: &[String]) -> Router {
    routes::api_routes()
        .layer(AuthLayer::new(state.sessions.clone()))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Run the HTTP server until a shutdown is requested
pub async fn run_server(config: &ServerConfig, state: ServerAppState) -> Result<(), String> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    SurveyRegistry::start_cleanup_task(state.surveys.clone());
    SessionRegistry::start_purge_task(state.sessions.clone());

    let cors_display = if config.cors_origins.is_empty() {
        "*".to_string()
    } else {
        config.cors_origins.join(", ")
    };

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                     AI Adoption Survey                        ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║                                                               ║");
    println!("║  Server URL: http://{}:{:<24}  ║", config.bind, config.port);
    println!("║  CORS Origins: {:<45}║", cors_display);
    println!("║  Questions: {:<49}║", state.catalog.list_active().len());
    println!("║                                                               ║");
    println!("║  Endpoints:                                                   ║");
    println!("║    GET  /api/health        - Health check                    ║");
    println!("║    GET  /api/questions     - Question catalog                ║");
    println!("║    POST /api/auth/*        - Register, sign in, sign out     ║");
    println!("║    *    /api/evaluations   - Stored evaluations              ║");
    println!("║    *    /api/surveys       - Survey wizard                   ║");
    println!("║                                                               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let app = build_router(state.clone(), &config.cors_origins);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    let shutdown_state = state.shutdown_state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_state.wait_for_shutdown().await })
        .await
        .map_err(|e| format!("Server error: {}", e))
}
