//! Resource Share Backend
//!
//! A REST backend for sharing categorized resource links and discussing them in
//! comments, with SQLite persistence and token authentication.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod permissions;

use std::sync::Arc;

use axum::{
    http::{Method, Uri},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::Caller;
use config::{Config, LogFormat};
use db::Repository;
use errors::AppError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    tracing::info!("Starting Resource Share Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    match &config.admin {
        Some(admin) => auth::ensure_admin(&repo, admin).await?,
        None => tracing::warn!(
            "No admin account configured (SHARE_ADMIN_USERNAME / SHARE_ADMIN_PASSWORD). \
             Categories can only be created by existing staff users."
        ),
    }

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = if state.config.cors_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    // API routes
    let api_routes = Router::new()
        // Categories
        .route(
            "/categories/",
            get(api::list_categories).post(api::create_category),
        )
        // Resources
        .route(
            "/resources/",
            get(api::list_resources).post(api::create_resource),
        )
        .route(
            "/resources/{key}/",
            get(api::get_resource_or_category)
                .put(api::update_resource)
                .patch(api::update_resource)
                .delete(api::delete_resource),
        )
        // Comments
        .route(
            "/resources/{key}/comments/",
            get(api::list_comments).post(api::create_comment),
        )
        .route(
            "/resources/{key}/comments/{comment_id}/",
            get(api::get_comment)
                .put(api::update_comment)
                .patch(api::update_comment)
                .delete(api::delete_comment),
        )
        // Accounts
        .route("/register/", post(api::register))
        .route("/login/", post(api::login));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Protected routes authenticate before reporting an unsupported method.
async fn method_not_allowed(method: Method, uri: Uri, caller: Caller) -> AppError {
    if caller.user().is_none() && !is_public_path(uri.path()) {
        return AppError::NotAuthenticated;
    }
    AppError::MethodNotAllowed(method.to_string())
}

fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/register/" | "/login/")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests;
