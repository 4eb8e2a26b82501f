// src/main.rs
use axum::{extract::Extension, middleware, routing::get, Json, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod blog;
mod common;
mod logging_middleware;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use blog::models::UserIdMatch;
use common::{AppConfig, AppState};
use services::identity::ServiceAccount;
use services::{BlobLog, FirebaseIdentity, S3ObjectStore, ServiceAccountSigner};

async fn root() -> Json<Vec<&'static str>> {
    Json(vec![""])
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    if config.user_id_match == UserIdMatch::Contains {
        warn!("USER_ID_MATCH=contains: post listing matches user ids by substring");
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder()
        .timeout(config.outbound_timeout)
        .build()?;

    let service_account = ServiceAccount::from_file(&config.service_account_path)?;
    let signer = ServiceAccountSigner::new(service_account)?;

    let identity = FirebaseIdentity::new(
        http_client,
        config.identity_toolkit_url.clone(),
        config.firebase_api_key.clone(),
        signer,
    )
    .with_failure_backoff(config.failure_backoff);
    info!(
        backoff_ms = config.failure_backoff.as_millis() as u64,
        "FirebaseIdentity initialized"
    );

    let object_store = S3ObjectStore::connect(&config).await;
    let posts = BlobLog::new(Arc::new(object_store), config.write_mode);

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState {
        identity: Arc::new(identity),
        posts: Arc::new(posts),
        posts_key: config.posts_key.clone(),
        user_id_match: config.user_id_match,
    });

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    // AllowOrigin::list rejects the wildcard, it has to go through AllowOrigin::any
    let allow_origin = if config.cors_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    let app = Router::new()
        .route("/", get(root))
        // ====================================================================
        // ACCOUNT ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // BLOG ROUTES
        // ====================================================================
        .merge(blog::blog_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ]),
        )
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
