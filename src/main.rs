mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod ws;

use axum::{routing::get, Router};
use std::panic;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use db::dbdocs::DbContentStore;
use docs::ApiDoc;
use routes::api::create_api_routes;
use ws::handler::websocket_handler;
use ws::hub::SessionHub;

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "coscribe=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::set_config(config.clone());

    // Initialize database connection if URL is provided
    if let Some(db_url) = &config.db_url {
        match db::dbdocs::init_db(db_url).await {
            Ok(_) => info!("Database initialized successfully"),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Documents will not be loaded or persisted");
            }
        }
    } else {
        warn!("No database URL configured - documents will not be loaded or persisted");
    }

    // User lookup cache for the auth middleware
    services::userctx::init_user_ctx_cache();

    // Session hub over the document store
    let hub = Arc::new(SessionHub::new(Arc::new(DbContentStore)));

    // Create API routes
    let api_routes = create_api_routes(hub.clone());

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Real-time channel
        .route("/ws", get(websocket_handler).with_state(hub))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Browser clients connect from another origin
        .layer(CorsLayer::permissive())
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    // Start the HTTP server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
