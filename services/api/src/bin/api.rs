//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpMailer},
    config::Config,
    error::ApiError,
    web::{
        create_document_handler, delete_document_handler, get_document_handler,
        list_documents_handler, send_document_handler, signer_view_handler,
        state::AppState, submit_signature_handler, update_document_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use rusttype::Font;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Load the Burn-In Font ---
    let font_bytes = std::fs::read(&config.burn_font_path).map_err(|e| {
        ApiError::Internal(format!(
            "Burn-in font {} is unreadable: {e}",
            config.burn_font_path.display()
        ))
    })?;
    let burn_font = Font::try_from_vec(font_bytes).ok_or_else(|| {
        ApiError::Internal(format!(
            "Burn-in font {} is not a valid TrueType file",
            config.burn_font_path.display()
        ))
    })?;

    // --- 4. Initialize Service Adapters ---
    let mailer = Arc::new(HttpMailer::new(
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store: db_adapter.clone(),
        requests: db_adapter,
        notifier: mailer,
        config: config.clone(),
        burn_font,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_url
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid FRONTEND_URL: {e}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let app = Router::new()
        .route(
            "/api/documents",
            get(list_documents_handler).post(create_document_handler),
        )
        .route(
            "/api/documents/{id}",
            get(get_document_handler)
                .put(update_document_handler)
                .delete(delete_document_handler),
        )
        .route("/api/documents/{id}/send", post(send_document_handler))
        .route("/api/sign/{token}", get(signer_view_handler))
        .route("/api/sign/{token}/submit", post(submit_signature_handler))
        // page rasters travel inline as data URIs, so allow large bodies
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
