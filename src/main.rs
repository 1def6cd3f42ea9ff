use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use groupstage_backend::config::Config;
use groupstage_backend::db::Database;
use groupstage_backend::{api, auth};

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "groupstage-backend" }))
}

/// Creates the initial administrator account if none exists yet, so a
/// fresh deployment has someone who can create tournaments.
async fn seed_admin(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    if db.get_user_by_username(&username).await?.is_some() {
        return Ok(());
    }

    let email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    let password_hash = auth::hash_password(&password)?;
    db.create_user(&username, &email, &password_hash, "ADMIN")
        .await?;
    tracing::info!("Created admin user '{username}'");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    if let Err(e) = seed_admin(&db).await {
        tracing::error!("Admin seeding failed: {e}");
    }

    let app = Router::new()
        .route("/health", get(health_check))
        // Auth routes (no auth required)
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .with_state(db.clone())
        .merge(api::router(db))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {}: {e}", config.port));

    tracing::info!("groupstage backend listening on port {}", config.port);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
