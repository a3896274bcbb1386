//! Arbor Admin API
//!
//! Gateway for the admin dashboard. Every request passes through the
//! session layer; the handlers themselves are thin JSON glue.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tracing_subscriber::EnvFilter;

use arbor_axum::{CurrentUser, SessionLayer, SessionLayerConfig};
use arbor_session::{
    DefaultPolicy, HttpAuthApi, ProtectedRoutes, Role, RouteRule, SessionConfig, SessionGatekeeper,
};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Arbor Admin API");

    let config = Config::from_env()?;

    // Ordered: most specific rules first, first match wins.
    let routes = ProtectedRoutes::new(
        vec![
            RouteRule::new("/admin/users/*", vec![Role::Admin]),
            RouteRule::new("/admin/plans/*", vec![Role::Admin]),
            RouteRule::new("/admin/*", vec![Role::Admin, Role::Manager]),
        ],
        DefaultPolicy::Open,
    );

    let gatekeeper = Arc::new(SessionGatekeeper::new(
        SessionConfig::new(&config.auth_base_url),
        HttpAuthApi::new(&config.auth_base_url),
        routes,
    ));
    let sweeper = gatekeeper.start_sweeper();

    let session_layer = SessionLayer::with_config(
        gatekeeper,
        SessionLayerConfig::new()
            .sign_in_path(&config.sign_in_path)
            .secure_cookies(config.secure_cookies),
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/admin/overview", get(overview))
        .route("/admin/users/me", get(me))
        .layer(session_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "READY"
}

async fn overview(user: CurrentUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "subject_id": user.subject_id,
        "roles": user.roles.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
    }))
}

async fn me(user: CurrentUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "subject_id": user.subject_id }))
}
