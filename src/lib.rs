pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod tracking;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::PgProjectStore;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};
use crate::tracking::{ProjectReader, ProjectStore};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let store: Arc<dyn ProjectStore> = Arc::new(PgProjectStore::new(pool.clone()));
    let reader = ProjectReader::new(store.clone(), config.self_heal);

    tracing::info!("Progress self-heal: {:?}", config.self_heal);

    let max_body_size = config.max_body_size;
    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        store,
        reader,
        login_limiter: LoginRateLimiter::new(),
    });

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(layers)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
