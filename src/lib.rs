pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod forum;
pub mod lists;
pub mod media;
pub mod profiles;
pub mod seed;

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

async fn middleware_logger(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::debug!(%method, %uri, "incoming request");

    let res = next.run(req).await;

    tracing::info!(%method, %uri, status = %res.status(), "request handled");
    Ok(res)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn api_routes() -> Router<SqlitePool> {
    Router::new()
        .route("/health", get(health))
        .merge(media::routes())
        .merge(forum::routes())
        .merge(lists::routes())
        .merge(profiles::routes())
}

/// The whole HTTP application, every route under `/api`.
pub fn app(db: SqlitePool) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(from_fn(middleware_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
