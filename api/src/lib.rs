use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{
        AsyncDieselConnectionManager,
        deadpool::{BuildError, Pool},
    },
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::ServerConfig, storage::ImageStore};

pub mod blog;
pub mod config;
pub mod error;
pub mod identity;
pub mod json;
pub mod schema;
pub mod storage;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct App {
    pub diesel: DbPool,
    pub config: Arc<ServerConfig>,
    pub images: ImageStore,
}

/// Connections are opened lazily, building the pool never touches the database
pub fn db_pool(config: &ServerConfig) -> Result<DbPool, BuildError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    Pool::builder(manager)
        .max_size(config.database_max_connections)
        .build()
}

// Multipart framing on top of the largest accepted image
const BODY_LIMIT: usize = storage::MAX_IMAGE_SIZE + 64 * 1024;

fn cors(config: &ServerConfig) -> CorsLayer {
    let origins = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(app: App) -> Router {
    let cors = cors(&app.config);

    Router::new()
        .route("/health", get(health))
        .merge(identity::routes::route())
        .merge(blog::routes::route())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app)
}
