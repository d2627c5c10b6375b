mod api;
mod core;
mod infra;
mod models;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::datasource::{connect, last_connection, list_data_sources, register_data_source};
use crate::api::query::{build_sql, delete_query, list_queries, run_sql, save_query};
use crate::api::schema::{
    get_metadata_columns, get_metadata_tables, get_relations, get_sample, refresh_schema,
};
use crate::infra::config::AppConfig;
use crate::infra::db_external::PoolManager;
use crate::infra::schema_cache::SchemaCache;
use crate::infra::store::Store;

pub mod ax_state {
    use super::*;
    pub struct AppState {
        pub config: AppConfig,
        pub store: Store,
        pub pool_manager: PoolManager,
        pub schema_cache: SchemaCache,
    }

    impl AppState {
        pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
            let store = Store::open(&config.store_dir).await?;
            Ok(Self {
                pool_manager: PoolManager::new(config.pool_max_connections),
                schema_cache: SchemaCache::new(chrono::Duration::hours(
                    config.schema_cache_ttl_hours,
                )),
                store,
                config,
            })
        }
    }
}

pub fn app(state: Arc<ax_state::AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/datasource", post(register_data_source))
        .route("/api/datasources", get(list_data_sources))
        .route("/api/datasources/{id}/connect", post(connect))
        .route("/api/datasources/{id}/tables", get(get_metadata_tables))
        .route("/api/datasources/{id}/columns", get(get_metadata_columns))
        .route("/api/datasources/{id}/relations", get(get_relations))
        .route("/api/datasources/{id}/refresh", post(refresh_schema))
        .route("/api/datasources/{id}/sample", get(get_sample))
        .route("/api/connection/last", get(last_connection))
        .route("/api/query/build", post(build_sql))
        .route("/api/query/run", post(run_sql))
        .route("/api/queries", get(list_queries).post(save_query))
        .route("/api/queries/{name}", delete(delete_query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;
    let state = Arc::new(ax_state::AppState::new(config).await?);

    info!("SQL Join Builder 运行在 http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
