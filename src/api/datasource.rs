use crate::api::schema::load_schema;
use crate::ax_state::AppState;
use crate::models::context::LastConnection;
use crate::models::schema::{CreateDataSourceRequest, DataSource};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// 按 id 取数据源配置，找不到时直接给出 404 响应
pub(crate) async fn find_source(state: &AppState, id: &str) -> Result<DataSource, Response> {
    match state.store.get_data_source(id).await {
        Ok(Some(s)) => Ok(s),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Source config not found").into_response()),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()),
    }
}

/// 注册或更新数据源；旧的连接池和 schema 缓存同时作废
pub async fn register_data_source(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDataSourceRequest>,
) -> impl IntoResponse {
    let source = DataSource::from(payload);
    let id = source.id.clone();
    if let Err(e) = state.store.upsert_data_source(source).await {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    state.pool_manager.evict(&id);
    state.schema_cache.invalidate(&id);
    info!("数据源配置已更新: id={}", id);
    (StatusCode::CREATED, "Source Registered").into_response()
}

pub async fn list_data_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list_data_sources().await {
        Ok(list) => Json(list).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 连接数据源：建立连接池、重新探测 schema、记录为最近一次连接
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let snapshot = match load_schema(&state, &source, true).await {
        Ok(s) => s,
        Err(e) => {
            warn!("连接数据源失败: id={}, err={}", id, e);
            return (StatusCode::BAD_GATEWAY, format!("Connection failed: {}", e)).into_response();
        }
    };

    let record = LastConnection {
        source_id: id.clone(),
        connected_at: Utc::now(),
    };
    if let Err(e) = state.store.set_last_connection(&record).await {
        warn!("最近连接记录写入失败: {}", e);
    }

    Json(json!({
        "source_id": id,
        "tables": snapshot.tables.len(),
        "related_tables": snapshot.graph.table_count(),
    }))
    .into_response()
}

pub async fn last_connection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.last_connection().await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No previous connection").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
