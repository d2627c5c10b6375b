use crate::api::datasource::find_source;
use crate::ax_state::AppState;
use crate::models::schema::{DataSource, MetadataRequest, SchemaSnapshot};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// 取数据源的 schema 快照：缓存未过期时直接复用，`force` 或过期时重新探测并整体替换
pub(crate) async fn load_schema(
    state: &AppState,
    source: &DataSource,
    force: bool,
) -> anyhow::Result<Arc<SchemaSnapshot>> {
    let now = Utc::now();
    if !force {
        if let Some(snapshot) = state.schema_cache.get(&source.id, now) {
            return Ok(snapshot);
        }
    }
    let snapshot = state.pool_manager.discover(source).await?;
    info!("schema 快照已刷新: id={}", source.id);
    Ok(state.schema_cache.insert(&source.id, snapshot, now))
}

/// 获取外部数据库的表列表
pub async fn get_metadata_tables(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match load_schema(&state, &source, false).await {
        Ok(snapshot) => Json(snapshot.tables.clone()).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

/// 获取某张表的列列表
pub async fn get_metadata_columns(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(req): Query<MetadataRequest>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match load_schema(&state, &source, false).await {
        Ok(snapshot) => match snapshot.columns.get(&req.table) {
            Some(cols) => Json(cols.clone()).into_response(),
            None => (StatusCode::NOT_FOUND, "Table not found").into_response(),
        },
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

/// 外键关系图 (邻接表)
pub async fn get_relations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match load_schema(&state, &source, false).await {
        Ok(snapshot) => Json(snapshot.graph.clone()).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

pub async fn refresh_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match load_schema(&state, &source, true).await {
        Ok(snapshot) => Json(snapshot.tables.clone()).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

/// 表的样例数据
pub async fn get_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(req): Query<MetadataRequest>,
) -> impl IntoResponse {
    let source = match find_source(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    // 表名会拼进 SQL，只接受探测到的表
    match load_schema(&state, &source, false).await {
        Ok(snapshot) if snapshot.tables.contains(&req.table) => {}
        Ok(_) => return (StatusCode::NOT_FOUND, "Table not found").into_response(),
        Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
    match state
        .pool_manager
        .sample_rows(&source, &req.table, state.config.sample_rows)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}
