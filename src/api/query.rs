use crate::api::datasource::find_source;
use crate::api::schema::load_schema;
use crate::ax_state::AppState;
use crate::core::query_builder::{build_query, JoinSource};
use crate::core::relation_graph::RelationGraph;
use crate::core::sql_guard::{validate_sql, SqlGuardError};
use crate::models::context::{BuildQueryRequest, RunQueryRequest, SaveQueryRequest, SavedQuery};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 生成 SQL
///
/// 连接来源优先级：显式 `joins` > 请求内的 `foreign_keys` > 数据源缓存的关系图 > 空图。
#[instrument(skip_all, fields(tables = payload.selection.tables.len()))]
pub async fn build_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BuildQueryRequest>,
) -> impl IntoResponse {
    let sql = if let Some(joins) = &payload.joins {
        build_query(&payload.selection, JoinSource::Explicit(joins))
    } else {
        let owned;
        let snapshot;
        let graph = if let Some(rows) = &payload.foreign_keys {
            owned = RelationGraph::build(rows);
            &owned
        } else if let Some(id) = &payload.source_id {
            let source = match find_source(&state, id).await {
                Ok(s) => s,
                Err(resp) => return resp,
            };
            snapshot = match load_schema(&state, &source, false).await {
                Ok(s) => s,
                Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
            };
            &snapshot.graph
        } else {
            owned = RelationGraph::default();
            &owned
        };
        build_query(&payload.selection, JoinSource::Graph(graph))
    };

    debug!("生成 SQL: {}", sql);
    Json(json!({ "sql": sql })).into_response()
}

/// 校验并执行查询 (生成的或手写的)
pub async fn run_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunQueryRequest>,
) -> impl IntoResponse {
    let sql = payload.sql.trim();
    if sql.is_empty() {
        return (StatusCode::BAD_REQUEST, "Nothing to run").into_response();
    }
    if let Err(e) = validate_sql(sql) {
        warn!("拒绝执行: {}", e);
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    let source = match find_source(&state, &payload.source_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match state
        .pool_manager
        .run_query(&source, sql, state.config.max_result_rows)
        .await
    {
        Ok(rows) => Json(json!({
            "status": "success",
            "data": rows,
            "meta": { "sql": sql, "row_count": rows.len() }
        }))
        .into_response(),
        Err(e) if e.downcast_ref::<SqlGuardError>().is_some() => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::BAD_GATEWAY, format!("Query failed: {}", e)).into_response(),
    }
}

pub async fn list_queries(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list_queries().await {
        Ok(map) => Json(map).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn save_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SaveQueryRequest>,
) -> impl IntoResponse {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Query name is required").into_response();
    }
    let query = SavedQuery {
        sql: payload.sql,
        tables: payload.tables,
        saved_at: Utc::now(),
    };
    match state.store.save_query(&name, query).await {
        Ok(()) => {
            info!("命名查询已保存: {}", name);
            (StatusCode::CREATED, Json(json!({ "name": name }))).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn delete_query(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_query(&name).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Query not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
