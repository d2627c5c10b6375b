use crate::models::query::{JoinSpec, Selection};
use crate::models::schema::ForeignKeyRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 生成 SQL 的请求
///
/// `joins` 存在即走显式模式；否则按 `foreign_keys` (若给出) 或数据源缓存的关系图做路径搜索。
#[derive(Debug, Deserialize)]
pub struct BuildQueryRequest {
    pub source_id: Option<String>,
    pub foreign_keys: Option<Vec<ForeignKeyRow>>,
    #[serde(flatten)]
    pub selection: Selection,
    pub joins: Option<HashMap<String, JoinSpec>>,
}

#[derive(Debug, Deserialize)]
pub struct RunQueryRequest {
    pub source_id: String,
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveQueryRequest {
    pub name: String,
    pub sql: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedQuery {
    pub sql: String,
    #[serde(default)]
    pub tables: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LastConnection {
    pub source_id: String,
    pub connected_at: DateTime<Utc>,
}
