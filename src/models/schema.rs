use crate::core::relation_graph::RelationGraph;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// 外部数据源配置 (连接串明文保存，加密存储不在本服务范围内)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataSource {
    pub id: String,
    pub db_type: String,
    pub connection_url: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDataSourceRequest {
    pub id: String,
    pub db_type: String,
    pub connection_url: String,
    pub display_name: Option<String>,
}

impl From<CreateDataSourceRequest> for DataSource {
    fn from(req: CreateDataSourceRequest) -> Self {
        let display_name = req.display_name.unwrap_or_else(|| req.id.clone());
        Self {
            id: req.id,
            db_type: req.db_type,
            connection_url: req.connection_url,
            display_name,
        }
    }
}

/// 外键约束的一行：parent.column → ref.column
///
/// schema 为空时 (如 SQLite) 使用不带前缀的表名。
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct ForeignKeyRow {
    #[serde(default)]
    pub parent_schema: Option<String>,
    pub parent_table: String,
    pub parent_column: String,
    #[serde(default)]
    pub ref_schema: Option<String>,
    pub ref_table: String,
    pub ref_column: String,
}

impl ForeignKeyRow {
    pub fn parent(&self) -> String {
        table_identifier(self.parent_schema.as_deref(), &self.parent_table)
    }

    pub fn referenced(&self) -> String {
        table_identifier(self.ref_schema.as_deref(), &self.ref_table)
    }
}

/// `schema.table`，或无 schema 维度时的 `table`
pub fn table_identifier(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) if !s.is_empty() => format!("{}.{}", s, table),
        _ => table.to_string(),
    }
}

/// 一次 schema 探测的完整快照，构建后只读，刷新时整体替换
#[derive(Debug, Serialize, Clone, Default)]
pub struct SchemaSnapshot {
    pub tables: Vec<String>,
    pub columns: HashMap<String, Vec<String>>,
    pub graph: RelationGraph,
}

#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub table: String,
}
