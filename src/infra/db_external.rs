use crate::core::quote::quote_table;
use crate::core::relation_graph::RelationGraph;
use crate::core::sql_guard::validate_sql;
use crate::infra::utils::{mysql_row_to_json, pg_row_to_json, sqlite_row_to_json};
use crate::models::schema::{table_identifier, DataSource, ForeignKeyRow, SchemaSnapshot};
use dashmap::DashMap;
use serde_json::Value;
use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Row, Sqlite,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const SQLITE_TABLES: &str = "
    SELECT name FROM sqlite_master
    WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'";

const PG_TABLES: &str = "
    SELECT table_schema::text, table_name::text FROM information_schema.tables
    WHERE table_type IN ('BASE TABLE', 'VIEW')
      AND table_schema NOT IN ('pg_catalog', 'information_schema')";

const MYSQL_TABLES: &str = "
    SELECT CAST(TABLE_SCHEMA AS CHAR), CAST(TABLE_NAME AS CHAR)
    FROM information_schema.TABLES
    WHERE TABLE_TYPE IN ('BASE TABLE', 'VIEW') AND TABLE_SCHEMA = DATABASE()";

// 引用隐式主键时 "to" 为空，这类外键无法确定列，跳过
const SQLITE_FOREIGN_KEYS: &str = r#"
    SELECT NULL AS parent_schema, m.name AS parent_table, f."from" AS parent_column,
           NULL AS ref_schema, f."table" AS ref_table, f."to" AS ref_column
    FROM sqlite_master m JOIN pragma_foreign_key_list(m.name) f
    WHERE m.type = 'table' AND f."to" IS NOT NULL
    ORDER BY m.name, f.id, f.seq"#;

// conkey/confkey 按位置一一对应，复合外键按序号展开成列对；以 conrelid 区分同名约束
const PG_FOREIGN_KEYS: &str = "
    SELECT pn.nspname::text AS parent_schema, pc.relname::text AS parent_table,
           pa.attname::text AS parent_column, rn.nspname::text AS ref_schema,
           rc.relname::text AS ref_table, ra.attname::text AS ref_column
    FROM pg_constraint con
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
         WITH ORDINALITY AS k(attnum, ref_attnum, ord)
    JOIN pg_class pc ON pc.oid = con.conrelid
    JOIN pg_namespace pn ON pn.oid = pc.relnamespace
    JOIN pg_attribute pa ON pa.attrelid = con.conrelid AND pa.attnum = k.attnum
    JOIN pg_class rc ON rc.oid = con.confrelid
    JOIN pg_namespace rn ON rn.oid = rc.relnamespace
    JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
    WHERE con.contype = 'f' AND pn.nspname NOT IN ('pg_catalog', 'information_schema')
    ORDER BY pn.nspname, pc.relname, con.conname, k.ord";

// KEY_COLUMN_USAGE 每行自带引用列，复合外键天然按列配对
const MYSQL_FOREIGN_KEYS: &str = "
    SELECT CAST(TABLE_SCHEMA AS CHAR) AS parent_schema,
           CAST(TABLE_NAME AS CHAR) AS parent_table,
           CAST(COLUMN_NAME AS CHAR) AS parent_column,
           CAST(REFERENCED_TABLE_SCHEMA AS CHAR) AS ref_schema,
           CAST(REFERENCED_TABLE_NAME AS CHAR) AS ref_table,
           CAST(REFERENCED_COLUMN_NAME AS CHAR) AS ref_column
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE REFERENCED_TABLE_NAME IS NOT NULL AND TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION";

pub enum DynamicPool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
}

/// 外部数据源连接池管理，同时承担 schema 探测与查询执行
pub struct PoolManager {
    pools: DashMap<String, Arc<DynamicPool>>,
    max_connections: u32,
}

impl PoolManager {
    pub fn new(max_connections: u32) -> Self {
        Self {
            pools: DashMap::new(),
            max_connections,
        }
    }

    /// 探测外部数据库的所有表与视图 (有 schema 维度的库返回 `schema.table`)
    pub async fn list_tables(&self, source: &DataSource) -> anyhow::Result<Vec<String>> {
        let pool = self.get_or_create_pool(source).await?;
        let mut tables = match &*pool {
            DynamicPool::Sqlite(p) => {
                let rows = sqlx::query(SQLITE_TABLES).fetch_all(p).await?;
                rows.into_iter()
                    .filter_map(|r| r.try_get::<String, _>(0).ok())
                    .collect::<Vec<_>>()
            }
            DynamicPool::Postgres(p) => {
                let rows = sqlx::query(PG_TABLES).fetch_all(p).await?;
                rows.into_iter()
                    .filter_map(|r| {
                        let schema: String = r.try_get(0).ok()?;
                        let name: String = r.try_get(1).ok()?;
                        Some(table_identifier(Some(&schema), &name))
                    })
                    .collect()
            }
            DynamicPool::MySql(p) => {
                let rows = sqlx::query(MYSQL_TABLES).fetch_all(p).await?;
                rows.into_iter()
                    .filter_map(|r| {
                        let schema: String = r.try_get(0).ok()?;
                        let name: String = r.try_get(1).ok()?;
                        Some(table_identifier(Some(&schema), &name))
                    })
                    .collect()
            }
        };
        tables.sort();
        Ok(tables)
    }

    /// 探测指定表的所有列名，按列定义顺序
    pub async fn list_columns(
        &self,
        source: &DataSource,
        table: &str,
    ) -> anyhow::Result<Vec<String>> {
        let pool = self.get_or_create_pool(source).await?;
        let (schema, name) = match table.split_once('.') {
            Some((s, n)) => (Some(s), n),
            None => (None, table),
        };
        let rows = match &*pool {
            DynamicPool::Sqlite(p) => {
                let rows = sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                    .bind(table)
                    .fetch_all(p)
                    .await?;
                rows.into_iter()
                    .filter_map(|r| r.try_get::<String, _>(0).ok())
                    .collect()
            }
            DynamicPool::Postgres(p) => {
                let rows = sqlx::query(
                    "SELECT column_name::text FROM information_schema.columns
                     WHERE table_name = $1 AND ($2::text IS NULL OR table_schema = $2)
                     ORDER BY ordinal_position",
                )
                .bind(name)
                .bind(schema)
                .fetch_all(p)
                .await?;
                rows.into_iter()
                    .filter_map(|r| r.try_get::<String, _>(0).ok())
                    .collect()
            }
            DynamicPool::MySql(p) => {
                let rows = sqlx::query(
                    "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.COLUMNS
                     WHERE TABLE_NAME = ? AND TABLE_SCHEMA = COALESCE(?, DATABASE())
                     ORDER BY ORDINAL_POSITION",
                )
                .bind(name)
                .bind(schema)
                .fetch_all(p)
                .await?;
                rows.into_iter()
                    .filter_map(|r| r.try_get::<String, _>(0).ok())
                    .collect()
            }
        };
        Ok(rows)
    }

    /// 读取全部外键约束，每行一对列，作为关系图的原始输入
    pub async fn list_foreign_keys(
        &self,
        source: &DataSource,
    ) -> anyhow::Result<Vec<ForeignKeyRow>> {
        let pool = self.get_or_create_pool(source).await?;
        let rows = match &*pool {
            DynamicPool::Sqlite(p) => {
                sqlx::query_as::<_, ForeignKeyRow>(SQLITE_FOREIGN_KEYS)
                    .fetch_all(p)
                    .await?
            }
            DynamicPool::Postgres(p) => {
                sqlx::query_as::<_, ForeignKeyRow>(PG_FOREIGN_KEYS)
                    .fetch_all(p)
                    .await?
            }
            DynamicPool::MySql(p) => {
                sqlx::query_as::<_, ForeignKeyRow>(MYSQL_FOREIGN_KEYS)
                    .fetch_all(p)
                    .await?
            }
        };
        Ok(rows)
    }

    /// 完整探测一次：表、列与关系图
    #[instrument(skip(self, source), fields(source_id = %source.id))]
    pub async fn discover(&self, source: &DataSource) -> anyhow::Result<SchemaSnapshot> {
        let tables = self.list_tables(source).await?;
        let mut columns = HashMap::with_capacity(tables.len());
        for table in &tables {
            columns.insert(table.clone(), self.list_columns(source, table).await?);
        }
        let foreign_keys = self.list_foreign_keys(source).await?;
        let graph = RelationGraph::build(&foreign_keys);

        info!(
            "schema 探测完成: {} 张表/视图, {} 条外键列对, 关系图覆盖 {} 张表",
            tables.len(),
            foreign_keys.len(),
            graph.table_count()
        );
        Ok(SchemaSnapshot { tables, columns, graph })
    }

    /// 校验并执行只读查询，结果最多返回 `limit` 行
    #[instrument(skip(self, source, sql), fields(source_id = %source.id))]
    pub async fn run_query(
        &self,
        source: &DataSource,
        sql: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Value>> {
        validate_sql(sql)?;
        let wrapped = format!("SELECT * FROM ({}) AS q LIMIT {}", sql, limit);
        debug!("执行查询: {}", wrapped);
        self.fetch_json(source, &wrapped).await
    }

    /// 取表的前 `limit` 行样例数据
    pub async fn sample_rows(
        &self,
        source: &DataSource,
        table: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Value>> {
        let pool = self.get_or_create_pool(source).await?;
        let target = match &*pool {
            DynamicPool::Sqlite(_) => quote_table(table),
            DynamicPool::Postgres(_) => quote_segments(table, '"', '"'),
            DynamicPool::MySql(_) => quote_segments(table, '`', '`'),
        };
        let sql = format!("SELECT * FROM {} LIMIT {}", target, limit);
        self.fetch_json(source, &sql).await
    }

    async fn fetch_json(&self, source: &DataSource, sql: &str) -> anyhow::Result<Vec<Value>> {
        let pool = self.get_or_create_pool(source).await?;
        let rows = match &*pool {
            DynamicPool::Sqlite(p) => sqlx::query(sql)
                .fetch_all(p)
                .await?
                .iter()
                .map(sqlite_row_to_json)
                .collect(),
            DynamicPool::Postgres(p) => sqlx::query(sql)
                .fetch_all(p)
                .await?
                .iter()
                .map(pg_row_to_json)
                .collect(),
            DynamicPool::MySql(p) => sqlx::query(sql)
                .fetch_all(p)
                .await?
                .iter()
                .map(mysql_row_to_json)
                .collect(),
        };
        Ok(rows)
    }

    pub async fn get_or_create_pool(
        &self,
        source: &DataSource,
    ) -> anyhow::Result<Arc<DynamicPool>> {
        if let Some(pool) = self.pools.get(&source.id) {
            return Ok(pool.clone());
        }
        let new_pool = match source.db_type.to_lowercase().as_str() {
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&source.connection_url)
                    .await?;
                Arc::new(DynamicPool::Sqlite(pool))
            }
            "postgres" | "postgresql" => {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&source.connection_url)
                    .await?;
                Arc::new(DynamicPool::Postgres(pool))
            }
            "mysql" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&source.connection_url)
                    .await?;
                Arc::new(DynamicPool::MySql(pool))
            }
            other => return Err(anyhow::anyhow!("Unsupported DB type: {}", other)),
        };
        info!("已建立数据源连接池: id={}, type={}", source.id, source.db_type);
        self.pools.insert(source.id.clone(), new_pool.clone());
        Ok(new_pool)
    }

    /// 数据源配置变更后丢弃旧连接池
    pub fn evict(&self, source_id: &str) {
        if self.pools.remove(source_id).is_some() {
            debug!("连接池已移除: id={}", source_id);
        }
    }
}

fn quote_segments(table: &str, open: char, close: char) -> String {
    table
        .split('.')
        .map(|seg| format!("{}{}{}", open, seg, close))
        .collect::<Vec<_>>()
        .join(".")
}
