use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

pub fn pg_row_to_json(row: &PgRow) -> Value {
    let mut map = Map::new();

    for col in row.columns() {
        let name = col.name();
        let type_name = col.type_info().name(); // 数据库原生类型名，如 "INT4", "NUMERIC"

        let val = match type_name {
            "INT2" | "INT4" => json!(row.try_get::<Option<i32>, _>(name).unwrap_or(None)),
            "INT8" => json!(row.try_get::<Option<i64>, _>(name).unwrap_or(None)),
            "FLOAT4" | "FLOAT8" => json!(row.try_get::<Option<f64>, _>(name).unwrap_or(None)),
            "NUMERIC" => {
                let v: Option<rust_decimal::Decimal> = row.try_get(name).unwrap_or(None);
                // 金额转为 f64 输出
                json!(v.map(|d| d.to_f64().unwrap_or(0.0)))
            }
            "BOOL" => json!(row.try_get::<Option<bool>, _>(name).unwrap_or(None)),
            "DATE" => json!(row
                .try_get::<Option<NaiveDate>, _>(name)
                .unwrap_or(None)
                .map(|d| d.to_string())),
            "TIMESTAMP" => json!(row
                .try_get::<Option<NaiveDateTime>, _>(name)
                .unwrap_or(None)
                .map(|dt| dt.to_string())),
            // 带时区的时间戳只能按 DateTime<Utc> 解码
            "TIMESTAMPTZ" => json!(row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .unwrap_or(None)
                .map(|dt| dt.to_rfc3339())),
            "JSON" | "JSONB" => row
                .try_get::<Option<Value>, _>(name)
                .unwrap_or(None)
                .unwrap_or(Value::Null),
            // TEXT / VARCHAR / BPCHAR / NAME 以及未知类型，都尝试按字符串读取
            _ => json!(row.try_get::<Option<String>, _>(name).unwrap_or(None)),
        };
        map.insert(name.to_string(), val);
    }

    Value::Object(map)
}

pub fn mysql_row_to_json(row: &MySqlRow) -> Value {
    let mut map = Map::new();

    for col in row.columns() {
        let name = col.name();
        let type_name = col.type_info().name(); // 如 "INT", "DECIMAL", "VARCHAR", "DATE"

        let val = match type_name {
            "TINYINT" | "SMALLINT" | "INT" | "MEDIUMINT" => {
                json!(row.try_get::<Option<i32>, _>(name).unwrap_or(None))
            }
            "BIGINT" => json!(row.try_get::<Option<i64>, _>(name).unwrap_or(None)),
            "FLOAT" | "DOUBLE" => json!(row.try_get::<Option<f64>, _>(name).unwrap_or(None)),
            "DECIMAL" | "NEWDECIMAL" => {
                let v: Option<rust_decimal::Decimal> = row.try_get(name).unwrap_or(None);
                json!(v.map(|d| d.to_string()))
            }
            "DATE" => json!(row
                .try_get::<Option<NaiveDate>, _>(name)
                .unwrap_or(None)
                .map(|d| d.to_string())),
            "DATETIME" | "TIMESTAMP" => json!(row
                .try_get::<Option<NaiveDateTime>, _>(name)
                .unwrap_or(None)
                .map(|dt| dt.to_string())),
            _ => json!(row.try_get::<Option<String>, _>(name).unwrap_or(None)),
        };

        map.insert(name.to_string(), val);
    }

    Value::Object(map)
}

/// SQLite 是动态类型，列声明类型不可靠，按取值逐个尝试
pub fn sqlite_row_to_json(row: &SqliteRow) -> Value {
    let mut map = Map::new();

    for (idx, col) in row.columns().iter().enumerate() {
        let val = match col.type_info().name() {
            "NULL" => sqlite_dynamic_value(row, idx),
            "INTEGER" => json!(row.try_get::<Option<i64>, _>(idx).unwrap_or(None)),
            "REAL" => json!(row.try_get::<Option<f64>, _>(idx).unwrap_or(None)),
            "BOOLEAN" => json!(row.try_get::<Option<bool>, _>(idx).unwrap_or(None)),
            "BLOB" => json!(row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .unwrap_or(None)
                .map(|b| format!("<{} bytes>", b.len()))),
            _ => sqlite_dynamic_value(row, idx),
        };
        map.insert(col.name().to_string(), val);
    }

    Value::Object(map)
}

fn sqlite_dynamic_value(row: &SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return json!(v);
    }
    json!(row.try_get::<Option<String>, _>(idx).unwrap_or(None))
}
