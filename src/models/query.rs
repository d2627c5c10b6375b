use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    Inner,
    #[default]
    Left,
    Right,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        };
        f.write_str(kw)
    }
}

/// `left_table.left_column = <当前表>.right_column`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JoinCondition {
    pub left_column: String,
    pub right_column: String,
}

/// 用户显式指定的连接方式，每个非锚点表一条，多个条件以 AND 连接
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JoinSpec {
    #[serde(rename = "type", default)]
    pub join_type: JoinType,
    pub left_table: String,
    #[serde(default)]
    pub conditions: Vec<JoinCondition>,
}

/// 一次生成请求的选择：表的顺序决定 FROM 锚点与 JOIN 顺序，列的顺序决定 SELECT 顺序
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Selection {
    pub tables: Vec<String>,
    #[serde(default)]
    pub columns: HashMap<String, Vec<String>>,
}

impl Selection {
    #[cfg(test)]
    pub fn new(tables: Vec<String>) -> Self {
        Self {
            tables,
            columns: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_columns(mut self, table: &str, columns: &[&str]) -> Self {
        self.columns.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn anchor(&self) -> Option<&str> {
        self.tables.first().map(String::as_str)
    }
}
