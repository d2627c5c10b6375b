//! 标识符引用：所有拼进 SQL 文本的表名、列名都必须经过这里。
//!
//! 约定为方括号风格：`schema.table` → `[schema].[table]`，列名 → `[column]`。
//! 不对内嵌的 `]` 做转义，名称合法性由上层校验负责。

/// 按 `.` 拆分表标识符，每段独立加方括号
pub fn quote_table(table: &str) -> String {
    format!("[{}]", table.split('.').collect::<Vec<_>>().join("].["))
}

pub fn quote_column(column: &str) -> String {
    format!("[{}]", column)
}

/// 完全限定列：`[schema].[table].[column]`
pub fn qualified_column(table: &str, column: &str) -> String {
    format!("{}.{}", quote_table(table), quote_column(column))
}
