//! 只读策略校验：执行任何 SQL 之前必须通过。

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// 可能修改数据库状态或执行代码的关键字
pub const BLACKLIST_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "EXEC", "CREATE", "ALTER", "DROP",
];

// 方括号是生成器的标识符引用方式，必须放行；`;` 不在其中
static ALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z0-9_\s,.*=<>!+\-/()%@'"\[\]]*$"#).expect("valid allowlist pattern")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_]+").expect("valid token pattern"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SqlGuardError {
    #[error("statement separator ';' is not allowed")]
    StatementSeparator,
    #[error("SQL comments are not allowed")]
    Comment,
    #[error("query contains characters outside the allowed set")]
    IllegalCharacters,
    #[error("keyword `{0}` is not allowed")]
    ForbiddenKeyword(String),
}

pub fn validate_sql(query: &str) -> Result<(), SqlGuardError> {
    if query.contains(';') {
        return Err(SqlGuardError::StatementSeparator);
    }
    if query.contains("--") || query.contains("/*") || query.contains("*/") {
        return Err(SqlGuardError::Comment);
    }
    if !ALLOWED_CHARS.is_match(query) {
        return Err(SqlGuardError::IllegalCharacters);
    }

    let upper = query.to_uppercase();
    for token in WORD.find_iter(&upper) {
        if BLACKLIST_KEYWORDS.contains(&token.as_str()) {
            return Err(SqlGuardError::ForbiddenKeyword(token.as_str().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_select_passes() {
        let sql = "SELECT [Orders].[id], [Customers].[name] FROM [Orders] \
                   LEFT JOIN [Customers] ON [Orders].[customer_id] = [Customers].[id]";
        assert_eq!(validate_sql(sql), Ok(()));
        assert_eq!(validate_sql("SELECT * FROM t WHERE name = 'x' AND n >= 2"), Ok(()));
    }

    #[test]
    fn separators_and_comments_are_rejected() {
        assert_eq!(validate_sql("SELECT 1; SELECT 2"), Err(SqlGuardError::StatementSeparator));
        assert_eq!(validate_sql("SELECT 1 -- hi"), Err(SqlGuardError::Comment));
        assert_eq!(validate_sql("SELECT /* x */ 1"), Err(SqlGuardError::Comment));
    }

    #[test]
    fn characters_outside_allowlist_are_rejected() {
        assert_eq!(validate_sql("SELECT `a` FROM t"), Err(SqlGuardError::IllegalCharacters));
        assert_eq!(
            validate_sql("SELECT a FROM t WHERE b = $1"),
            Err(SqlGuardError::IllegalCharacters)
        );
    }

    #[test]
    fn mutating_keywords_are_rejected_case_insensitively() {
        assert_eq!(
            validate_sql("delete FROM t"),
            Err(SqlGuardError::ForbiddenKeyword("DELETE".into()))
        );
        assert_eq!(
            validate_sql("SELECT * FROM t WHERE x IN (Drop)"),
            Err(SqlGuardError::ForbiddenKeyword("DROP".into()))
        );
    }

    #[test]
    fn keywords_inside_identifiers_are_not_tokens_of_their_own() {
        // `updated_at` 作为整体 token，不等于 UPDATE
        assert_eq!(validate_sql("SELECT [updated_at] FROM [t]"), Ok(()));
    }
}
