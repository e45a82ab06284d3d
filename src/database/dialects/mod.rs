//! Database dialect implementations
//!
//! Each backend gets a unit struct implementing `SqlDialect`: identifier and
//! literal quoting, date arithmetic fragments, select-limit rewriting,
//! database bootstrap statements and the catalog queries used for schema
//! introspection. Dialects are pure string builders and never touch a
//! connection.

use crate::database::types::SqlValue;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mssql;
pub mod mysql;
pub mod sqlite;

pub use mssql::MssqlDialect;
pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

/// Database backend types supported by sqlbridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    MySql,
    Mssql,
    Sqlite,
}

impl DatabaseBackend {
    /// Resolve a driver tag as written in configuration (`mysqli`, `pdo_mysql`, `sqlsrv`, ...)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "mysql" | "mysqli" | "mysqlt" | "pdo" | "pdo_mysql" | "mariadb" => Some(Self::MySql),
            "mssql" | "mssqlnative" | "sqlsrv" | "pdo_sqlsrv" | "pdo_mssql" | "odbc_mssql"
            | "tds" => Some(Self::Mssql),
            "sqlite" | "sqlite3" | "pdo_sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Canonical engine name
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Mssql => "mssql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }

    /// The dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            DatabaseBackend::MySql => &MySqlDialect,
            DatabaseBackend::Mssql => &MssqlDialect,
            DatabaseBackend::Sqlite => &SqliteDialect,
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseBackend::MySql => Some(3306),
            DatabaseBackend::Mssql => Some(1433),
            DatabaseBackend::Sqlite => None,
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog statement plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl CatalogQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Trait for database-specific SQL generation
///
/// Column catalog queries must return the columns `column_name`,
/// `data_type`, `char_length`, `num_precision`, `num_scale`, `is_unsigned`,
/// `is_identity`, `is_primary` and `column_default`. `is_identity` is NULL
/// where the engine cannot tell. Table and view listings return `table_name`.
pub trait SqlDialect: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    /// Quote an identifier (table name, column name); dotted names are quoted per part
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Quote a string literal
    fn quote_string(&self, text: &str) -> String {
        format!("'{}'", text.replace('\'', "''"))
    }

    /// Generate a parameter placeholder for the given 1-based position
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    /// Whether backslash escapes characters inside string literals
    fn backslash_escapes(&self) -> bool {
        false
    }

    /// Separator between a database name and a table name
    fn scope_separator(&self) -> &'static str;

    /// Column type to use for money amounts
    fn currency_type(&self) -> &'static str;

    /// Current date and time expression
    fn now(&self) -> &'static str;

    /// Current date expression
    fn curdate(&self) -> &'static str;

    /// Whole days from `date2` to `date1`
    fn date_diff(&self, date1: &str, date2: &str) -> String;

    /// Calendar months from `date2` to `date1`
    fn month_diff(&self, date1: &str, date2: &str) -> String;

    /// Whole weeks from `date2` to `date1`
    fn week_diff(&self, date1: &str, date2: &str) -> String;

    /// Seconds from `date2` to `date1`
    fn second_diff(&self, date1: &str, date2: &str) -> String;

    /// Date rendered as an eight character `YYYYMMDD` string
    fn date_ymd(&self, date: &str) -> String;

    /// Day of week numbered 1 (Sunday) through 7 (Saturday)
    fn day_of_week(&self, expr: &str) -> String;

    fn hour(&self, expr: &str) -> String;

    fn week(&self, expr: &str) -> String;

    /// Cast an expression to a type
    fn convert(&self, expr: &str, sql_type: &str) -> String;

    /// 1-based position of `substring` within `expr`, 0 when absent
    fn locate(&self, substring: &str, expr: &str) -> String;

    /// String concatenation of the given expressions
    fn concat(&self, exprs: &[&str]) -> String;

    /// Rewrite a SELECT so it returns at most `limit` rows
    fn add_select_limit(&self, query: &str, limit: u64) -> String;

    /// Statement returning the name of the currently selected database
    fn current_database_query(&self) -> &'static str;

    /// Statement that switches the session to `database`; `None` when the engine has no such notion
    fn use_database(&self, database: &str) -> Option<String>;

    /// Statement that creates `database`; `None` when creation happens outside SQL
    fn create_database(&self, database: &str) -> Option<String>;

    fn begin_transaction(&self) -> &'static str;

    fn commit_transaction(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Column metadata for a table or view, in ordinal order
    fn columns_query(&self, table: &str) -> CatalogQuery;

    /// Names of the tables and views in the current database
    fn tables_query(&self) -> CatalogQuery;

    /// Names of the views in the current database
    fn views_query(&self) -> CatalogQuery;

    /// Normalize a catalog default expression; `None` means no default
    fn normalize_default(&self, raw: &str) -> Option<String> {
        normalize_default(raw)
    }
}

/// Lexical position of interest inside a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// A bare word and the parenthesis depth it sits at
    Word {
        start: usize,
        end: usize,
        depth: usize,
    },
    /// A `?` parameter marker
    Placeholder(usize),
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'#' | b'$') || b >= 0x80
}

/// Byte offset just past a quoted section opened at `start`
fn skip_quoted(bytes: &[u8], start: usize, close: u8, backslash: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash && b == b'\\' && close != b']' {
            i += 2;
            continue;
        }
        if b == close {
            // doubled closer is an escaped closer
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Scan a statement for bare words and placeholders, skipping literals,
/// quoted identifiers and comments
pub(crate) fn tokenize(sql: &str, backslash: bool) -> Vec<Token> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i, b, backslash),
            b'[' => i = skip_quoted(bytes, i, b']', false),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'?' => {
                tokens.push(Token::Placeholder(i));
                i += 1;
            }
            _ if is_word_byte(b) => {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Word {
                    start,
                    end: i,
                    depth,
                });
            }
            _ => i += 1,
        }
    }

    tokens
}

/// Byte ranges of the words at parenthesis depth zero
pub(crate) fn top_level_words(sql: &str, backslash: bool) -> Vec<(usize, usize)> {
    tokenize(sql, backslash)
        .into_iter()
        .filter_map(|token| match token {
            Token::Word { start, end, depth } if depth == 0 => Some((start, end)),
            _ => None,
        })
        .collect()
}

/// Start offsets of a top-level keyword
pub(crate) fn find_top_level_keyword(sql: &str, keyword: &str, backslash: bool) -> Vec<usize> {
    top_level_words(sql, backslash)
        .into_iter()
        .filter(|&(start, end)| sql[start..end].eq_ignore_ascii_case(keyword))
        .map(|(start, _)| start)
        .collect()
}

/// Rewrite `?` markers into the dialect's positional placeholders
pub fn bind_placeholders(sql: &str, dialect: &dyn SqlDialect) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut last = 0;
    let mut position = 0;

    for token in tokenize(sql, dialect.backslash_escapes()) {
        if let Token::Placeholder(at) = token {
            position += 1;
            out.push_str(&sql[last..at]);
            out.push_str(&dialect.placeholder(position));
            last = at + 1;
        }
    }
    out.push_str(&sql[last..]);
    out
}

/// Number of `?` markers outside literals and comments
pub(crate) fn count_placeholders(sql: &str, backslash: bool) -> usize {
    tokenize(sql, backslash)
        .iter()
        .filter(|token| matches!(token, Token::Placeholder(_)))
        .count()
}

/// Statement text without surrounding whitespace and trailing semicolons
pub(crate) fn trim_statement(query: &str) -> &str {
    query.trim().trim_end_matches(';').trim_end()
}

/// `LIMIT n` rewriting shared by engines with a trailing LIMIT clause
pub(crate) fn append_limit(
    query: &str,
    limit: u64,
    backslash: bool,
    lock_words: &[&str],
) -> String {
    let trimmed = trim_statement(query);

    if !find_top_level_keyword(trimmed, "LIMIT", backslash).is_empty() {
        return format!("SELECT * FROM ({}) AS limited_rows LIMIT {}", trimmed, limit);
    }

    // Locking clauses must stay after LIMIT
    let lock_at = top_level_words(trimmed, backslash)
        .into_iter()
        .find(|&(start, end)| {
            lock_words
                .iter()
                .any(|word| trimmed[start..end].eq_ignore_ascii_case(word))
        })
        .map(|(start, _)| start);

    match lock_at {
        Some(at) => format!(
            "{} LIMIT {} {}",
            trimmed[..at].trim_end(),
            limit,
            &trimmed[at..]
        ),
        None => format!("{} LIMIT {}", trimmed, limit),
    }
}

/// True when the outer parentheses of `value` enclose all of it
fn wrapped_in_parens(value: &str) -> bool {
    if !(value.starts_with('(') && value.ends_with(')')) {
        return false;
    }
    let mut depth = 0i32;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != value.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Strip the decoration engines put around column defaults
pub fn normalize_default(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    while value.len() >= 2 && wrapped_in_parens(value) {
        value = value[1..value.len() - 1].trim();
    }

    if value.eq_ignore_ascii_case("NULL") {
        return None;
    }

    let literal = value.strip_prefix('N').filter(|v| v.starts_with('\'')).unwrap_or(value);
    if literal.len() >= 2 && literal.starts_with('\'') && literal.ends_with('\'') {
        return Some(literal[1..literal.len() - 1].replace("''", "'"));
    }

    Some(value.to_string())
}

/// Remove identifier quoting (backticks, brackets or double quotes) from each dotted part
pub fn unquote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| {
            let part = part.trim();
            let inner = if part.len() >= 2
                && ((part.starts_with('`') && part.ends_with('`'))
                    || (part.starts_with('"') && part.ends_with('"'))
                    || (part.starts_with('[') && part.ends_with(']')))
            {
                &part[1..part.len() - 1]
            } else {
                part
            };
            inner.to_string()
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote each dotted part of an identifier with `open`/`close`, doubling embedded closers
pub(crate) fn quote_parts(identifier: &str, open: char, close: char) -> String {
    identifier
        .split('.')
        .map(|part| {
            let escaped = part.replace(close, &format!("{}{}", close, close));
            format!("{}{}{}", open, escaped, close)
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_tag() {
        assert_eq!(DatabaseBackend::from_tag("pdo_mysql"), Some(DatabaseBackend::MySql));
        assert_eq!(DatabaseBackend::from_tag("MYSQLI"), Some(DatabaseBackend::MySql));
        assert_eq!(DatabaseBackend::from_tag("sqlsrv"), Some(DatabaseBackend::Mssql));
        assert_eq!(DatabaseBackend::from_tag("mssqlnative"), Some(DatabaseBackend::Mssql));
        assert_eq!(DatabaseBackend::from_tag("sqlite3"), Some(DatabaseBackend::Sqlite));
        assert_eq!(DatabaseBackend::from_tag("postgres"), None);
        assert_eq!(DatabaseBackend::from_tag(""), None);
    }

    #[test]
    fn test_dialect_matches_backend() {
        for backend in [
            DatabaseBackend::MySql,
            DatabaseBackend::Mssql,
            DatabaseBackend::Sqlite,
        ] {
            assert_eq!(backend.dialect().backend(), backend);
        }
    }

    #[test]
    fn test_top_level_keywords_skip_nested_and_quoted() {
        let sql = "SELECT a FROM (SELECT b FROM t LIMIT 3) x WHERE c = 'limit' -- LIMIT\n";
        assert!(find_top_level_keyword(sql, "LIMIT", false).is_empty());
        assert_eq!(find_top_level_keyword(sql, "select", false), vec![0]);

        let sql = "SELECT `limit` FROM t LIMIT 5";
        assert_eq!(find_top_level_keyword(sql, "LIMIT", true).len(), 1);
    }

    #[test]
    fn test_backslash_escapes_only_when_enabled() {
        let sql = r"SELECT 'a\' LIMIT' FROM t";
        // with backslash escapes the literal is 'a\' LIMIT'
        assert!(find_top_level_keyword(sql, "LIMIT", true).is_empty());
        assert_eq!(find_top_level_keyword(sql, "FROM", true).len(), 1);
        // without them the literal closes after the backslash
        assert_eq!(find_top_level_keyword(sql, "LIMIT", false).len(), 1);
        assert!(find_top_level_keyword(sql, "FROM", false).is_empty());
    }

    #[test]
    fn test_bind_placeholders_skips_literals() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?";
        assert_eq!(
            bind_placeholders(sql, &MssqlDialect),
            "SELECT * FROM t WHERE a = @P1 AND b = '?' AND c = @P2"
        );
        assert_eq!(bind_placeholders(sql, &MySqlDialect), sql);
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default("((0))"), Some("0".to_string()));
        assert_eq!(normalize_default("('abc')"), Some("abc".to_string()));
        assert_eq!(normalize_default("N'it''s'"), Some("it's".to_string()));
        assert_eq!(normalize_default("NULL"), None);
        assert_eq!(normalize_default("(getdate())"), Some("getdate()".to_string()));
        assert_eq!(normalize_default("(1)+(2)"), Some("(1)+(2)".to_string()));
        assert_eq!(normalize_default("CURRENT_TIMESTAMP"), Some("CURRENT_TIMESTAMP".to_string()));
    }

    #[test]
    fn test_unquote_identifier() {
        assert_eq!(unquote_identifier("`orders`"), "orders");
        assert_eq!(unquote_identifier("[dbo].[orders]"), "dbo.orders");
        assert_eq!(unquote_identifier("\"v_sales\""), "v_sales");
        assert_eq!(unquote_identifier("plain"), "plain");
    }

    #[test]
    fn test_quote_parts_doubles_closer() {
        assert_eq!(quote_parts("a]b", '[', ']'), "[a]]b]");
        assert_eq!(quote_parts("db.t", '`', '`'), "`db`.`t`");
    }
}
