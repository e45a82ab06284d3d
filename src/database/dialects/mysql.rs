//! MySQL/MariaDB dialect implementation

use super::{append_limit, quote_parts, CatalogQuery, DatabaseBackend, SqlDialect};

/// MySQL/MariaDB dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '`', '`')
    }

    fn quote_string(&self, text: &str) -> String {
        let mut quoted = String::with_capacity(text.len() + 2);
        quoted.push('\'');
        for c in text.chars() {
            match c {
                '\\' => quoted.push_str("\\\\"),
                '\'' => quoted.push_str("\\'"),
                '"' => quoted.push_str("\\\""),
                '\0' => quoted.push_str("\\0"),
                '\n' => quoted.push_str("\\n"),
                '\r' => quoted.push_str("\\r"),
                '\x1a' => quoted.push_str("\\Z"),
                other => quoted.push(other),
            }
        }
        quoted.push('\'');
        quoted
    }

    fn backslash_escapes(&self) -> bool {
        true
    }

    fn scope_separator(&self) -> &'static str {
        "."
    }

    fn currency_type(&self) -> &'static str {
        "decimal(10,2)"
    }

    fn now(&self) -> &'static str {
        "NOW()"
    }

    fn curdate(&self) -> &'static str {
        "CURDATE()"
    }

    fn date_diff(&self, date1: &str, date2: &str) -> String {
        format!("datediff({}, {})", date1, date2)
    }

    fn month_diff(&self, date1: &str, date2: &str) -> String {
        format!(
            "period_diff(date_format({}, '%Y%m'), date_format({}, '%Y%m'))",
            date1, date2
        )
    }

    fn week_diff(&self, date1: &str, date2: &str) -> String {
        format!("TIMESTAMPDIFF(WEEK, {}, {})", date2, date1)
    }

    fn second_diff(&self, date1: &str, date2: &str) -> String {
        format!("TIMESTAMPDIFF(SECOND, {}, {})", date2, date1)
    }

    fn date_ymd(&self, date: &str) -> String {
        format!("DATE_FORMAT({}, '%Y%m%d')", date)
    }

    fn day_of_week(&self, expr: &str) -> String {
        format!("DATE_FORMAT({}, '%w')+1", expr)
    }

    fn hour(&self, expr: &str) -> String {
        format!("HOUR({})", expr)
    }

    fn week(&self, expr: &str) -> String {
        format!("WEEK({})", expr)
    }

    fn convert(&self, expr: &str, sql_type: &str) -> String {
        // CONVERT() has no INT target, only SIGNED/UNSIGNED
        let target = if sql_type.trim().eq_ignore_ascii_case("INT") {
            "SIGNED"
        } else {
            sql_type
        };
        format!("CONVERT({}, {})", expr, target)
    }

    fn locate(&self, substring: &str, expr: &str) -> String {
        format!("LOCATE({}, {})", substring, expr)
    }

    fn concat(&self, exprs: &[&str]) -> String {
        format!("CONCAT({})", exprs.join(", "))
    }

    fn add_select_limit(&self, query: &str, limit: u64) -> String {
        append_limit(query, limit, true, &["FOR", "LOCK"])
    }

    fn current_database_query(&self) -> &'static str {
        "SELECT DATABASE()"
    }

    fn use_database(&self, database: &str) -> Option<String> {
        Some(format!("USE {}", self.quote_identifier(database)))
    }

    fn create_database(&self, database: &str) -> Option<String> {
        Some(format!("CREATE DATABASE {}", self.quote_identifier(database)))
    }

    fn begin_transaction(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn columns_query(&self, table: &str) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT c.COLUMN_NAME AS column_name, \
                    c.DATA_TYPE AS data_type, \
                    c.CHARACTER_MAXIMUM_LENGTH AS char_length, \
                    c.NUMERIC_PRECISION AS num_precision, \
                    c.NUMERIC_SCALE AS num_scale, \
                    CASE WHEN c.COLUMN_TYPE LIKE '%unsigned%' THEN 1 ELSE 0 END AS is_unsigned, \
                    CASE WHEN c.EXTRA LIKE '%auto_increment%' THEN 1 ELSE 0 END AS is_identity, \
                    CASE WHEN EXISTS (SELECT 1 FROM INFORMATION_SCHEMA.STATISTICS s \
                        WHERE s.TABLE_SCHEMA = c.TABLE_SCHEMA AND s.TABLE_NAME = c.TABLE_NAME \
                        AND s.COLUMN_NAME = c.COLUMN_NAME AND s.INDEX_NAME = 'PRIMARY') \
                        THEN 1 ELSE 0 END AS is_primary, \
                    c.COLUMN_DEFAULT AS column_default \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             WHERE c.TABLE_SCHEMA = DATABASE() AND c.TABLE_NAME = ? \
             ORDER BY c.ORDINAL_POSITION",
        )
        .bind(table)
    }

    fn tables_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() ORDER BY TABLE_NAME",
        )
    }

    fn views_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'VIEW' ORDER BY TABLE_NAME",
        )
    }
}
