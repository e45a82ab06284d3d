//! SQLite dialect implementation

use super::{append_limit, quote_parts, CatalogQuery, DatabaseBackend, SqlDialect};

/// SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

fn julian_days(date1: &str, date2: &str) -> String {
    format!("(julianday(date({})) - julianday(date({})))", date1, date2)
}

fn month_index(date: &str) -> String {
    format!(
        "(CAST(strftime('%Y', {d}) AS INTEGER) * 12 + CAST(strftime('%m', {d}) AS INTEGER))",
        d = date
    )
}

impl SqlDialect for SqliteDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '"', '"')
    }

    fn scope_separator(&self) -> &'static str {
        "."
    }

    fn currency_type(&self) -> &'static str {
        "decimal(10,2)"
    }

    fn now(&self) -> &'static str {
        "datetime('now', 'localtime')"
    }

    fn curdate(&self) -> &'static str {
        "date('now', 'localtime')"
    }

    fn date_diff(&self, date1: &str, date2: &str) -> String {
        format!("CAST({} AS INTEGER)", julian_days(date1, date2))
    }

    fn month_diff(&self, date1: &str, date2: &str) -> String {
        format!("({} - {})", month_index(date1), month_index(date2))
    }

    fn week_diff(&self, date1: &str, date2: &str) -> String {
        format!("(CAST({} AS INTEGER) / 7)", julian_days(date1, date2))
    }

    fn second_diff(&self, date1: &str, date2: &str) -> String {
        format!(
            "(CAST(strftime('%s', {}) AS INTEGER) - CAST(strftime('%s', {}) AS INTEGER))",
            date1, date2
        )
    }

    fn date_ymd(&self, date: &str) -> String {
        format!("strftime('%Y%m%d', {})", date)
    }

    fn day_of_week(&self, expr: &str) -> String {
        format!("(CAST(strftime('%w', {}) AS INTEGER) + 1)", expr)
    }

    fn hour(&self, expr: &str) -> String {
        format!("CAST(strftime('%H', {}) AS INTEGER)", expr)
    }

    fn week(&self, expr: &str) -> String {
        format!("CAST(strftime('%W', {}) AS INTEGER)", expr)
    }

    fn convert(&self, expr: &str, sql_type: &str) -> String {
        let target = if sql_type.trim().eq_ignore_ascii_case("INT") {
            "INTEGER"
        } else {
            sql_type
        };
        format!("CAST({} AS {})", expr, target)
    }

    fn locate(&self, substring: &str, expr: &str) -> String {
        format!("INSTR({}, {})", expr, substring)
    }

    fn concat(&self, exprs: &[&str]) -> String {
        exprs.join(" || ")
    }

    fn add_select_limit(&self, query: &str, limit: u64) -> String {
        append_limit(query, limit, false, &[])
    }

    fn current_database_query(&self) -> &'static str {
        "SELECT name FROM pragma_database_list WHERE seq = 0"
    }

    // one file per database, so there is no session switch
    fn use_database(&self, _database: &str) -> Option<String> {
        None
    }

    // files are created by the driver on open
    fn create_database(&self, _database: &str) -> Option<String> {
        None
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN"
    }

    fn columns_query(&self, table: &str) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT name AS column_name, \
                    type AS data_type, \
                    NULL AS char_length, \
                    NULL AS num_precision, \
                    NULL AS num_scale, \
                    CASE WHEN upper(type) LIKE '%UNSIGNED%' THEN 1 ELSE 0 END AS is_unsigned, \
                    NULL AS is_identity, \
                    CASE WHEN pk > 0 THEN 1 ELSE 0 END AS is_primary, \
                    dflt_value AS column_default \
             FROM pragma_table_info(?) \
             ORDER BY cid",
        )
        .bind(table)
    }

    fn tables_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT name AS table_name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
    }

    fn views_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT name AS table_name FROM sqlite_master WHERE type = 'view' ORDER BY name",
        )
    }
}
