//! SQL Server dialect implementation

use super::{quote_parts, top_level_words, trim_statement, CatalogQuery, DatabaseBackend, SqlDialect};

/// SQL Server dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

const SET_OPERATORS: [&str; 3] = ["UNION", "EXCEPT", "INTERSECT"];

impl SqlDialect for MssqlDialect {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Mssql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '[', ']')
    }

    fn placeholder(&self, position: usize) -> String {
        format!("@P{}", position)
    }

    fn scope_separator(&self) -> &'static str {
        ".dbo."
    }

    fn currency_type(&self) -> &'static str {
        "money"
    }

    fn now(&self) -> &'static str {
        "GETDATE()"
    }

    fn curdate(&self) -> &'static str {
        "CAST(GETDATE() AS DATE)"
    }

    // DATEDIFF counts from its second argument to its third
    fn date_diff(&self, date1: &str, date2: &str) -> String {
        format!("datediff(dd, {}, {})", date2, date1)
    }

    fn month_diff(&self, date1: &str, date2: &str) -> String {
        format!("datediff(mm, {}, {})", date2, date1)
    }

    fn week_diff(&self, date1: &str, date2: &str) -> String {
        format!("datediff(wk, {}, {})", date2, date1)
    }

    fn second_diff(&self, date1: &str, date2: &str) -> String {
        format!("datediff(ss, {}, {})", date2, date1)
    }

    fn date_ymd(&self, date: &str) -> String {
        format!("CONVERT(CHAR(8), {}, 112)", date)
    }

    fn day_of_week(&self, expr: &str) -> String {
        // DATEPART(dw) depends on SET DATEFIRST
        format!("((DATEPART(dw, {}) + @@DATEFIRST - 1) % 7) + 1", expr)
    }

    fn hour(&self, expr: &str) -> String {
        format!("DATEPART(hh, {})", expr)
    }

    fn week(&self, expr: &str) -> String {
        format!("DATEPART(wk, {})", expr)
    }

    fn convert(&self, expr: &str, sql_type: &str) -> String {
        format!("CONVERT({}, {})", sql_type, expr)
    }

    fn locate(&self, substring: &str, expr: &str) -> String {
        format!("CHARINDEX({}, {})", substring, expr)
    }

    fn concat(&self, exprs: &[&str]) -> String {
        exprs.join("+")
    }

    fn add_select_limit(&self, query: &str, limit: u64) -> String {
        let trimmed = trim_statement(query);
        let words = top_level_words(trimmed, false);
        let word = |range: &(usize, usize)| trimmed.get(range.0..range.1).unwrap_or_default();

        let Some(select_at) = words
            .iter()
            .position(|w| word(w).eq_ignore_ascii_case("SELECT"))
        else {
            return trimmed.to_string();
        };

        // a leading CTE stays outside any derived table
        let (prefix, body) = trimmed.split_at(words[select_at].0);
        let body_words = &words[select_at..];
        let has = |keyword: &str| body_words.iter().any(|w| word(w).eq_ignore_ascii_case(keyword));
        let wrapped = || {
            format!(
                "{}SELECT TOP {} * FROM ({}) AS limited_rows",
                prefix, limit, body
            )
        };

        // TOP cannot be combined with OFFSET
        if has("OFFSET") {
            return if has("FETCH") {
                wrapped()
            } else {
                format!("{} FETCH NEXT {} ROWS ONLY", trimmed, limit)
            };
        }

        if SET_OPERATORS.iter().any(|op| has(op)) {
            // ORDER BY is rejected inside a derived table without TOP
            return if has("ORDER") {
                format!("{} OFFSET 0 ROWS FETCH NEXT {} ROWS ONLY", trimmed, limit)
            } else {
                wrapped()
            };
        }

        if has("TOP") {
            return wrapped();
        }

        let mut insert_after = words[select_at].1;
        if let Some(next) = words.get(select_at + 1) {
            let text = word(next);
            if text.eq_ignore_ascii_case("DISTINCT") || text.eq_ignore_ascii_case("ALL") {
                insert_after = next.1;
            }
        }

        format!(
            "{} TOP {}{}",
            &trimmed[..insert_after],
            limit,
            &trimmed[insert_after..]
        )
    }

    fn current_database_query(&self) -> &'static str {
        "SELECT DB_NAME()"
    }

    fn use_database(&self, database: &str) -> Option<String> {
        Some(format!("USE {}", self.quote_identifier(database)))
    }

    fn create_database(&self, database: &str) -> Option<String> {
        Some(format!("CREATE DATABASE {}", self.quote_identifier(database)))
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK TRANSACTION"
    }

    fn columns_query(&self, table: &str) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT c.COLUMN_NAME AS column_name, \
                    c.DATA_TYPE AS data_type, \
                    c.CHARACTER_MAXIMUM_LENGTH AS char_length, \
                    CAST(c.NUMERIC_PRECISION AS INT) AS num_precision, \
                    c.NUMERIC_SCALE AS num_scale, \
                    0 AS is_unsigned, \
                    COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)), \
                        c.COLUMN_NAME, 'IsIdentity') AS is_identity, \
                    CASE WHEN EXISTS (SELECT 1 FROM sys.indexes i \
                        JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                        JOIN sys.columns sc ON sc.object_id = ic.object_id AND sc.column_id = ic.column_id \
                        WHERE i.is_primary_key = 1 \
                        AND i.object_id = OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)) \
                        AND sc.name = c.COLUMN_NAME) \
                        THEN 1 ELSE 0 END AS is_primary, \
                    c.COLUMN_DEFAULT AS column_default \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             WHERE c.TABLE_NAME = ? \
             ORDER BY c.ORDINAL_POSITION",
        )
        .bind(table)
    }

    fn tables_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES ORDER BY TABLE_NAME",
        )
    }

    fn views_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.VIEWS ORDER BY TABLE_NAME",
        )
    }
}
