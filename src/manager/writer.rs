//! Schema-aware writers and cross-connection table transfer

use super::SqlManager;
use crate::database::{ResultSet, SqlValue};
use crate::error::Result;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Types rendered as bare numeric literals
const NUMERIC_TYPES: &[&str] = &[
    "money",
    "smallmoney",
    "real",
    "numeric",
    "decimal",
    "float",
    "float4",
    "float8",
    "double",
    "bit",
    "newdecimal",
];

/// Types whose values pass through `clean_date_time`
const DATETIME_TYPES: &[&str] = &["datetime", "datetime2", "smalldatetime", "timestamp"];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

static CANONICAL_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}(:\d{2}(\.\d+)?)?$")
        .expect("clean_date_time: invalid canonical datetime regex")
});

// "Jan 05 2024 03:15PM", the SQL Server legacy text form
static LEGACY_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]{3})\s+(\d{1,2})\s+(\d{4})\s+(\d{1,2}):(\d{2})(?::\d{2}(?::\d+)?)?\s*([AP])M$")
        .expect("clean_date_time: invalid legacy datetime regex")
});

/// Normalize a datetime cell for re-insertion
///
/// Canonical `YYYY-MM-DD HH:MM[:SS]` values pass through unchanged and the
/// legacy `Mon DD YYYY HH:MMAM` form becomes `YYYY-MM-DD HH:MM`. Anything
/// else, including empty text, becomes `1900-01-01 00:00`.
pub fn clean_date_time(text: &str) -> String {
    let text = text.trim();
    if CANONICAL_DATETIME.is_match(text) {
        return text.to_string();
    }

    LEGACY_DATETIME
        .captures(text)
        .and_then(|caps| {
            let month = MONTHS
                .iter()
                .position(|m| m.eq_ignore_ascii_case(&caps[1]))?
                + 1;
            let day: u32 = caps[2].parse().ok()?;
            let year = &caps[3];
            let hour: u32 = caps[4].parse().ok()?;
            let minute = &caps[5];
            let pm = caps[6].eq_ignore_ascii_case("P");

            let hour = match (hour % 12, pm) {
                (h, true) => h + 12,
                (h, false) => h,
            };
            Some(format!(
                "{}-{:02}-{:02} {:02}:{}",
                year, month, day, hour, minute
            ))
        })
        .unwrap_or_else(|| "1900-01-01 00:00".to_string())
}

/// Render one source cell as a literal for an INSERT on the destination
pub(crate) fn transfer_literal(type_name: &str, value: &SqlValue) -> String {
    let text = match value {
        SqlValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => other.as_string().unwrap_or_default(),
    };
    let lowered = type_name.trim().to_lowercase();
    let base = lowered.split('(').next().unwrap_or_default().trim();

    if NUMERIC_TYPES.contains(&base) || base.contains("int") {
        if text.is_empty() {
            "0".to_string()
        } else {
            text
        }
    } else if DATETIME_TYPES.contains(&base) {
        format!("'{}'", clean_date_time(&text))
    } else {
        format!("'{}'", text.replace('\'', "''"))
    }
}

impl SqlManager {
    /// Keep only the entries of `values` naming columns of `table`, in caller order
    async fn known_columns<'v>(
        &mut self,
        table: &str,
        values: &'v IndexMap<String, SqlValue>,
        which: &str,
    ) -> Result<Option<Vec<(&'v String, &'v SqlValue)>>> {
        let Some(definition) = self.table_definition(table, which).await? else {
            log::warn!("Table '{}' does not exist; nothing written", table);
            return Ok(None);
        };

        let kept: Vec<_> = values
            .iter()
            .filter(|(column, _)| {
                let known = definition.contains_key(column.as_str());
                if !known {
                    log::debug!("Dropping unknown column '{}' for table '{}'", column, table);
                }
                known
            })
            .collect();

        if kept.is_empty() {
            log::warn!("No known columns for table '{}'; nothing written", table);
            return Ok(None);
        }
        Ok(Some(kept))
    }

    /// INSERT the values whose keys are real columns of `table`
    ///
    /// Unknown keys are dropped silently. `Ok(None)` when the table does not
    /// exist, no key survives, or the statement failed.
    pub async fn smart_insert(
        &mut self,
        table: &str,
        values: &IndexMap<String, SqlValue>,
        which: &str,
    ) -> Result<Option<ResultSet>> {
        let Some(kept) = self.known_columns(table, values, which).await? else {
            return Ok(None);
        };

        let dialect = self.dialect_for(which)?;
        let columns: Vec<String> = kept
            .iter()
            .map(|(column, _)| dialect.quote_identifier(column))
            .collect();
        let placeholders = vec!["?"; kept.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );
        let params: Vec<SqlValue> = kept.into_iter().map(|(_, value)| value.clone()).collect();

        match self.prepare(&sql, which).await? {
            Some(statement) => self.execute(statement, params, which).await,
            None => Ok(None),
        }
    }

    /// UPDATE the known columns of `table`; `where_clause` is used verbatim
    pub async fn smart_update(
        &mut self,
        table: &str,
        values: &IndexMap<String, SqlValue>,
        where_clause: &str,
        which: &str,
    ) -> Result<Option<ResultSet>> {
        let Some(kept) = self.known_columns(table, values, which).await? else {
            return Ok(None);
        };

        let dialect = self.dialect_for(which)?;
        let assignments: Vec<String> = kept
            .iter()
            .map(|(column, _)| format!("{} = ?", dialect.quote_identifier(column)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            where_clause
        );
        let params: Vec<SqlValue> = kept.into_iter().map(|(_, value)| value.clone()).collect();

        match self.prepare(&sql, which).await? {
            Some(statement) => self.execute(statement, params, which).await,
            None => Ok(None),
        }
    }

    /// Copy the rows of `select_sql` on `source` into `dest`
    ///
    /// Each row becomes `insert_prefix VALUES (...)` with literals quoted by
    /// the source column types. All inserts run in one transaction on `dest`;
    /// a single failure rolls back the whole batch.
    pub async fn transfer(
        &mut self,
        source: &str,
        select_sql: &str,
        dest: &str,
        insert_prefix: &str,
    ) -> Result<bool> {
        let Some(result) = self.query(select_sql, source, None).await? else {
            return Ok(false);
        };

        let types: Vec<String> = result.fields().iter().map(|f| f.type_name.clone()).collect();
        let inserts: Vec<String> = result
            .rows()
            .map(|row| {
                let literals: Vec<String> = row
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        transfer_literal(types.get(i).map(String::as_str).unwrap_or_default(), value)
                    })
                    .collect();
                format!("{} VALUES ({})", insert_prefix, literals.join(","))
            })
            .collect();

        if !self.start_transaction(dest).await? {
            return Ok(false);
        }

        for sql in &inserts {
            match self.query(sql, dest, None).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    self.rollback_transaction(dest).await?;
                    log::warn!("Transfer from '{}' to '{}' rolled back", source, dest);
                    return Ok(false);
                }
                Err(e) => {
                    if let Err(rollback) = self.rollback_transaction(dest).await {
                        log::warn!("Rollback on '{}' failed: {}", dest, rollback);
                    }
                    return Err(e);
                }
            }
        }

        let committed = self.commit_transaction(dest).await?;
        log::info!(
            "Transferred {} rows from '{}' to '{}'",
            inserts.len(),
            source,
            dest
        );
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ConnectRequest;

    #[test]
    fn test_clean_date_time() {
        assert_eq!(clean_date_time("2024-01-05 03:15:00"), "2024-01-05 03:15:00");
        assert_eq!(clean_date_time("Jan 05 2024 03:15PM"), "2024-01-05 15:15");
        assert_eq!(clean_date_time("Dec  1 2023 12:05AM"), "2023-12-01 00:05");
        assert_eq!(clean_date_time("Dec 1 2023 12:05PM"), "2023-12-01 12:05");
        assert_eq!(clean_date_time(""), "1900-01-01 00:00");
        assert_eq!(clean_date_time("yesterday"), "1900-01-01 00:00");
    }

    #[test]
    fn test_transfer_literal() {
        assert_eq!(transfer_literal("decimal(10,2)", &SqlValue::from("1.50")), "1.50");
        assert_eq!(transfer_literal("INTEGER", &SqlValue::Null), "0");
        assert_eq!(transfer_literal("money", &SqlValue::from("")), "0");
        assert_eq!(transfer_literal("bigint unsigned", &SqlValue::from(7u64)), "7");
        assert_eq!(transfer_literal("varchar", &SqlValue::from("O'Neil")), "'O''Neil'");
        assert_eq!(
            transfer_literal("DATETIME", &SqlValue::from("Jan 05 2024 03:15PM")),
            "'2024-01-05 15:15'"
        );
        assert_eq!(transfer_literal("date", &SqlValue::from("2024-01-05")), "'2024-01-05'");
    }

    async fn manager() -> SqlManager {
        let mut manager = SqlManager::new(ConnectRequest::new(":memory:", "sqlite", "office"))
            .await
            .unwrap();
        manager
            .query(
                "CREATE TABLE products (upc VARCHAR(13), description VARCHAR(30), price DECIMAL(10,2))",
                "",
                None,
            )
            .await
            .unwrap()
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_smart_insert_drops_unknown_columns() {
        let mut manager = manager().await;
        let mut values = IndexMap::new();
        values.insert("upc".to_string(), SqlValue::from("0001"));
        values.insert("bogus".to_string(), SqlValue::from("x"));
        values.insert("price".to_string(), SqlValue::from(1.5));

        assert!(manager.smart_insert("products", &values, "").await.unwrap().is_some());

        let mut result = manager
            .query("SELECT upc, description, price FROM products", "", None)
            .await
            .unwrap()
            .unwrap();
        let row = result.fetch_row().unwrap();
        assert_eq!(row.get(0), Some(&SqlValue::from("0001")));
        assert_eq!(row.get(1), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn test_smart_insert_missing_table() {
        let mut manager = manager().await;
        let mut values = IndexMap::new();
        values.insert("upc".to_string(), SqlValue::from("0001"));
        assert!(manager.smart_insert("nothing", &values, "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_smart_update() {
        let mut manager = manager().await;
        manager
            .query("INSERT INTO products VALUES ('0001', 'soap', 1)", "", None)
            .await
            .unwrap()
            .unwrap();

        let mut values = IndexMap::new();
        values.insert("description".to_string(), SqlValue::from("rope"));
        values.insert("bogus".to_string(), SqlValue::from(1));
        assert!(manager
            .smart_update("products", &values, "upc = '0001'", "")
            .await
            .unwrap()
            .is_some());
        assert_eq!(manager.affected_rows(""), 1);

        assert!(manager
            .smart_update("products", &values, "no_such_column = 1", "")
            .await
            .unwrap()
            .is_none());
    }
}
