//! Dialect-aware SQL fragments
//!
//! Each method renders a fragment for the dialect of the connection named
//! by `which`. Fragments are plain text for the caller to splice into its
//! own statements; nothing here contacts the server except
//! `default_database`.

use super::SqlManager;
use crate::database::schema::cell_text;
use crate::error::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};

impl SqlManager {
    /// Quote an identifier, part by part for dotted names
    pub fn identifier_escape(&self, name: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.quote_identifier(name))
    }

    /// Separator between a database name and a table name, `.` or `.dbo.`
    pub fn sep(&self, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.scope_separator().to_string())
    }

    /// Column type used for money amounts
    pub fn currency(&self, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.currency_type().to_string())
    }

    /// Engine tag of the connection: `mysql`, `mssql` or `sqlite`
    pub fn dbms_name(&self, which: &str) -> Result<String> {
        Ok(self.backend_for(which)?.as_str().to_string())
    }

    pub fn now(&self, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.now().to_string())
    }

    pub fn curdate(&self, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.curdate().to_string())
    }

    /// Whole days from `date2` to `date1`; positive when `date1` is later
    pub fn date_diff(&self, date1: &str, date2: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.date_diff(date1, date2))
    }

    /// Calendar months from `date2` to `date1`
    pub fn month_diff(&self, date1: &str, date2: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.month_diff(date1, date2))
    }

    /// Weeks from `date2` to `date1`
    pub fn week_diff(&self, date1: &str, date2: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.week_diff(date1, date2))
    }

    /// Seconds from `date2` to `date1`
    pub fn second_diff(&self, date1: &str, date2: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.second_diff(date1, date2))
    }

    /// Date formatted as `YYYYMMDD`
    pub fn date_ymd(&self, date: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.date_ymd(date))
    }

    /// Day of week numbered 1 (Sunday) through 7 (Saturday)
    pub fn day_of_week(&self, expr: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.day_of_week(expr))
    }

    pub fn hour(&self, expr: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.hour(expr))
    }

    pub fn week(&self, expr: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.week(expr))
    }

    /// Type conversion; `INT` maps to the dialect's signed integer type
    pub fn convert(&self, expr: &str, sql_type: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.convert(expr, sql_type))
    }

    /// 1-based position of `substring` in `expr`, 0 when absent
    pub fn locate(&self, substring: &str, expr: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.locate(substring, expr))
    }

    /// String concatenation of `exprs`
    pub fn concat(&self, exprs: &[&str], which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.concat(exprs))
    }

    /// Rewrite a SELECT so it returns at most `limit` rows
    pub fn add_select_limit(&self, query: &str, limit: u64, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.add_select_limit(query, limit))
    }

    /// Condition matching `column` values falling on the day of `date`
    ///
    /// `date` may be `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`; anything else
    /// means today.
    pub fn date_equals(&self, column: &str, date: &str) -> String {
        let day = parse_day(date).unwrap_or_else(|| Local::now().date_naive());
        let day = day.format("%Y-%m-%d");
        format!(
            "({} BETWEEN '{} 00:00:00' AND '{} 23:59:59')",
            column, day, day
        )
    }

    /// Ask the server which database the session is using
    pub async fn default_database(&mut self, which: &str) -> Result<Option<String>> {
        let sql = self.dialect_for(which)?.current_database_query();
        let result = self.query(sql, which, None).await?;
        Ok(result.and_then(|r| r.scalar().and_then(cell_text)))
    }
}

fn parse_day(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
