//! Schema introspection through per-dialect catalog queries

use super::{display_name, SqlManager};
use crate::database::dialects::{unquote_identifier, CatalogQuery};
use crate::database::schema::{cell_text, CatalogColumn};
use crate::database::{Row, TableSchema};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Last dotted part of a possibly qualified, possibly quoted table name
fn bare_table_name(name: &str) -> String {
    let unquoted = unquote_identifier(name);
    match unquoted.rsplit_once('.') {
        Some((_, table)) => table.to_string(),
        None => unquoted,
    }
}

impl SqlManager {
    /// Run a catalog query; `None` when it failed and was logged
    async fn catalog(&mut self, query: CatalogQuery, which: &str) -> Result<Option<Vec<Row>>> {
        if !self.registry.is_connected(which) {
            let backend = self.backend_for(which)?;
            return Err(Error::unsupported(
                backend.as_str(),
                format!("introspection without a live connection ({})", display_name(which)),
            ));
        }
        let result = self.query(&query.sql, which, Some(&query.params)).await?;
        Ok(result.map(|r| r.rows().collect()))
    }

    async fn catalog_columns(&mut self, table: &str, which: &str) -> Result<Vec<CatalogColumn>> {
        let query = self.dialect_for(which)?.columns_query(&bare_table_name(table));
        let rows = self.catalog(query, which).await?.unwrap_or_default();
        Ok(rows.iter().filter_map(CatalogColumn::from_row).collect())
    }

    async fn catalog_names(&mut self, query: CatalogQuery, which: &str) -> Result<Vec<String>> {
        let rows = self.catalog(query, which).await?.unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| row.get(0).and_then(cell_text))
            .collect())
    }

    /// Whether a table or view called `name` exists on the connection
    pub async fn table_exists(&mut self, name: &str, which: &str) -> Result<bool> {
        Ok(!self.catalog_columns(name, which).await?.is_empty())
    }

    /// Whether `name` is a view rather than a base table
    pub async fn is_view(&mut self, name: &str, which: &str) -> Result<bool> {
        if !self.table_exists(name, which).await? {
            return Ok(false);
        }
        let bare = bare_table_name(name);
        let query = self.dialect_for(which)?.views_query();
        let views = self.catalog_names(query, which).await?;
        Ok(views
            .iter()
            .any(|view| view == name || view.eq_ignore_ascii_case(&bare)))
    }

    /// Column name to declared type, in table order; `None` when the table is missing
    pub async fn table_definition(
        &mut self,
        name: &str,
        which: &str,
    ) -> Result<Option<IndexMap<String, String>>> {
        let columns = self.catalog_columns(name, which).await?;
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            columns
                .into_iter()
                .map(|column| {
                    let type_name = column.decorated_type();
                    (column.name, type_name)
                })
                .collect(),
        ))
    }

    /// Full column metadata, in table order; `None` when the table is missing
    pub async fn detailed_definition(
        &mut self,
        name: &str,
        which: &str,
    ) -> Result<Option<TableSchema>> {
        let dialect = self.dialect_for(which)?;
        let columns = self.catalog_columns(name, which).await?;
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            columns
                .iter()
                .map(|column| (column.name.clone(), column.definition(dialect)))
                .collect(),
        ))
    }

    /// Base tables and views of the current database
    pub async fn get_tables(&mut self, which: &str) -> Result<Vec<String>> {
        let query = self.dialect_for(which)?.tables_query();
        self.catalog_names(query, which).await
    }

    pub async fn get_views(&mut self, which: &str) -> Result<Vec<String>> {
        let query = self.dialect_for(which)?.views_query();
        self.catalog_names(query, which).await
    }

    /// Columns of `table1` that `table2` also has, in `table1` order
    pub async fn matching_columns(
        &mut self,
        table1: &str,
        table2: &str,
        which: &str,
    ) -> Result<Vec<String>> {
        self.matching_across(table1, which, table2, which).await
    }

    /// Shared columns of tables on two connections as a comma-separated list
    ///
    /// # Returns
    /// * `Ok(None)` - Either table is missing or they share no columns
    pub async fn get_matching_columns(
        &mut self,
        table1: &str,
        which1: &str,
        table2: &str,
        which2: &str,
    ) -> Result<Option<String>> {
        let shared = self.matching_across(table1, which1, table2, which2).await?;
        if shared.is_empty() {
            Ok(None)
        } else {
            Ok(Some(shared.join(", ")))
        }
    }

    async fn matching_across(
        &mut self,
        table1: &str,
        which1: &str,
        table2: &str,
        which2: &str,
    ) -> Result<Vec<String>> {
        let first = self.table_definition(table1, which1).await?.unwrap_or_default();
        let second = self.table_definition(table2, which2).await?.unwrap_or_default();
        Ok(first
            .into_keys()
            .filter(|column| second.contains_key(column))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ConnectRequest, TriState};

    async fn manager() -> SqlManager {
        let mut manager = SqlManager::new(ConnectRequest::new(":memory:", "sqlite", "office"))
            .await
            .unwrap();
        for sql in [
            "CREATE TABLE products (upc VARCHAR(13) PRIMARY KEY, description VARCHAR(30) DEFAULT 'none', normal_price DECIMAL(10,2) DEFAULT NULL)",
            "CREATE TABLE sales (id INTEGER PRIMARY KEY, upc VARCHAR(13), quantity INTEGER)",
            "CREATE VIEW priced AS SELECT upc, normal_price FROM products",
        ] {
            manager.query(sql, "", None).await.unwrap().unwrap();
        }
        manager
    }

    #[test]
    fn test_bare_table_name() {
        assert_eq!(bare_table_name("core_op.dbo.[products]"), "products");
        assert_eq!(bare_table_name("`sales`"), "sales");
    }

    #[tokio::test]
    async fn test_table_exists_and_is_view() {
        let mut manager = manager().await;
        assert!(manager.table_exists("products", "").await.unwrap());
        assert!(!manager.table_exists("missing", "").await.unwrap());
        assert!(manager.is_view("priced", "").await.unwrap());
        assert!(!manager.is_view("products", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_detailed_definition() {
        let mut manager = manager().await;
        let schema = manager.detailed_definition("products", "").await.unwrap().unwrap();

        assert_eq!(
            schema.keys().collect::<Vec<_>>(),
            vec!["upc", "description", "normal_price"]
        );
        assert_eq!(schema["upc"].type_name, "VARCHAR(13)");
        assert_eq!(schema["upc"].primary_key, TriState::True);
        assert_eq!(schema["upc"].increment, TriState::Unknown);
        assert_eq!(schema["description"].primary_key, TriState::False);
        assert_eq!(schema["description"].default.as_deref(), Some("none"));
        assert_eq!(schema["normal_price"].default, None);

        assert!(manager.detailed_definition("missing", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tables_views_and_matching_columns() {
        let mut manager = manager().await;
        assert_eq!(
            manager.get_tables("").await.unwrap(),
            vec!["priced", "products", "sales"]
        );
        assert_eq!(manager.get_views("").await.unwrap(), vec!["priced"]);
        assert_eq!(
            manager.matching_columns("sales", "products", "").await.unwrap(),
            vec!["upc"]
        );
        assert_eq!(
            manager
                .get_matching_columns("products", "", "priced", "")
                .await
                .unwrap(),
            Some("upc, normal_price".to_string())
        );
        assert_eq!(
            manager
                .get_matching_columns("products", "", "missing", "")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let mut manager = manager().await;
        assert!(matches!(
            manager.table_exists("products", "nowhere").await,
            Err(Error::ConnectionNotFound(_))
        ));
    }
}
