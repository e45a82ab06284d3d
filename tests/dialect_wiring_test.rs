//! Manager behaviour against MySQL and SQL Server dialects, using a recording
//! adapter in place of a live server.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlbridge::database::{DatabaseAdapter, StatementOutcome};
use sqlbridge::{DatabaseBackend, Error, FieldInfo, Result, SqlManager, SqlValue, TriState};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<(String, Vec<SqlValue>)>>>;

const CATALOG_COLUMNS: [&str; 9] = [
    "column_name",
    "data_type",
    "char_length",
    "num_precision",
    "num_scale",
    "is_unsigned",
    "is_identity",
    "is_primary",
    "column_default",
];

struct RecordingAdapter {
    name: String,
    backend: DatabaseBackend,
    journal: Journal,
}

impl RecordingAdapter {
    fn boxed(name: &str, backend: DatabaseBackend, journal: &Journal) -> Box<dyn DatabaseAdapter> {
        Box::new(Self {
            name: name.to_string(),
            backend,
            journal: Arc::clone(journal),
        })
    }

    fn catalog_rows() -> Vec<Vec<SqlValue>> {
        vec![
            vec![
                "id".into(),
                "int".into(),
                SqlValue::Null,
                10i64.into(),
                0i64.into(),
                1i64.into(),
                1i64.into(),
                1i64.into(),
                SqlValue::Null,
            ],
            vec![
                "upc".into(),
                "varchar".into(),
                13i64.into(),
                SqlValue::Null,
                SqlValue::Null,
                0i64.into(),
                0i64.into(),
                0i64.into(),
                SqlValue::Bytes(b"0".to_vec()),
            ],
            vec![
                "price".into(),
                "decimal".into(),
                SqlValue::Null,
                10i64.into(),
                2i64.into(),
                0i64.into(),
                0i64.into(),
                0i64.into(),
                "NULL".into(),
            ],
        ]
    }
}

#[async_trait]
impl DatabaseAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    fn supports_seek(&self) -> bool {
        self.backend != DatabaseBackend::Mssql
    }

    async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>> {
        self.journal
            .lock()
            .unwrap()
            .push((format!("PREPARE {}", sql), Vec::new()));
        Ok(Vec::new())
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome> {
        self.journal
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        if sql.contains("FAIL") {
            return Err(Error::driver("You have an error in your SQL syntax near 'FAIL'"));
        }
        // context switches only stick when sent as a plain batch
        if sql.starts_with("USE ") {
            return Err(Error::driver("USE sent as a parameterized call"));
        }
        if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            let fields = CATALOG_COLUMNS
                .iter()
                .map(|name| FieldInfo::new(*name, "varchar"))
                .collect();
            return Ok(StatementOutcome::rows(fields, Self::catalog_rows()));
        }
        if sql.starts_with("INSERT") {
            return Ok(StatementOutcome::write(1, Some(42)));
        }
        Ok(StatementOutcome::rows(
            vec![FieldInfo::new("n", "int")],
            vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]],
        ))
    }

    async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        self.journal
            .lock()
            .unwrap()
            .push((sql.to_string(), Vec::new()));
        if sql.contains("FAIL") {
            return Err(Error::driver(format!("Unknown database in '{}'", sql)));
        }
        Ok(0)
    }
}

fn manager_with(backend: DatabaseBackend, names: &[&str]) -> (SqlManager, Journal) {
    let journal = Journal::default();
    let mut manager = SqlManager::default();
    for name in names {
        manager.register_adapter(name, RecordingAdapter::boxed(name, backend, &journal));
    }
    (manager, journal)
}

fn statements(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap()
        .iter()
        .map(|(sql, _)| sql.clone())
        .collect()
}

#[tokio::test]
async fn test_mysql_detailed_definition() {
    let (mut manager, journal) = manager_with(DatabaseBackend::MySql, &["core_op"]);

    let schema = manager
        .detailed_definition("`products`", "core_op")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["id", "upc", "price"]);
    assert_eq!(schema["id"].type_name, "INT UNSIGNED");
    assert_eq!(schema["id"].increment, TriState::True);
    assert_eq!(schema["id"].primary_key, TriState::True);
    assert_eq!(schema["upc"].type_name, "VARCHAR(13)");
    assert_eq!(schema["upc"].increment, TriState::False);
    assert_eq!(schema["upc"].default.as_deref(), Some("0"));
    assert_eq!(schema["price"].type_name, "DECIMAL(10,2)");
    assert_eq!(schema["price"].default, None);

    let recorded = journal.lock().unwrap();
    let (_, params) = recorded.last().unwrap();
    assert_eq!(params, &vec![SqlValue::from("products")]);
}

#[tokio::test]
async fn test_mysql_smart_insert_prepares_known_columns() {
    let (mut manager, journal) = manager_with(DatabaseBackend::MySql, &["core_op"]);

    let mut values = IndexMap::new();
    values.insert("upc".to_string(), SqlValue::from("0001"));
    values.insert("bogus".to_string(), SqlValue::from("x"));
    values.insert("price".to_string(), SqlValue::from(1.99));

    assert!(manager
        .smart_insert("products", &values, "core_op")
        .await
        .unwrap()
        .is_some());
    assert_eq!(manager.insert_id("core_op"), Some(42));

    let recorded = journal.lock().unwrap();
    let insert = "INSERT INTO products (`upc`, `price`) VALUES (?, ?)";
    assert_eq!(recorded[recorded.len() - 2].0, format!("PREPARE {}", insert));
    assert_eq!(recorded[recorded.len() - 1].0, insert);
    assert_eq!(
        recorded[recorded.len() - 1].1,
        vec![SqlValue::from("0001"), SqlValue::from(1.99)]
    );
}

#[tokio::test]
async fn test_mysql_set_default_db_switches_database() {
    let (mut manager, journal) = manager_with(DatabaseBackend::MySql, &["core_op", "core_trans"]);

    assert!(manager.set_default_db("core_trans").await.unwrap());
    assert_eq!(manager.default_db(), Some("core_trans"));
    assert_eq!(statements(&journal), vec!["USE `core_trans`"]);

    assert_eq!(
        manager.escape("O'Neil\\", "").unwrap(),
        "'O\\'Neil\\\\'"
    );
    assert_eq!(
        manager.week_diff("a", "b", "").unwrap(),
        "TIMESTAMPDIFF(WEEK, b, a)"
    );
}

#[tokio::test]
async fn test_set_default_db_reports_failed_switch() {
    let (mut manager, _journal) = manager_with(DatabaseBackend::Mssql, &["core_op", "FAIL_db"]);

    assert!(manager.set_default_db("core_op").await.unwrap());
    assert!(!manager.set_default_db("FAIL_db").await.unwrap());
    assert_eq!(manager.default_db(), Some("FAIL_db"));
    assert_eq!(manager.error("FAIL_db"), "Unknown database in 'USE [FAIL_db]'");

    manager.throw_on_failure(true);
    assert!(matches!(
        manager.set_default_db("FAIL_db").await,
        Err(Error::QueryFailed { .. })
    ));
}

#[tokio::test]
async fn test_mssql_fragments() {
    let (mut manager, _journal) = manager_with(DatabaseBackend::Mssql, &["core_op"]);
    assert!(manager.set_default_db("core_op").await.unwrap());

    assert_eq!(manager.dbms_name("").unwrap(), "mssql");
    assert_eq!(manager.sep("").unwrap(), ".dbo.");
    assert_eq!(manager.currency("").unwrap(), "money");
    assert_eq!(manager.identifier_escape("products", "").unwrap(), "[products]");
    assert_eq!(manager.date_diff("a", "b", "").unwrap(), "datediff(dd, b, a)");
    assert_eq!(manager.concat(&["a", "b"], "").unwrap(), "a+b");
    assert_eq!(
        manager
            .add_select_limit("SELECT upc FROM products ORDER BY upc", 10, "")
            .unwrap(),
        "SELECT TOP 10 upc FROM products ORDER BY upc"
    );
}

#[tokio::test]
async fn test_mssql_transactions_and_forward_only_results() {
    let (mut manager, journal) = manager_with(DatabaseBackend::Mssql, &["core_op"]);

    assert!(manager.start_transaction("core_op").await.unwrap());
    assert!(manager.commit_transaction("core_op").await.unwrap());
    assert!(manager.rollback_transaction("core_op").await.unwrap());
    assert_eq!(
        statements(&journal),
        vec!["BEGIN TRANSACTION", "COMMIT TRANSACTION", "ROLLBACK TRANSACTION"]
    );

    let mut result = manager
        .query("SELECT n FROM t", "core_op", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.num_rows(), 2);
    assert!(matches!(result.data_seek(0), Err(Error::Unsupported { .. })));
}

#[tokio::test]
async fn test_failure_reporting_modes() {
    let (mut manager, _journal) = manager_with(DatabaseBackend::MySql, &["core_op"]);

    assert!(manager
        .query("SELECT FAIL", "core_op", None)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        manager.error("core_op"),
        "You have an error in your SQL syntax near 'FAIL'"
    );

    manager.throw_on_failure(true);
    match manager.query("SELECT FAIL", "core_op", None).await {
        Err(Error::QueryFailed { message }) => {
            assert!(message.contains("SELECT FAIL"));
            assert!(message.contains("near 'FAIL'"));
        }
        other => panic!("expected QueryFailed, got {:?}", other.map(|r| r.is_some())),
    }
}
