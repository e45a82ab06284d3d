use indexmap::IndexMap;
use sqlbridge::{ConnectRequest, Error, SqlManager, SqlValue, TriState};
use std::fs;
use tempfile::TempDir;

async fn two_databases() -> (TempDir, SqlManager) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let host = dir.path().to_string_lossy().to_string();

    let mut manager = SqlManager::new(ConnectRequest::new(&host, "sqlite", "core_op"))
        .await
        .unwrap();
    assert!(manager
        .add_connection(&ConnectRequest::new(&host, "sqlite", "core_trans"))
        .await
        .unwrap());

    for (which, sql) in [
        (
            "core_op",
            "CREATE TABLE products (upc VARCHAR(13) PRIMARY KEY, description VARCHAR(30), \
             normal_price DECIMAL(10,2), modified DATETIME, qty INTEGER)",
        ),
        (
            "core_trans",
            "CREATE TABLE products_copy (upc VARCHAR(13), description VARCHAR(30), \
             normal_price DECIMAL(10,2), modified DATETIME, qty INTEGER CHECK (qty < 100))",
        ),
    ] {
        manager.query(sql, which, None).await.unwrap().unwrap();
    }

    (dir, manager)
}

async fn count(manager: &mut SqlManager, table: &str, which: &str) -> i64 {
    let result = manager
        .query(&format!("SELECT COUNT(*) FROM {}", table), which, None)
        .await
        .unwrap()
        .unwrap();
    result.scalar().and_then(SqlValue::as_i64).unwrap()
}

#[tokio::test]
async fn test_databases_are_created_on_first_connect() {
    let (dir, manager) = two_databases().await;
    assert!(dir.path().join("core_op.db").exists());
    assert!(dir.path().join("core_trans.db").exists());
    assert_eq!(manager.default_db(), Some("core_op"));
    assert_eq!(manager.registry().stats().live, 2);
}

#[tokio::test]
async fn test_date_diff_fragments() {
    let (_dir, mut manager) = two_databases().await;

    let same = manager.date_diff("'2024-05-01'", "'2024-05-01'", "").unwrap();
    let today = manager.curdate("").unwrap();
    let yesterday = "date('now', 'localtime', '-1 day')";
    let forward = manager.date_diff(&today, yesterday, "").unwrap();
    let months = manager.month_diff("'2024-03-15'", "'2023-12-01'", "").unwrap();

    let result = manager
        .query(&format!("SELECT {}, {}, {}", same, forward, months), "", None)
        .await
        .unwrap()
        .unwrap();
    let row = result.rows().next().unwrap();
    assert_eq!(row.get(0).and_then(SqlValue::as_i64), Some(0));
    assert_eq!(row.get(1).and_then(SqlValue::as_i64), Some(1));
    assert_eq!(row.get(2).and_then(SqlValue::as_i64), Some(3));
}

#[tokio::test]
async fn test_add_select_limit_caps_rows() {
    let (_dir, mut manager) = two_databases().await;
    for upc in ["1", "2", "3", "4"] {
        manager
            .query("INSERT INTO products (upc, qty) VALUES (?, 1)", "", Some(&[SqlValue::from(upc)]))
            .await
            .unwrap()
            .unwrap();
    }

    let limited = manager
        .add_select_limit("SELECT upc FROM products ORDER BY upc;", 2, "")
        .unwrap();
    let result = manager.query(&limited, "", None).await.unwrap().unwrap();
    assert_eq!(result.num_rows(), 2);

    let nested = manager.add_select_limit(&limited, 1, "").unwrap();
    let result = manager.query(&nested, "", None).await.unwrap().unwrap();
    assert_eq!(result.num_rows(), 1);
}

#[tokio::test]
async fn test_smart_insert_and_update() {
    let (_dir, mut manager) = two_databases().await;

    let mut values = IndexMap::new();
    values.insert("upc".to_string(), SqlValue::from("0000000004011"));
    values.insert("description".to_string(), SqlValue::from("BANANAS"));
    values.insert("not_a_column".to_string(), SqlValue::from("dropped"));
    values.insert("qty".to_string(), SqlValue::from(3));
    assert!(manager
        .smart_insert("products", &values, "core_op")
        .await
        .unwrap()
        .is_some());
    assert_eq!(count(&mut manager, "products", "core_op").await, 1);

    let mut changes = IndexMap::new();
    changes.insert("description".to_string(), SqlValue::from("ORGANIC BANANAS"));
    assert!(manager
        .smart_update("products", &changes, "upc = '0000000004011'", "core_op")
        .await
        .unwrap()
        .is_some());

    let mut result = manager
        .query("SELECT description FROM products", "core_op", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        result.fetch_row().unwrap().get_by_name("description"),
        Some(&SqlValue::from("ORGANIC BANANAS"))
    );

    assert!(manager
        .smart_update("products", &changes, "upc = = 1", "core_op")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_transfer_commits_all_rows() {
    let (_dir, mut manager) = two_databases().await;
    for sql in [
        "INSERT INTO products VALUES ('1', 'O''Brien soda', 1.25, '2024-01-05 03:15:00', 5)",
        "INSERT INTO products VALUES ('2', 'Milk', 2.5, NULL, 10)",
        "INSERT INTO products VALUES ('3', 'Eggs', NULL, '2024-02-01 12:00:00', NULL)",
    ] {
        manager.query(sql, "core_op", None).await.unwrap().unwrap();
    }

    let ok = manager
        .transfer(
            "core_op",
            "SELECT upc, description, normal_price, modified, qty FROM products",
            "core_trans",
            "INSERT INTO products_copy (upc, description, normal_price, modified, qty)",
        )
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(count(&mut manager, "products_copy", "core_trans").await, 3);

    let mut result = manager
        .query(
            "SELECT description, modified FROM products_copy WHERE upc = '1'",
            "core_trans",
            None,
        )
        .await
        .unwrap()
        .unwrap();
    let row = result.fetch_row().unwrap();
    assert_eq!(row.get(0), Some(&SqlValue::from("O'Brien soda")));
    assert_eq!(row.get(1), Some(&SqlValue::from("2024-01-05 03:15:00")));
}

#[tokio::test]
async fn test_transfer_rolls_back_on_any_failure() {
    let (_dir, mut manager) = two_databases().await;
    for sql in [
        "INSERT INTO products (upc, qty) VALUES ('1', 1)",
        "INSERT INTO products (upc, qty) VALUES ('2', 2)",
        "INSERT INTO products (upc, qty) VALUES ('3', 500)",
    ] {
        manager.query(sql, "core_op", None).await.unwrap().unwrap();
    }

    let ok = manager
        .transfer(
            "core_op",
            "SELECT upc, qty FROM products ORDER BY upc",
            "core_trans",
            "INSERT INTO products_copy (upc, qty)",
        )
        .await
        .unwrap();
    assert!(!ok);
    assert_eq!(count(&mut manager, "products_copy", "core_trans").await, 0);
}

#[tokio::test]
async fn test_transfer_raises_in_throw_mode() {
    let (_dir, mut manager) = two_databases().await;
    manager
        .query("INSERT INTO products (upc, qty) VALUES ('1', 500)", "core_op", None)
        .await
        .unwrap()
        .unwrap();
    manager.throw_on_failure(true);

    let err = manager
        .transfer(
            "core_op",
            "SELECT upc, qty FROM products",
            "core_trans",
            "INSERT INTO products_copy (upc, qty)",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QueryFailed { .. }));

    manager.throw_on_failure(false);
    assert_eq!(count(&mut manager, "products_copy", "core_trans").await, 0);
}

#[tokio::test]
async fn test_detailed_definition_reports_primary_key() {
    let (_dir, mut manager) = two_databases().await;
    let schema = manager
        .detailed_definition("products", "core_op")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(schema["upc"].primary_key, TriState::True);
    assert_eq!(schema["qty"].primary_key, TriState::False);
    assert_eq!(schema["normal_price"].type_name, "DECIMAL(10,2)");
    assert_eq!(schema["modified"].default, None);

    let shared = manager
        .get_matching_columns("products", "core_op", "products_copy", "core_trans")
        .await
        .unwrap();
    assert_eq!(
        shared.as_deref(),
        Some("upc, description, normal_price, modified, qty")
    );
}

#[tokio::test]
async fn test_set_default_db_and_close() {
    let (_dir, mut manager) = two_databases().await;

    assert!(!manager.set_default_db("nope").await.unwrap());
    assert_eq!(manager.default_db(), Some("core_op"));

    assert!(manager.set_default_db("core_trans").await.unwrap());
    assert!(manager.table_exists("products_copy", "").await.unwrap());

    assert!(manager.close("").unwrap());
    assert_eq!(manager.default_db(), None);
    assert!(!manager.is_connected("core_trans"));
    assert!(matches!(manager.close("core_trans"), Err(Error::ConnectionNotFound(_))));
}

#[tokio::test]
async fn test_query_all_with_unusable_connection() {
    let (dir, mut manager) = two_databases().await;
    let missing = dir.path().join("gone").to_string_lossy().to_string();
    assert!(!manager
        .add_connection(&ConnectRequest::new(&missing, "sqlite", "archive"))
        .await
        .unwrap());

    let results = manager.query_all("SELECT 1").await;
    assert_eq!(
        results.keys().collect::<Vec<_>>(),
        vec!["core_op", "core_trans", "archive"]
    );
    assert!(results["core_op"].is_some());
    assert!(results["core_trans"].is_some());
    assert!(results["archive"].is_none());

    assert_eq!(manager.error("archive"), "No database connection");
    assert!(matches!(
        manager.table_exists("products", "archive").await,
        Err(Error::Unsupported { .. })
    ));
}

#[tokio::test]
async fn test_error_strings() {
    let (_dir, mut manager) = two_databases().await;
    assert_eq!(manager.error("nowhere"), "No database connection");

    assert!(manager
        .query("SELECT * FROM no_such_table", "core_trans", None)
        .await
        .unwrap()
        .is_none());
    assert!(manager.error("core_trans").contains("no_such_table"));

    manager.query("SELECT 1", "core_trans", None).await.unwrap().unwrap();
    assert_eq!(manager.error("core_trans"), "");
}

#[tokio::test]
async fn test_failures_go_to_existing_log_file() {
    let (dir, mut manager) = two_databases().await;
    let log_path = dir.path().join("queries.log");

    // the log is never created on demand
    manager.set_query_log(Some(log_path.clone()));
    manager.query("SELEC 1", "", None).await.unwrap();
    assert!(!log_path.exists());
    assert!(!manager.logger("ignored"));

    fs::write(&log_path, "").unwrap();
    manager.query("SELEC 1", "", None).await.unwrap();
    assert!(manager.logger("lane 3 closed"));

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("SELEC 1"));
    assert!(contents.contains("lane 3 closed"));
}
