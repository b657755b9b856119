use super::testing::{Event, LogEntry, RecordingLogger, ScriptedClient, ScriptedFactory};
use super::{driver_with_components, Driver, SqliteDriver};
use crate::errors::{Error, QueryBuilderError};
use crate::native::{ColumnValues, Row};
use config::{ConnectionOptions, Dialect};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    driver: Arc<dyn Driver>,
    client: Arc<ScriptedClient>,
    factory: Arc<ScriptedFactory>,
    logger: Arc<RecordingLogger>,
}

fn options(dialect: Dialect) -> Arc<ConnectionOptions> {
    match dialect {
        Dialect::Sqlite => Arc::new(ConnectionOptions::new_sqlite(":memory:")),
        network => Arc::new(ConnectionOptions::new_network(
            network,
            "localhost".to_string(),
            None,
            "app".to_string(),
            "app".to_string(),
            "secret".to_string(),
        )),
    }
}

fn harness(dialect: Dialect) -> Harness {
    let client = ScriptedClient::new();
    let factory = ScriptedFactory::new(client.clone());
    let logger = Arc::new(RecordingLogger::default());
    let driver =
        driver_with_components(options(dialect), factory.clone(), logger.clone()).unwrap();
    Harness {
        driver,
        client,
        factory,
        logger,
    }
}

async fn connected(dialect: Dialect) -> Harness {
    let harness = harness(dialect);
    harness.driver.connect().await.unwrap();
    harness
}

fn map(value: Value) -> ColumnValues {
    value.as_object().cloned().unwrap()
}

fn rows(names: &[&str]) -> Vec<Row> {
    names.iter().map(|name| map(json!({ "name": name }))).collect()
}

// ========================================
// Connection lifecycle
// ========================================

#[tokio::test]
async fn test_query_before_connect_names_dialect() {
    for dialect in [Dialect::Mysql, Dialect::Postgres, Dialect::Sqlite] {
        let harness = harness(dialect);
        let result = harness.driver.query("SELECT 1").await;

        match result {
            Err(Error::ConnectionIsNotSet { dialect: reported }) => assert_eq!(reported, dialect),
            other => panic!("expected ConnectionIsNotSet, got {:?}", other),
        }
        assert!(harness.client.events().is_empty());
        assert!(harness.logger.entries().is_empty());
    }
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let harness = connected(Dialect::Postgres).await;
    let result = harness.driver.connect().await;

    assert!(matches!(
        result,
        Err(Error::AlreadyConnected {
            dialect: Dialect::Postgres
        })
    ));
    assert_eq!(harness.factory.connects(), 1);
}

#[tokio::test]
async fn test_disconnect_and_reconnect() {
    let harness = connected(Dialect::Sqlite).await;
    assert!(harness.driver.is_connected().await);

    harness.driver.disconnect().await.unwrap();
    assert!(!harness.driver.is_connected().await);
    assert_eq!(harness.client.events(), vec![Event::Close]);

    assert!(matches!(
        harness.driver.query("SELECT 1").await,
        Err(Error::ConnectionIsNotSet { .. })
    ));
    assert!(matches!(
        harness.driver.disconnect().await,
        Err(Error::ConnectionIsNotSet { .. })
    ));

    harness.driver.connect().await.unwrap();
    assert_eq!(harness.factory.connects(), 2);
    assert!(harness.driver.query("SELECT 1").await.is_ok());
}

#[test]
fn test_driver_rejects_other_dialect_options() {
    let result = SqliteDriver::new(options(Dialect::Mysql));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

// ========================================
// Query execution and logging
// ========================================

#[tokio::test]
async fn test_query_picks_fetch_or_execute() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.respond("SELECT", rows(&["a"]));

    let selected = harness.driver.query("SELECT name FROM t").await.unwrap();
    assert_eq!(selected.rows, rows(&["a"]));

    let deleted = harness.driver.query("DELETE FROM t").await.unwrap();
    assert!(deleted.rows.is_empty());
    assert_eq!(deleted.rows_affected, 1);

    assert_eq!(
        harness.client.events(),
        vec![
            Event::Fetch("SELECT name FROM t".to_string(), vec![]),
            Event::Execute("DELETE FROM t".to_string(), vec![]),
        ]
    );
}

#[tokio::test]
async fn test_logger_hooks_before_and_after_failure() {
    let harness = connected(Dialect::Mysql).await;
    harness.client.fail_on("DROP TABLE missing");

    harness.driver.query("SELECT 1").await.unwrap();
    let result = harness.driver.query("DROP TABLE missing").await;

    assert!(matches!(result, Err(Error::Database(sqlx::Error::Protocol(_)))));
    assert_eq!(
        harness.logger.entries(),
        vec![
            LogEntry::Query("SELECT 1".to_string()),
            LogEntry::Query("DROP TABLE missing".to_string()),
            LogEntry::Error("DROP TABLE missing".to_string()),
        ]
    );
}

// ========================================
// insert / update / delete
// ========================================

#[tokio::test]
async fn test_insert_binds_values_and_reports_id() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.set_last_insert_id(7);

    let result = harness
        .driver
        .insert("users", map(json!({"name": "Ann", "age": 30})))
        .await
        .unwrap();
    assert_eq!(result.last_insert_id, Some(7));

    match harness.client.events().as_slice() {
        [Event::Execute(sql, values)] => {
            assert!(sql.starts_with("INSERT INTO \"users\""));
            assert!(!sql.contains("Ann"));
            assert_eq!(values.len(), 2);
            assert!(values.contains(&json!("Ann")));
            assert!(values.contains(&json!(30)));
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_update_has_single_id_predicate() {
    let harness = connected(Dialect::Postgres).await;

    harness
        .driver
        .update("users", map(json!({"age": 31})), map(json!({"id": 5})))
        .await
        .unwrap();

    assert_eq!(
        harness.client.events(),
        vec![Event::Execute(
            "UPDATE \"users\" SET \"age\" = $1 WHERE \"id\" = $2".to_string(),
            vec![json!(31), json!(5)],
        )]
    );
}

#[tokio::test]
async fn test_update_null_condition_and_delete() {
    let harness = connected(Dialect::Mysql).await;

    harness
        .driver
        .update(
            "users",
            map(json!({"active": false})),
            map(json!({"deleted_at": null})),
        )
        .await
        .unwrap();
    harness
        .driver
        .delete("sessions", map(json!({"user_id": 3})))
        .await
        .unwrap();

    assert_eq!(
        harness.client.statements(),
        vec![
            "UPDATE `users` SET `active` = ? WHERE `deleted_at` IS NULL".to_string(),
            "DELETE FROM `sessions` WHERE `user_id` = ?".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_invalid_condition_column_never_reaches_database() {
    let harness = connected(Dialect::Sqlite).await;

    let result = harness
        .driver
        .delete("users", map(json!({"id = 1 OR 1": 1})))
        .await;

    assert!(matches!(
        result,
        Err(Error::QueryBuilder(QueryBuilderError::InvalidIdentifier(_)))
    ));
    assert!(harness.client.events().is_empty());
}

// ========================================
// Transactions
// ========================================

#[tokio::test]
async fn test_transaction_commit() {
    let harness = connected(Dialect::Mysql).await;

    harness.driver.begin_transaction().await.unwrap();
    assert!(harness.driver.in_transaction());
    harness.driver.query("UPDATE t SET a = 1").await.unwrap();
    harness.driver.end_transaction().await.unwrap();
    assert!(!harness.driver.in_transaction());

    assert_eq!(
        harness.client.events(),
        vec![
            Event::Pin,
            Event::Execute("START TRANSACTION".to_string(), vec![]),
            Event::Execute("UPDATE t SET a = 1".to_string(), vec![]),
            Event::Execute("COMMIT".to_string(), vec![]),
            Event::Release,
        ]
    );
}

#[tokio::test]
async fn test_nested_begin_and_missing_transaction() {
    let harness = connected(Dialect::Postgres).await;

    assert!(matches!(
        harness.driver.end_transaction().await,
        Err(Error::NoActiveTransaction { .. })
    ));
    assert!(matches!(
        harness.driver.rollback_transaction().await,
        Err(Error::NoActiveTransaction { .. })
    ));

    harness.driver.begin_transaction().await.unwrap();
    assert!(matches!(
        harness.driver.begin_transaction().await,
        Err(Error::TransactionAlreadyActive {
            dialect: Dialect::Postgres
        })
    ));

    harness.driver.rollback_transaction().await.unwrap();
    assert_eq!(
        harness.client.statements(),
        vec!["BEGIN".to_string(), "ROLLBACK".to_string()]
    );
    assert_eq!(harness.client.events().last(), Some(&Event::Release));
}

#[tokio::test]
async fn test_failed_commit_keeps_transaction_open() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.fail_on("COMMIT");

    harness.driver.begin_transaction().await.unwrap();
    assert!(harness.driver.end_transaction().await.is_err());
    assert!(harness.driver.in_transaction());

    harness.driver.rollback_transaction().await.unwrap();
    assert!(!harness.driver.in_transaction());
}

#[tokio::test]
async fn test_failed_begin_releases_session() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.fail_on("BEGIN");

    assert!(harness.driver.begin_transaction().await.is_err());
    assert!(!harness.driver.in_transaction());
    assert_eq!(harness.client.events().last(), Some(&Event::Release));
}

// ========================================
// clear_database
// ========================================

const SQLITE_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'";

#[tokio::test]
async fn test_clear_database_sequence() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.respond(SQLITE_TABLES, rows(&["a", "b"]));

    harness.driver.clear_database().await.unwrap();

    assert_eq!(
        harness.client.statements(),
        vec![
            "PRAGMA foreign_keys = OFF".to_string(),
            SQLITE_TABLES.to_string(),
            "DROP TABLE IF EXISTS \"a\"".to_string(),
            "DROP TABLE IF EXISTS \"b\"".to_string(),
            "PRAGMA foreign_keys = ON".to_string(),
        ]
    );
    let events = harness.client.events();
    assert_eq!(events.first(), Some(&Event::Pin));
    assert_eq!(events.last(), Some(&Event::Release));
}

#[tokio::test]
async fn test_clear_database_failing_drop_still_enables_once() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.respond(SQLITE_TABLES, rows(&["a", "b"]));
    harness.client.fail_on("DROP TABLE IF EXISTS \"b\"");

    let result = harness.driver.clear_database().await;
    assert!(matches!(result, Err(Error::Database(_))));

    let statements = harness.client.statements();
    assert_eq!(
        statements
            .iter()
            .filter(|sql| *sql == "PRAGMA foreign_keys = ON")
            .count(),
        1
    );
    assert_eq!(statements.last().map(String::as_str), Some("PRAGMA foreign_keys = ON"));
    assert_eq!(statements.len(), 5);
}

#[tokio::test]
async fn test_clear_database_mysql_binds_schema() {
    let harness = connected(Dialect::Mysql).await;
    harness
        .client
        .respond("SELECT table_name", vec![map(json!({"TABLE_NAME": "orders"}))]);

    harness.driver.clear_database().await.unwrap();

    let events = harness.client.events();
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Fetch(sql, values) if sql.starts_with("SELECT table_name") && values == &vec![json!("app")]
    )));
    assert_eq!(
        harness.client.statements(),
        vec![
            "SET FOREIGN_KEY_CHECKS = 0".to_string(),
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE'"
                .to_string(),
            "DROP TABLE IF EXISTS `orders`".to_string(),
            "SET FOREIGN_KEY_CHECKS = 1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_clear_database_inside_transaction_keeps_session() {
    let harness = connected(Dialect::Postgres).await;
    harness.driver.begin_transaction().await.unwrap();
    harness.driver.clear_database().await.unwrap();

    let events = harness.client.events();
    assert_eq!(events.iter().filter(|event| **event == Event::Pin).count(), 1);
    assert!(!events.contains(&Event::Release));
}

// ========================================
// Bound query builder and schema builder
// ========================================

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
}

#[tokio::test]
async fn test_bound_builder_fetches_typed_rows() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.respond(
        "SELECT",
        vec![
            map(json!({"id": 1, "name": "Ann"})),
            map(json!({"id": 2, "name": "Bob"})),
        ],
    );

    let query = harness
        .driver
        .create_query_builder()
        .select(&["id", "name"])
        .from("users")
        .and_where("age > :age", [("age", json!(18))]);

    let users: Vec<User> = query.fetch_all().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1], User { id: 2, name: "Bob".to_string() });

    let first: Option<User> = query.fetch_optional().await.unwrap();
    assert_eq!(first.map(|user| user.id), Some(1));

    assert_eq!(
        harness.client.events()[0],
        Event::Fetch(
            "SELECT \"id\", \"name\" FROM \"users\" WHERE age > ?".to_string(),
            vec![json!(18)],
        )
    );
}

#[tokio::test]
async fn test_fetch_one_without_rows() {
    let harness = connected(Dialect::Sqlite).await;
    let result = harness
        .driver
        .create_query_builder()
        .select(&[])
        .from("users")
        .fetch_one::<User>()
        .await;
    assert!(matches!(result, Err(Error::RowNotFound)));
}

#[tokio::test]
async fn test_schema_builder_lists_and_drops() {
    let harness = connected(Dialect::Sqlite).await;
    harness.client.respond(SQLITE_TABLES, rows(&["users"]));

    let schema = harness.driver.create_schema_builder();
    assert_eq!(schema.list_tables().await.unwrap(), vec!["users".to_string()]);
    assert!(schema.has_table("users").await.unwrap());
    assert!(!schema.has_table("orders").await.unwrap());

    schema.drop_table("users").await.unwrap();
    assert_eq!(
        harness.client.statements().last().map(String::as_str),
        Some("DROP TABLE IF EXISTS \"users\"")
    );
}
