//! # QueryMill
//!
//! Query construction and driver abstraction for MySQL, PostgreSQL and SQLite:
//! composable condition trees compiled into injection-safe SQL, uniform
//! connection lifecycle, transactions and error classification.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use querymill::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::open(ConnectionOptions::new_sqlite(":memory:")).await?;
//!     connection
//!         .query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
//!         .await?;
//!
//!     connection
//!         .insert("users", json!({"name": "Ann", "age": 30}).as_object().cloned().unwrap_or_default())
//!         .await?;
//!
//!     let adults: Vec<User> = connection
//!         .create_query_builder()
//!         .select(&["id", "name"])
//!         .from("users")
//!         .and_where("age >= :age", [("age", json!(18))])
//!         .order_by("name", SortOrder::Asc)
//!         .fetch_all()
//!         .await?;
//!
//!     for user in adults {
//!         println!("{}: {}", user.id, user.name);
//!     }
//!
//!     connection.close().await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::Connection;
pub use errors::QueryMillError;

// Re-export centralized config
pub use config::{AppConfig, ConnectionOptions, Dialect, LoggingConfig, PoolOptions};

// Logging macros shared with the query core
pub use query_core::{debug_log, trace_log};

// Re-export internal crates used by the public API
pub use query_core;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
