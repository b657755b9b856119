//! Convenience re-exports for common QueryMill usage
//!
//! # Example
//!
//! ```rust
//! use querymill::prelude::*;
//!
//! let query = QueryBuilder::detached(dialect_for(Dialect::Sqlite))
//!     .select(&["id"])
//!     .from("users")
//!     .filter(Condition::eq("name", "Ann"));
//! assert_eq!(query.compile().unwrap().sql(), "SELECT \"id\" FROM \"users\" WHERE name = ?");
//! ```

// Core QueryMill components
pub use crate::core::Connection;
pub use crate::errors::QueryMillError;

// Re-export centralized config
pub use config::{AppConfig, ConnectionOptions, Dialect, LoggingConfig, PoolOptions};

// Query building and execution
pub use query_core::prelude::*;

// Common external dependencies
pub use async_trait;
pub use serde_json::{json, Value};
pub use tokio;
