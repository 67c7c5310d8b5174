//! Database layer
//!
//! Database abstraction for the Dawan publishing backend. Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration. A trait-based abstraction
//! (`DatabasePool`) lets services work with either backend; repositories
//! dispatch on the driver at runtime.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
