//! # Database Operations
//!
//! Connection pooling and embedded schema migrations for the PostgreSQL
//! task store.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use face_scan_core::config::DatabaseConfig;
//! use face_scan_core::database::DatabaseConnection;
//! use face_scan_core::store::PgTaskStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::new(&DatabaseConfig::default()).await?;
//! db.migrate().await?;
//! let store = PgTaskStore::new(db.pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod connection;

pub use connection::DatabaseConnection;

use sqlx::migrate::Migrator;

/// Schema migrations under `migrations/`, embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
