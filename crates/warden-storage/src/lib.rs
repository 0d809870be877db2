//! # warden-storage
//!
//! SQLite persistence for Warden: a serialized writer connection with
//! durability pragmas, `user_version` migrations, the append-only
//! [`SqliteAuditTrail`], and strategy statistics snapshots.

pub mod audit_trail;
pub mod connection;
pub mod migrations;
pub mod queries;

pub use audit_trail::SqliteAuditTrail;
pub use connection::DatabaseManager;
