#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Case record store contract, implementations, and query builder.
//!
//! The store is a generic document collection ([`store::CaseStore`])
//! supporting predicate queries, inserts, deletes, and counts. Two
//! implementations are provided: an in-memory collection
//! ([`memory::MemoryStore`]) and a `SQLite` JSON-document collection
//! ([`sqlite::SqliteStore`]) that uses `switchy_database` with
//! `json_extract()` for field access.

pub mod db;
pub mod memory;
pub mod queries;
pub mod sqlite;
pub mod store;

use case_records_case_models::InvalidCaseError;

pub use store::CaseStore;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// A document could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A submitted document failed validation.
    #[error(transparent)]
    InvalidCase(#[from] InvalidCaseError),

    /// Opening or configuring the store failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },
}
