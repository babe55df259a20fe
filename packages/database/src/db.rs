//! Store connection utilities.

use std::path::Path;
use std::str::FromStr;

use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;
use crate::{CaseStore, DbError};

/// Default path of the `SQLite` case store.
pub const DEFAULT_DB_PATH: &str = "data/cases.db";

/// Which [`CaseStore`] implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// Persistent `SQLite` document store.
    #[default]
    Sqlite,
    /// Volatile in-memory store.
    Memory,
}

impl FromStr for StoreKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(DbError::Connection {
                message: format!("Unknown store kind '{other}': expected 'sqlite' or 'memory'"),
            }),
        }
    }
}

/// Opens a case store of the given kind. `path` is ignored for the memory
/// store.
///
/// # Errors
///
/// Returns [`DbError`] if the `SQLite` store cannot be opened.
pub async fn open_store(kind: StoreKind, path: &Path) -> Result<Box<dyn CaseStore>, DbError> {
    match kind {
        StoreKind::Sqlite => Ok(Box::new(SqliteStore::open(path).await?)),
        StoreKind::Memory => {
            log::warn!("Using volatile in-memory case store");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

/// Opens the case store configured by the `CASES_STORE` (`sqlite` or
/// `memory`, default `sqlite`) and `CASES_DB_PATH` (default
/// [`DEFAULT_DB_PATH`]) environment variables.
///
/// # Errors
///
/// Returns [`DbError`] if `CASES_STORE` is invalid or the store cannot be
/// opened.
pub async fn open_from_env() -> Result<Box<dyn CaseStore>, DbError> {
    let kind = std::env::var("CASES_STORE")
        .ok()
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or_default();
    let path = std::env::var("CASES_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    open_store(kind, Path::new(&path)).await
}
