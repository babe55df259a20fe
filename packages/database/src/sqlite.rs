//! `SQLite`-backed document collection.
//!
//! Each case is stored as a JSON text column. Predicates are rendered into
//! parameterized `WHERE` clauses over `json_extract()`, guarded by
//! `json_type()` so that, like the in-memory store, values of a different
//! JSON type never match a comparison.
//!
//! `SQLite`'s `LOWER()` folds ASCII only, so case-insensitive equality is
//! narrowed in SQL to text values and then checked in Rust with
//! [`Predicate::matches`], giving the same Unicode folding as the in-memory
//! store.

use std::path::Path;

use async_trait::async_trait;
use case_records_case_models::CaseField;
use case_records_database_models::{Condition, Operand, Predicate, Projection};
use moosicbox_json_utils::database::ToValue as _;
use serde_json::Value;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{CaseStore, DbError};

/// A [`CaseStore`] persisted in a `SQLite` database file.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl SqliteStore {
    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be created or the schema DDL
    /// fails.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection {
            message: e.to_string(),
        })?;

        ensure_schema(db.as_ref()).await?;

        log::debug!("Opened case store at {}", path.display());

        Ok(Self { db })
    }
}

/// Creates the `cases` table and its expression indexes if missing.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS cases (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            document TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_cases_date
         ON cases (json_extract(document, '$.data_do_caso'))",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_cases_age
         ON cases (json_extract(document, '$.vitima.idade'))",
    )
    .await?;

    Ok(())
}

/// SQL expression extracting `field` from the document column.
///
/// Field paths come from the closed [`CaseField`] set, never from input.
fn extract(field: CaseField) -> String {
    format!("json_extract(document, '$.{field}')")
}

fn json_type(field: CaseField) -> String {
    format!("json_type(document, '$.{field}')")
}

fn operand_value(operand: &Operand) -> DatabaseValue {
    match operand {
        Operand::Text(s) => DatabaseValue::String(s.clone()),
        Operand::Integer(n) => DatabaseValue::Int64(*n),
    }
}

fn type_guard(field: CaseField, operand: &Operand) -> String {
    match operand {
        Operand::Text(_) => format!("{} = 'text'", json_type(field)),
        Operand::Integer(_) => format!("{} IN ('integer', 'real')", json_type(field)),
    }
}

/// Renders a predicate into a `WHERE` clause (empty for match-all) and its
/// positional parameters.
#[must_use]
pub fn render_where(predicate: &Predicate) -> (String, Vec<DatabaseValue>) {
    let mut frags = Vec::new();
    let mut params = Vec::new();

    for clause in predicate.clauses() {
        let col = extract(clause.field);
        let (op, cmp) = match &clause.condition {
            Condition::EqIgnoreCase(_) => {
                frags.push(format!("{} = 'text'", json_type(clause.field)));
                continue;
            }
            Condition::Eq(op) => (op, "="),
            Condition::Gte(op) => (op, ">="),
            Condition::Lte(op) => (op, "<="),
        };
        params.push(operand_value(op));
        let idx = params.len();
        frags.push(format!(
            "({} AND {col} {cmp} ${idx})",
            type_guard(clause.field, op)
        ));
    }

    let wc = if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    };

    (wc, params)
}

/// Whether rows returned for `predicate` still need [`Predicate::matches`].
fn needs_recheck(predicate: &Predicate) -> bool {
    predicate
        .clauses()
        .iter()
        .any(|c| matches!(c.condition, Condition::EqIgnoreCase(_)))
}

impl SqliteStore {
    /// `(id, document)` pairs fully matching `predicate`, in insertion order.
    async fn matching_rows(&self, predicate: &Predicate) -> Result<Vec<(i64, Value)>, DbError> {
        let (wc, params) = render_where(predicate);
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT id, document FROM cases{wc} ORDER BY id"),
                &params,
            )
            .await?;
        let recheck = needs_recheck(predicate);

        Ok(rows
            .iter()
            .filter_map(|row| {
                let id: i64 = row.to_value("id").unwrap_or(0);
                let text: String = row.to_value("document").unwrap_or_default();
                match serde_json::from_str::<Value>(&text) {
                    Ok(doc) => (!recheck || predicate.matches(&doc)).then_some((id, doc)),
                    Err(e) => {
                        log::warn!("Skipping unreadable case document {id}: {e}");
                        None
                    }
                }
            })
            .collect())
    }
}

#[async_trait]
impl CaseStore for SqliteStore {
    async fn find(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Vec<Value>, DbError> {
        Ok(self
            .matching_rows(predicate)
            .await?
            .iter()
            .map(|(_, doc)| projection.apply(doc))
            .collect())
    }

    async fn find_one(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Option<Value>, DbError> {
        if needs_recheck(predicate) {
            return Ok(self
                .matching_rows(predicate)
                .await?
                .first()
                .map(|(_, doc)| projection.apply(doc)));
        }

        let (wc, params) = render_where(predicate);
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT document FROM cases{wc} ORDER BY id LIMIT 1"),
                &params,
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let text: String = row.to_value("document").unwrap_or_default();
        let doc: Value = serde_json::from_str(&text)?;

        Ok(Some(projection.apply(&doc)))
    }

    async fn insert_one(&self, doc: Value) -> Result<(), DbError> {
        self.db
            .exec_raw_params(
                "INSERT INTO cases (document) VALUES ($1)",
                &[DatabaseValue::String(serde_json::to_string(&doc)?)],
            )
            .await?;
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Value>) -> Result<u64, DbError> {
        let mut inserted = 0u64;
        for doc in docs {
            inserted += self
                .db
                .exec_raw_params(
                    "INSERT INTO cases (document) VALUES ($1)",
                    &[DatabaseValue::String(serde_json::to_string(&doc)?)],
                )
                .await?;
        }
        Ok(inserted)
    }

    async fn delete_one(&self, predicate: &Predicate) -> Result<u64, DbError> {
        if needs_recheck(predicate) {
            let Some(&(id, _)) = self.matching_rows(predicate).await?.first() else {
                return Ok(0);
            };
            let deleted = self
                .db
                .exec_raw_params("DELETE FROM cases WHERE id = $1", &[DatabaseValue::Int64(id)])
                .await?;
            return Ok(deleted);
        }

        let (wc, params) = render_where(predicate);
        let deleted = self
            .db
            .exec_raw_params(
                &format!(
                    "DELETE FROM cases WHERE id = (SELECT id FROM cases{wc} ORDER BY id LIMIT 1)"
                ),
                &params,
            )
            .await?;
        Ok(deleted)
    }

    async fn count_documents(&self, predicate: &Predicate) -> Result<u64, DbError> {
        if needs_recheck(predicate) {
            let matched = self.matching_rows(predicate).await?.len();
            return Ok(u64::try_from(matched).unwrap_or(u64::MAX));
        }

        let (wc, params) = render_where(predicate);
        let rows = self
            .db
            .query_raw_params(&format!("SELECT COUNT(*) as total FROM cases{wc}"), &params)
            .await?;
        let total: i64 = rows.first().map_or(0, |r| r.to_value("total").unwrap_or(0));

        Ok(u64::try_from(total).unwrap_or(0))
    }
}
