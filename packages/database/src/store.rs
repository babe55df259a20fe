//! The record store contract.

use async_trait::async_trait;
use case_records_database_models::{Predicate, Projection};
use serde_json::Value;

use crate::DbError;

/// A collection of case documents.
///
/// Each operation is atomic per document. Implementations must be safe to
/// share across concurrent requests.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Returns every document matching `predicate`, in insertion order,
    /// shaped by `projection`.
    async fn find(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Vec<Value>, DbError>;

    /// Returns the first document matching `predicate`, if any.
    async fn find_one(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Option<Value>, DbError> {
        Ok(self.find(predicate, projection).await?.into_iter().next())
    }

    /// Inserts a single document.
    async fn insert_one(&self, doc: Value) -> Result<(), DbError>;

    /// Inserts a batch of documents, returning how many were inserted.
    async fn insert_many(&self, docs: Vec<Value>) -> Result<u64, DbError>;

    /// Deletes the first document matching `predicate`, returning the
    /// number of deleted documents (0 or 1).
    async fn delete_one(&self, predicate: &Predicate) -> Result<u64, DbError>;

    /// Counts the documents matching `predicate`.
    async fn count_documents(&self, predicate: &Predicate) -> Result<u64, DbError>;
}
