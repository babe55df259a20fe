//! In-memory document collection.

use async_trait::async_trait;
use case_records_database_models::{Predicate, Projection};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{CaseStore, DbError};

/// A [`CaseStore`] that keeps documents in insertion order in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `docs`.
    #[must_use]
    pub fn with_documents(docs: Vec<Value>) -> Self {
        Self {
            docs: RwLock::new(docs),
        }
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn find(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Vec<Value>, DbError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|doc| predicate.matches(doc))
            .map(|doc| projection.apply(doc))
            .collect())
    }

    async fn find_one(
        &self,
        predicate: &Predicate,
        projection: &Projection,
    ) -> Result<Option<Value>, DbError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|doc| predicate.matches(doc))
            .map(|doc| projection.apply(doc)))
    }

    async fn insert_one(&self, doc: Value) -> Result<(), DbError> {
        self.docs.write().await.push(doc);
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Value>) -> Result<u64, DbError> {
        let count = docs.len() as u64;
        self.docs.write().await.extend(docs);
        Ok(count)
    }

    async fn delete_one(&self, predicate: &Predicate) -> Result<u64, DbError> {
        let mut docs = self.docs.write().await;
        let Some(idx) = docs.iter().position(|doc| predicate.matches(doc)) else {
            return Ok(0);
        };
        docs.remove(idx);
        drop(docs);
        Ok(1)
    }

    async fn count_documents(&self, predicate: &Predicate) -> Result<u64, DbError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|doc| predicate.matches(doc)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use case_records_case_models::CaseField;
    use case_records_database_models::{Condition, Operand};
    use serde_json::json;

    use super::*;

    fn by_date(date: &str) -> Predicate {
        Predicate::all().with(
            CaseField::DateOfCase,
            Condition::Eq(Operand::Text(date.to_string())),
        )
    }

    #[tokio::test]
    async fn insert_find_count_delete() {
        let store = MemoryStore::new();
        store
            .insert_one(json!({ "data_do_caso": "2024-01-01" }))
            .await
            .unwrap();
        let inserted = store
            .insert_many(vec![
                json!({ "data_do_caso": "2024-01-02" }),
                json!({ "data_do_caso": "2024-01-02" }),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count_documents(&Predicate::all()).await.unwrap(), 3);
        assert_eq!(
            store.count_documents(&by_date("2024-01-02")).await.unwrap(),
            2
        );

        assert_eq!(store.delete_one(&by_date("2024-01-02")).await.unwrap(), 1);
        assert_eq!(store.delete_one(&by_date("2030-01-01")).await.unwrap(), 0);
        assert_eq!(store.count_documents(&Predicate::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_preserves_insertion_order_and_projects() {
        let store = MemoryStore::with_documents(vec![
            json!({ "data_do_caso": "2024-01-03", "localizacao": "Centro" }),
            json!({ "data_do_caso": "2024-01-01", "localizacao": "Bairro A" }),
        ]);
        let found = store
            .find(
                &Predicate::all(),
                &Projection::Fields(vec![CaseField::Location]),
            )
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![
                json!({ "localizacao": "Centro" }),
                json!({ "localizacao": "Bairro A" })
            ]
        );

        let first = store
            .find_one(&by_date("2024-01-01"), &Projection::Full)
            .await
            .unwrap();
        assert_eq!(first.unwrap()["localizacao"], "Bairro A");
    }
}
