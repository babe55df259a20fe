//! Query builder and case-level store operations.
//!
//! [`build_predicate`] is the single place where request filter criteria
//! become a store predicate; every endpoint that accepts filters goes
//! through it.

use case_records_case_models::{CASE_DATE_FORMAT, CaseField, CaseRecord, parse_case_date};
use case_records_database_models::{CaseFilter, Condition, Operand, Predicate, Projection};
use serde_json::Value;

use crate::{CaseStore, DbError};

/// Builds the store predicate for the given filter criteria.
///
/// Categorical filters match case-insensitively. Age and date bounds are
/// inclusive and each bound is added independently, so only present bounds
/// appear in the predicate. An unconstrained filter yields the empty
/// (match-everything) predicate.
#[must_use]
pub fn build_predicate(filter: &CaseFilter) -> Predicate {
    let mut predicate = Predicate::all();

    if let Some(sex) = &filter.sex {
        predicate = predicate.with(CaseField::VictimSex, Condition::EqIgnoreCase(sex.clone()));
    }

    if let Some(ethnicity) = &filter.ethnicity {
        predicate = predicate.with(
            CaseField::VictimEthnicity,
            Condition::EqIgnoreCase(ethnicity.clone()),
        );
    }

    if let Some(min) = filter.age_min {
        predicate = predicate.with(
            CaseField::VictimAge,
            Condition::Gte(Operand::Integer(i64::from(min))),
        );
    }

    if let Some(max) = filter.age_max {
        predicate = predicate.with(
            CaseField::VictimAge,
            Condition::Lte(Operand::Integer(i64::from(max))),
        );
    }

    if let Some(from) = &filter.date_from {
        predicate = predicate.with(
            CaseField::DateOfCase,
            Condition::Gte(Operand::Text(from.clone())),
        );
    }

    if let Some(to) = &filter.date_to {
        predicate = predicate.with(
            CaseField::DateOfCase,
            Condition::Lte(Operand::Text(to.clone())),
        );
    }

    predicate
}

/// Predicate selecting cases on an exact date.
///
/// Parsable dates are compared in their stored `YYYY-MM-DD` form; anything
/// else is compared verbatim and will not match a validated case.
#[must_use]
pub fn date_predicate(date: &str) -> Predicate {
    let date = parse_case_date(date.trim())
        .map_or_else(|| date.to_string(), |d| d.format(CASE_DATE_FORMAT).to_string());
    Predicate::all().with(CaseField::DateOfCase, Condition::Eq(Operand::Text(date)))
}

/// Returns all case documents matching `filter`.
///
/// # Errors
///
/// Returns [`DbError`] if the store query fails.
pub async fn find_cases(store: &dyn CaseStore, filter: &CaseFilter) -> Result<Vec<Value>, DbError> {
    find_cases_projected(store, filter, &Projection::Full).await
}

/// Returns the matching case documents shaped by `projection`.
///
/// # Errors
///
/// Returns [`DbError`] if the store query fails.
pub async fn find_cases_projected(
    store: &dyn CaseStore,
    filter: &CaseFilter,
    projection: &Projection,
) -> Result<Vec<Value>, DbError> {
    let predicate = build_predicate(filter);
    let docs = store.find(&predicate, projection).await?;
    log::debug!(
        "find_cases: {} clause(s) matched {} document(s)",
        predicate.clauses().len(),
        docs.len()
    );
    Ok(docs)
}

/// Returns the first case recorded on `date`.
///
/// # Errors
///
/// Returns [`DbError`] if the store query fails.
pub async fn find_case_by_date(
    store: &dyn CaseStore,
    date: &str,
) -> Result<Option<Value>, DbError> {
    store
        .find_one(&date_predicate(date), &Projection::Full)
        .await
}

/// Deletes the first case recorded on `date`, returning the deleted count.
///
/// # Errors
///
/// Returns [`DbError`] if the store operation fails.
pub async fn delete_case_by_date(store: &dyn CaseStore, date: &str) -> Result<u64, DbError> {
    store.delete_one(&date_predicate(date)).await
}

/// Validates and inserts a submitted case document.
///
/// The stored document is the normalized [`CaseRecord`] shape; unknown extra
/// fields are dropped.
///
/// # Errors
///
/// Returns [`DbError::InvalidCase`] if the document is malformed, or another
/// [`DbError`] if the insert fails.
pub async fn insert_case(store: &dyn CaseStore, doc: &Value) -> Result<CaseRecord, DbError> {
    let record = CaseRecord::from_json(doc)?;
    store.insert_one(record.to_document()).await?;
    log::info!(
        "Inserted case {} ({}) at {}",
        record.date_of_case,
        record.case_type,
        record.location
    );
    Ok(record)
}

/// Validates and inserts a batch of case documents. Either every document
/// is valid and the whole batch is inserted, or nothing is inserted.
///
/// # Errors
///
/// Returns [`DbError::InvalidCase`] for the first malformed document, or
/// another [`DbError`] if the insert fails.
pub async fn insert_cases(store: &dyn CaseStore, docs: &[Value]) -> Result<u64, DbError> {
    let normalized = docs
        .iter()
        .map(|doc| CaseRecord::from_json(doc).map(|r| r.to_document()))
        .collect::<Result<Vec<_>, _>>()?;
    store.insert_many(normalized).await
}

/// Counts the cases matching `filter`.
///
/// # Errors
///
/// Returns [`DbError`] if the store query fails.
pub async fn count_cases(store: &dyn CaseStore, filter: &CaseFilter) -> Result<u64, DbError> {
    store.count_documents(&build_predicate(filter)).await
}

#[cfg(test)]
mod tests {
    use case_records_database_models::RawFilter;
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryStore;

    fn case(date: &str, sex: &str, age: u32) -> Value {
        json!({
            "data_do_caso": date,
            "tipo_do_caso": "Furto",
            "localizacao": "Centro",
            "vitima": { "etnia": "Branca", "idade": age, "sexo": sex }
        })
    }

    #[test]
    fn sentinel_only_filter_builds_empty_predicate() {
        let filter = CaseFilter::from_params(RawFilter {
            sex: Some("todos"),
            ethnicity: Some("todos"),
            ..RawFilter::default()
        })
        .unwrap();
        assert!(build_predicate(&filter).is_match_all());
        assert!(build_predicate(&CaseFilter::default()).is_match_all());
    }

    #[test]
    fn only_present_bounds_appear() {
        let predicate = build_predicate(&CaseFilter {
            age_max: Some(40),
            date_from: Some("2024-01-01".to_string()),
            ..CaseFilter::default()
        });
        assert_eq!(predicate.clauses().len(), 2);
        assert_eq!(predicate.clauses()[0].field, CaseField::VictimAge);
        assert_eq!(
            predicate.clauses()[0].condition,
            Condition::Lte(Operand::Integer(40))
        );
        assert_eq!(predicate.clauses()[1].field, CaseField::DateOfCase);
    }

    #[test]
    fn age_range_matches_only_inclusive_interval() {
        let predicate = build_predicate(&CaseFilter {
            age_min: Some(20),
            age_max: Some(40),
            ..CaseFilter::default()
        });
        for age in [0, 19, 20, 30, 40, 41, 90] {
            let matched = predicate.matches(&case("2024-01-01", "f", age));
            assert_eq!(matched, (20..=40).contains(&age), "age {age}");
        }
    }

    #[tokio::test]
    async fn end_to_end_sex_filter() {
        let store = MemoryStore::new();
        insert_case(&store, &case("2024-01-01", "masculino", 30))
            .await
            .unwrap();

        let men = CaseFilter::from_params(RawFilter {
            sex: Some("masculino"),
            ..RawFilter::default()
        })
        .unwrap();
        let found = find_cases(&store, &men).await.unwrap();
        assert_eq!(found, vec![case("2024-01-01", "masculino", 30)]);

        let women = CaseFilter::from_params(RawFilter {
            sex: Some("feminino"),
            ..RawFilter::default()
        })
        .unwrap();
        assert!(find_cases(&store, &women).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_documents_without_inserting() {
        let store = MemoryStore::new();
        let mut bad = case("2024-01-01", "f", 1);
        bad["vitima"].as_object_mut().unwrap().remove("etnia");

        assert!(matches!(
            insert_case(&store, &bad).await,
            Err(DbError::InvalidCase(_))
        ));
        assert!(matches!(
            insert_cases(&store, &[case("2024-01-01", "f", 1), bad]).await,
            Err(DbError::InvalidCase(_))
        ));
        assert_eq!(count_cases(&store, &CaseFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_and_delete_by_date() {
        let store = MemoryStore::with_documents(vec![
            case("2024-01-01", "f", 1),
            case("2024-01-02", "m", 2),
        ]);
        let found = find_case_by_date(&store, "2024-01-02").await.unwrap();
        assert_eq!(found.unwrap()["vitima"]["sexo"], "m");

        assert_eq!(delete_case_by_date(&store, "2024-01-02").await.unwrap(), 1);
        assert_eq!(delete_case_by_date(&store, "2024-01-02").await.unwrap(), 0);
        assert!(find_case_by_date(&store, "2024-01-02").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loosely_written_dates_fall_inside_date_ranges() {
        let store = MemoryStore::new();
        insert_case(&store, &case("2024-1-5", "f", 20)).await.unwrap();
        insert_case(&store, &case("2024-01-06T10:00:00", "f", 21))
            .await
            .unwrap();
        insert_case(&store, &case("2024-01-10", "f", 22)).await.unwrap();

        let first_week = CaseFilter::from_params(RawFilter {
            date_from: Some("2024-01-01"),
            date_to: Some("2024-01-06"),
            ..RawFilter::default()
        })
        .unwrap();
        let found = find_cases(&store, &first_week).await.unwrap();
        let dates: Vec<&str> = found
            .iter()
            .filter_map(|d| d["data_do_caso"].as_str())
            .collect();
        assert_eq!(dates, ["2024-01-05", "2024-01-06"]);

        let found = find_case_by_date(&store, "2024-01-05").await.unwrap();
        assert_eq!(found.unwrap()["vitima"]["idade"], 20);
        assert!(find_case_by_date(&store, "2024-1-6").await.unwrap().is_some());
    }
}
