//! Descriptive statistics over raw case documents.
//!
//! These never touch the model and tolerate malformed documents by skipping
//! whatever part of them is unusable.

use case_records_analytics_models::{LocationPoint, SexAgeType, TypeCounts};
use case_records_case_models::{CaseField, location_coordinates};
use serde_json::Value;

/// One map point per document whose location has known coordinates.
#[must_use]
pub fn location_points(docs: &[Value]) -> Vec<LocationPoint> {
    docs.iter()
        .filter_map(|doc| {
            let neighborhood = CaseField::Location.text(doc)?;
            let (lat, lon) = location_coordinates(neighborhood)?;
            Some(LocationPoint {
                neighborhood: neighborhood.to_string(),
                lat,
                lon,
            })
        })
        .collect()
}

/// Victim ages, in document order.
#[must_use]
pub fn ages(docs: &[Value]) -> Vec<u32> {
    docs.iter()
        .filter_map(|doc| CaseField::VictimAge.whole_number(doc))
        .collect()
}

/// `(sex, age, case type)` triples for documents that have all three.
#[must_use]
pub fn sex_age_types(docs: &[Value]) -> Vec<SexAgeType> {
    docs.iter()
        .filter_map(|doc| {
            Some(SexAgeType {
                sex: CaseField::VictimSex.text(doc)?.to_string(),
                age: CaseField::VictimAge.whole_number(doc)?,
                case_type: CaseField::CaseType.text(doc)?.to_string(),
            })
        })
        .collect()
}

/// Number of documents per case type.
#[must_use]
pub fn type_counts(docs: &[Value]) -> TypeCounts {
    let mut counts = TypeCounts::new();
    for case_type in docs.iter().filter_map(|d| CaseField::CaseType.text(d)) {
        *counts.entry(case_type.to_string()).or_default() += 1;
    }
    counts
}
