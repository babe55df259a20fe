#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Case record, victim, and feature row types.
//!
//! This crate defines the canonical shape of a case record as stored in the
//! document store, the strict validation applied at ingestion time, and the
//! flat feature row shape consumed by the classifier. Wire names are the
//! Portuguese keys used by the stored documents and the public API.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Sentinel values that mean "no constraint" for categorical filters.
pub const ALL_SENTINELS: &[&str] = &["todos", "all"];

/// Returns `true` if `value` is one of the [`ALL_SENTINELS`] (ignoring case).
#[must_use]
pub fn is_all_sentinel(value: &str) -> bool {
    ALL_SENTINELS
        .iter()
        .any(|sentinel| value.trim().eq_ignore_ascii_case(sentinel))
}

/// Addressable fields of a stored case document.
///
/// The string form of each variant is its dotted path inside the document,
/// which is what the record store predicates and projections use.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
pub enum CaseField {
    /// `data_do_caso`
    #[strum(serialize = "data_do_caso")]
    DateOfCase,
    /// `tipo_do_caso`
    #[strum(serialize = "tipo_do_caso")]
    CaseType,
    /// `localizacao`
    #[strum(serialize = "localizacao")]
    Location,
    /// `vitima.etnia`
    #[strum(serialize = "vitima.etnia")]
    VictimEthnicity,
    /// `vitima.idade`
    #[strum(serialize = "vitima.idade")]
    VictimAge,
    /// `vitima.sexo`
    #[strum(serialize = "vitima.sexo")]
    VictimSex,
}

impl CaseField {
    /// Splits the dotted path into its segments.
    pub fn segments(self) -> impl Iterator<Item = &'static str> {
        let path: &'static str = self.into();
        path.split('.')
    }

    /// Looks up this field inside a JSON document.
    #[must_use]
    pub fn lookup(self, doc: &Value) -> Option<&Value> {
        self.segments()
            .try_fold(doc, |current, segment| current.get(segment))
    }

    /// This field as non-blank text. Other JSON types and blank strings
    /// yield `None`.
    #[must_use]
    pub fn text(self, doc: &Value) -> Option<&str> {
        self.lookup(doc)?.as_str().filter(|s| !s.trim().is_empty())
    }

    /// This field as a non-negative integer that fits in `u32`.
    #[must_use]
    pub fn whole_number(self, doc: &Value) -> Option<u32> {
        self.lookup(doc)?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
    }
}

/// The victim sub-document of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victim {
    /// Self-declared ethnicity.
    #[serde(rename = "etnia")]
    pub ethnicity: String,
    /// Age in whole years.
    #[serde(rename = "idade")]
    pub age: u32,
    /// Sex as recorded by the reporting officer.
    #[serde(rename = "sexo")]
    pub sex: String,
}

/// A case record as stored in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Date the case occurred, zero-padded ISO 8601 (`YYYY-MM-DD`).
    #[serde(rename = "data_do_caso")]
    pub date_of_case: String,
    /// Case category, e.g. `"Furto"`.
    #[serde(rename = "tipo_do_caso")]
    pub case_type: String,
    /// Neighborhood or zone name.
    #[serde(rename = "localizacao")]
    pub location: String,
    /// Victim details.
    #[serde(rename = "vitima")]
    pub victim: Victim,
}

/// Reasons a submitted case document is rejected at ingestion.
#[derive(Debug, Error)]
pub enum InvalidCaseError {
    /// A field is missing or has the wrong JSON type.
    #[error("Invalid case document: {0}")]
    Shape(#[from] serde_json::Error),

    /// The case date is not an ISO 8601 date.
    #[error("Invalid case date '{value}': expected YYYY-MM-DD")]
    Date {
        /// The rejected value.
        value: String,
    },

    /// A required text field is blank.
    #[error("Field '{field}' must not be empty")]
    Blank {
        /// The blank field.
        field: CaseField,
    },
}

/// Stored form of `data_do_caso`. Zero-padded, so lexicographic order is
/// calendar order.
pub const CASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a case date, accepting `YYYY-MM-DD` or a full `YYYY-MM-DDTHH:MM:SS`
/// timestamp.
#[must_use]
pub fn parse_case_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, CASE_DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

impl CaseRecord {
    /// Strictly validates a submitted JSON document.
    ///
    /// All four top-level fields and all three victim fields must be present
    /// with the right types, the age must be a non-negative integer and the
    /// date must parse. The date is rewritten to [`CASE_DATE_FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCaseError`] describing the first problem found.
    pub fn from_json(value: &Value) -> Result<Self, InvalidCaseError> {
        let mut record: Self = serde_json::from_value(value.clone())?;

        let Some(date) = parse_case_date(record.date_of_case.trim()) else {
            return Err(InvalidCaseError::Date {
                value: record.date_of_case,
            });
        };
        record.date_of_case = date.format(CASE_DATE_FORMAT).to_string();

        for (field, text) in [
            (CaseField::CaseType, &record.case_type),
            (CaseField::Location, &record.location),
            (CaseField::VictimEthnicity, &record.victim.ethnicity),
            (CaseField::VictimSex, &record.victim.sex),
        ] {
            if text.trim().is_empty() {
                return Err(InvalidCaseError::Blank { field });
            }
        }

        Ok(record)
    }

    /// Serializes this record back to the stored document shape.
    #[must_use]
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Known neighborhood coordinates used for the location distribution map.
const LOCATION_COORDINATES: &[(&str, f64, f64)] = &[
    ("Centro", -23.5505, -46.6333),
    ("Bairro A", -23.55, -46.65),
    ("Bairro B", -23.52, -46.66),
    ("Zona Rural", -23.6, -46.7),
];

/// Returns `(latitude, longitude)` for a known neighborhood name.
#[must_use]
pub fn location_coordinates(location: &str) -> Option<(f64, f64)> {
    LOCATION_COORDINATES
        .iter()
        .find(|(name, _, _)| *name == location)
        .map(|&(_, lat, lon)| (lat, lon))
}

/// The exact feature shape the classification pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Victim age.
    #[serde(rename = "idade")]
    pub age: u32,
    /// Victim ethnicity (categorical).
    #[serde(rename = "etnia")]
    pub ethnicity: String,
    /// Case location (categorical).
    #[serde(rename = "localizacao")]
    pub location: String,
}

/// A feature row paired with its true case type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    /// Input features.
    pub features: FeatureRow,
    /// True `tipo_do_caso`.
    pub case_type: String,
}

/// A rectangular, order-preserving feature + label table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureTable {
    rows: Vec<LabeledRow>,
}

impl FeatureTable {
    /// Wraps already-projected rows.
    #[must_use]
    pub const fn new(rows: Vec<LabeledRow>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in input order.
    #[must_use]
    pub fn rows(&self) -> &[LabeledRow] {
        &self.rows
    }

    /// Feature rows in input order.
    #[must_use]
    pub fn features(&self) -> Vec<FeatureRow> {
        self.rows.iter().map(|r| r.features.clone()).collect()
    }

    /// True labels in input order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.case_type.as_str()).collect()
    }
}

impl FromIterator<LabeledRow> for FeatureTable {
    fn from_iter<T: IntoIterator<Item = LabeledRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "data_do_caso": "2024-01-01",
            "tipo_do_caso": "Furto",
            "localizacao": "Centro",
            "vitima": { "etnia": "Branca", "idade": 30, "sexo": "masculino" }
        })
    }

    #[test]
    fn accepts_well_formed_case() {
        let record = CaseRecord::from_json(&sample()).unwrap();
        assert_eq!(record.case_type, "Furto");
        assert_eq!(record.victim.age, 30);
        assert_eq!(record.to_document(), sample());
    }

    #[test]
    fn rejects_missing_victim_field() {
        let mut doc = sample();
        doc["vitima"].as_object_mut().unwrap().remove("sexo");
        assert!(matches!(
            CaseRecord::from_json(&doc),
            Err(InvalidCaseError::Shape(_))
        ));
    }

    #[test]
    fn rejects_unparsable_date() {
        let mut doc = sample();
        doc["data_do_caso"] = json!("01/02/2024");
        assert!(matches!(
            CaseRecord::from_json(&doc),
            Err(InvalidCaseError::Date { .. })
        ));
    }

    #[test]
    fn rejects_negative_age() {
        let mut doc = sample();
        doc["vitima"]["idade"] = json!(-3);
        assert!(CaseRecord::from_json(&doc).is_err());
    }

    #[test]
    fn rejects_blank_location() {
        let mut doc = sample();
        doc["localizacao"] = json!("  ");
        assert!(matches!(
            CaseRecord::from_json(&doc),
            Err(InvalidCaseError::Blank {
                field: CaseField::Location
            })
        ));
    }

    #[test]
    fn stores_dates_zero_padded() {
        for raw in ["2024-1-5", "2024-01-05T10:00:00", " 2024-01-05 "] {
            let mut doc = sample();
            doc["data_do_caso"] = json!(raw);
            let record = CaseRecord::from_json(&doc).unwrap();
            assert_eq!(record.date_of_case, "2024-01-05");
            assert_eq!(record.to_document()["data_do_caso"], "2024-01-05");
        }
    }

    #[test]
    fn text_and_numbers_skip_blank_or_mistyped_values() {
        let doc = json!({
            "localizacao": "   ",
            "tipo_do_caso": "Furto",
            "vitima": { "idade": -4, "etnia": 3 }
        });
        assert_eq!(CaseField::CaseType.text(&doc), Some("Furto"));
        assert_eq!(CaseField::Location.text(&doc), None);
        assert_eq!(CaseField::VictimEthnicity.text(&doc), None);
        assert_eq!(CaseField::VictimAge.whole_number(&doc), None);
        assert_eq!(CaseField::VictimAge.whole_number(&sample()), Some(30));
    }

    #[test]
    fn accepts_timestamp_dates() {
        assert!(parse_case_date("2024-03-05T10:11:12").is_some());
        assert!(parse_case_date("2024-13-05").is_none());
    }

    #[test]
    fn field_lookup_follows_nested_paths() {
        let doc = sample();
        assert_eq!(CaseField::VictimAge.lookup(&doc), Some(&json!(30)));
        assert_eq!(CaseField::Location.lookup(&doc), Some(&json!("Centro")));
        assert_eq!(CaseField::VictimAge.to_string(), "vitima.idade");
        assert_eq!(CaseField::VictimSex.lookup(&json!({})), None);
    }

    #[test]
    fn sentinels_ignore_case() {
        assert!(is_all_sentinel("todos"));
        assert!(is_all_sentinel("ALL"));
        assert!(!is_all_sentinel("masculino"));
    }

    #[test]
    fn known_locations_have_coordinates() {
        assert_eq!(location_coordinates("Centro"), Some((-23.5505, -46.6333)));
        assert_eq!(location_coordinates("Atlantis"), None);
    }
}
