#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Filter criteria, predicate, and projection definitions.
//!
//! A [`CaseFilter`] is the per-request, presence-driven set of optional
//! constraints. The database crate turns it into a [`Predicate`], an explicit
//! value object of field paths and operators that every store
//! implementation either evaluates directly ([`Predicate::matches`]) or
//! renders into parameterized SQL.

use std::cmp::Ordering;

use case_records_case_models::{CASE_DATE_FORMAT, CaseField, is_all_sentinel, parse_case_date};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A malformed filter value supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// An age bound is not a non-negative integer.
    #[error("Invalid value for '{param}': '{value}' is not a non-negative integer")]
    Age {
        /// Request parameter name.
        param: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A date bound is not an ISO 8601 date.
    #[error("Invalid value for '{param}': '{value}' is not a YYYY-MM-DD date")]
    Date {
        /// Request parameter name.
        param: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Optional constraints on the case collection.
///
/// `None` always means "no constraint". Categorical fields never hold a
/// sentinel (`"todos"`/`"all"`); [`CaseFilter::from_params`] strips them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    /// Victim sex (matched case-insensitively).
    pub sex: Option<String>,
    /// Victim ethnicity (matched case-insensitively).
    pub ethnicity: Option<String>,
    /// Inclusive lower bound on victim age.
    pub age_min: Option<u32>,
    /// Inclusive upper bound on victim age.
    pub age_max: Option<u32>,
    /// Inclusive lower bound on the case date (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    /// Inclusive upper bound on the case date (`YYYY-MM-DD`).
    pub date_to: Option<String>,
}

/// Raw, unparsed filter values as they arrive from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFilter<'a> {
    /// `sexo`
    pub sex: Option<&'a str>,
    /// `etnia`
    pub ethnicity: Option<&'a str>,
    /// `idadeMin`
    pub age_min: Option<&'a str>,
    /// `idadeMax`
    pub age_max: Option<&'a str>,
    /// `dataInicio`
    pub date_from: Option<&'a str>,
    /// `dataFim`
    pub date_to: Option<&'a str>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn categorical(value: Option<&str>) -> Option<String> {
    present(value)
        .filter(|v| !is_all_sentinel(v))
        .map(ToString::to_string)
}

fn age_bound(param: &'static str, value: Option<&str>) -> Result<Option<u32>, FilterError> {
    present(value)
        .map(|v| {
            v.parse::<u32>().map_err(|_| FilterError::Age {
                param,
                value: v.to_string(),
            })
        })
        .transpose()
}

fn date_bound(param: &'static str, value: Option<&str>) -> Result<Option<String>, FilterError> {
    present(value)
        .map(|v| {
            parse_case_date(v)
                .map(|d| d.format(CASE_DATE_FORMAT).to_string())
                .ok_or_else(|| FilterError::Date {
                    param,
                    value: v.to_string(),
                })
        })
        .transpose()
}

impl CaseFilter {
    /// Parses raw request values into filter criteria.
    ///
    /// Blank values and sentinels are treated as absent. Dates are
    /// normalized to zero-padded `YYYY-MM-DD` so that string order equals
    /// calendar order.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if an age or date bound is malformed.
    pub fn from_params(raw: RawFilter<'_>) -> Result<Self, FilterError> {
        Ok(Self {
            sex: categorical(raw.sex),
            ethnicity: categorical(raw.ethnicity),
            age_min: age_bound("idadeMin", raw.age_min)?,
            age_max: age_bound("idadeMax", raw.age_max)?,
            date_from: date_bound("dataInicio", raw.date_from)?,
            date_to: date_bound("dataFim", raw.date_to)?,
        })
    }

    /// Whether no constraint is set.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.sex.is_none()
            && self.ethnicity.is_none()
            && self.age_min.is_none()
            && self.age_max.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// String operand, compared lexicographically.
    Text(String),
    /// Integer operand, compared numerically.
    Integer(i64),
}

impl Operand {
    #[allow(clippy::cast_precision_loss)]
    fn compare(&self, value: &Value) -> Option<Ordering> {
        match (self, value) {
            (Self::Text(op), Value::String(v)) => Some(v.as_str().cmp(op.as_str())),
            (Self::Integer(op), Value::Number(n)) => n
                .as_i64()
                .map(|v| v.cmp(op))
                .or_else(|| n.as_f64().and_then(|v| v.partial_cmp(&(*op as f64)))),
            _ => None,
        }
    }
}

/// A single comparison applied to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Exact equality.
    Eq(Operand),
    /// Case-insensitive string equality.
    EqIgnoreCase(String),
    /// Greater than or equal (inclusive lower bound).
    Gte(Operand),
    /// Less than or equal (inclusive upper bound).
    Lte(Operand),
}

impl Condition {
    /// Evaluates this condition against a document value. Values of a
    /// different JSON type never match.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Eq(op) => op.compare(value) == Some(Ordering::Equal),
            Self::EqIgnoreCase(op) => value
                .as_str()
                .is_some_and(|v| v.to_lowercase() == op.to_lowercase()),
            Self::Gte(op) => op.compare(value).is_some_and(Ordering::is_ge),
            Self::Lte(op) => op.compare(value).is_some_and(Ordering::is_le),
        }
    }
}

/// A field path paired with a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Document field the condition applies to.
    pub field: CaseField,
    /// The condition.
    pub condition: Condition,
}

/// A conjunction of clauses. The empty predicate matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// The predicate that matches every document.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Adds a clause.
    #[must_use]
    pub fn with(mut self, field: CaseField, condition: Condition) -> Self {
        self.clauses.push(Clause { field, condition });
        self
    }

    /// Whether this predicate has no clauses (matches everything).
    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The clauses, in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluates the predicate against a JSON document. A clause whose field
    /// is missing from the document does not match.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| {
            clause
                .field
                .lookup(doc)
                .is_some_and(|value| clause.condition.matches(value))
        })
    }
}

/// Which fields a `find` returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// The whole document.
    #[default]
    Full,
    /// Only the listed fields (nested paths keep their parent objects).
    Fields(Vec<CaseField>),
}

impl Projection {
    /// Applies the projection to a document.
    #[must_use]
    pub fn apply(&self, doc: &Value) -> Value {
        let Self::Fields(fields) = self else {
            return doc.clone();
        };

        let mut out = Map::new();
        for field in fields {
            if let Some(value) = field.lookup(doc) {
                let segments: Vec<&str> = field.segments().collect();
                insert_path(&mut out, &segments, value.clone());
            }
        }
        Value::Object(out)
    }
}

fn insert_path(out: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            out.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = out
                .entry((*first).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                insert_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(age: i64, sex: &str, date: &str) -> Value {
        json!({
            "data_do_caso": date,
            "tipo_do_caso": "Furto",
            "localizacao": "Centro",
            "vitima": { "etnia": "Parda", "idade": age, "sexo": sex }
        })
    }

    #[test]
    fn sentinels_and_blanks_are_unconstrained() {
        let filter = CaseFilter::from_params(RawFilter {
            sex: Some("todos"),
            ethnicity: Some("all"),
            age_min: Some(""),
            date_to: Some("  "),
            ..RawFilter::default()
        })
        .unwrap();
        assert!(filter.is_unconstrained());
    }

    #[test]
    fn rejects_malformed_age() {
        let err = CaseFilter::from_params(RawFilter {
            age_min: Some("trinta"),
            ..RawFilter::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::Age {
                param: "idadeMin",
                value: "trinta".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(matches!(
            CaseFilter::from_params(RawFilter {
                date_to: Some("2024/01/01"),
                ..RawFilter::default()
            }),
            Err(FilterError::Date {
                param: "dataFim",
                ..
            })
        ));
    }

    #[test]
    fn normalizes_timestamp_dates() {
        let filter = CaseFilter::from_params(RawFilter {
            date_from: Some("2024-02-03T10:00:00"),
            ..RawFilter::default()
        })
        .unwrap();
        assert_eq!(filter.date_from.as_deref(), Some("2024-02-03"));
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::all().matches(&doc(10, "feminino", "2024-01-01")));
        assert!(Predicate::all().matches(&json!({})));
    }

    #[test]
    fn range_conditions_are_inclusive() {
        let predicate = Predicate::all()
            .with(CaseField::VictimAge, Condition::Gte(Operand::Integer(18)))
            .with(CaseField::VictimAge, Condition::Lte(Operand::Integer(30)));
        assert!(predicate.matches(&doc(18, "f", "2024-01-01")));
        assert!(predicate.matches(&doc(30, "f", "2024-01-01")));
        assert!(!predicate.matches(&doc(17, "f", "2024-01-01")));
        assert!(!predicate.matches(&doc(31, "f", "2024-01-01")));
    }

    #[test]
    fn date_ranges_compare_as_strings() {
        let predicate = Predicate::all().with(
            CaseField::DateOfCase,
            Condition::Lte(Operand::Text("2024-02-01".to_string())),
        );
        assert!(predicate.matches(&doc(1, "f", "2024-01-31")));
        assert!(predicate.matches(&doc(1, "f", "2024-02-01")));
        assert!(!predicate.matches(&doc(1, "f", "2024-02-02")));
    }

    #[test]
    fn case_insensitive_equality() {
        let predicate = Predicate::all().with(
            CaseField::VictimSex,
            Condition::EqIgnoreCase("Masculino".to_string()),
        );
        assert!(predicate.matches(&doc(1, "masculino", "2024-01-01")));
        assert!(!predicate.matches(&doc(1, "feminino", "2024-01-01")));

        let accented = Condition::EqIgnoreCase("INDÍGENA".to_string());
        assert!(accented.matches(&json!("Indígena")));
        assert!(!accented.matches(&json!("Indigena")));
    }

    #[test]
    fn type_mismatch_and_missing_fields_never_match() {
        let predicate =
            Predicate::all().with(CaseField::VictimAge, Condition::Gte(Operand::Integer(1)));
        assert!(!predicate.matches(&json!({ "vitima": { "idade": "40" } })));
        assert!(!predicate.matches(&json!({ "vitima": {} })));
    }

    #[test]
    fn projection_keeps_nested_parents() {
        let projected = Projection::Fields(vec![CaseField::VictimAge, CaseField::Location])
            .apply(&doc(42, "f", "2024-01-01"));
        assert_eq!(
            projected,
            json!({ "vitima": { "idade": 42 }, "localizacao": "Centro" })
        );
    }

    #[test]
    fn projection_skips_missing_fields() {
        let projected =
            Projection::Fields(vec![CaseField::VictimAge]).apply(&json!({ "localizacao": "X" }));
        assert_eq!(projected, json!({}));
    }
}
