#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the case analytics engine.
//!
//! Serialized field names follow the public JSON API (`faixa`,
//! `probabilidades`, `precisao`, ...); Rust field names are English.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fixed victim age brackets, inclusive on both ends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AgeBracket {
    /// 0 to 18.
    #[serde(rename = "0-18")]
    #[strum(serialize = "0-18")]
    Minor,
    /// 19 to 30.
    #[serde(rename = "19-30")]
    #[strum(serialize = "19-30")]
    YoungAdult,
    /// 31 to 45.
    #[serde(rename = "31-45")]
    #[strum(serialize = "31-45")]
    Adult,
    /// 46 to 60.
    #[serde(rename = "46-60")]
    #[strum(serialize = "46-60")]
    MiddleAged,
    /// 61 to 100.
    #[serde(rename = "61-100")]
    #[strum(serialize = "61-100")]
    Senior,
}

impl AgeBracket {
    /// All brackets in ascending age order.
    pub const ALL: [Self; 5] = [
        Self::Minor,
        Self::YoungAdult,
        Self::Adult,
        Self::MiddleAged,
        Self::Senior,
    ];

    /// Inclusive `(min, max)` ages.
    #[must_use]
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minor => (0, 18),
            Self::YoungAdult => (19, 30),
            Self::Adult => (31, 45),
            Self::MiddleAged => (46, 60),
            Self::Senior => (61, 100),
        }
    }

    /// Whether `age` falls in this bracket.
    #[must_use]
    pub const fn contains(self, age: u32) -> bool {
        let (min, max) = self.bounds();
        age >= min && age <= max
    }

    /// The bracket containing `age`, if any. Ages above 100 have none.
    #[must_use]
    pub fn of(age: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.contains(age))
    }
}

/// An insertion-ordered `label -> value` mapping serialized as a JSON
/// object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap(Vec<(String, f64)>);

impl ScoreMap {
    /// Wraps `(label, value)` pairs, keeping their order.
    #[must_use]
    pub const fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    /// Pairs labels with values positionally.
    #[must_use]
    pub fn zip<'a>(
        labels: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self(
            labels
                .into_iter()
                .map(ToString::to_string)
                .zip(values)
                .collect(),
        )
    }

    /// Value for `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|&(_, v)| v)
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[(String, f64)] {
        &self.0
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all values.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, v)| v).sum()
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreMapVisitor;

        impl<'de> Visitor<'de> for ScoreMapVisitor {
            type Value = ScoreMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of label to number")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ScoreMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, value)) = access.next_entry::<String, f64>()? {
                    entries.push((label, value));
                }
                Ok(ScoreMap(entries))
            }
        }

        deserializer.deserialize_map(ScoreMapVisitor)
    }
}

/// Mean predicted class probabilities for one age bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketProbabilities {
    /// The bracket.
    #[serde(rename = "faixa")]
    pub bracket: AgeBracket,
    /// Class label to mean probability.
    #[serde(rename = "probabilidades")]
    pub probabilities: ScoreMap,
}

/// Per-class accuracy, as percentages aligned with `classes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAccuracy {
    /// Class labels in code order.
    pub classes: Vec<String>,
    /// Percentage of each class's rows predicted correctly.
    #[serde(rename = "precisao")]
    pub precision: Vec<f64>,
}

/// A symmetric correlation matrix over named variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Variable names, in row/column order.
    #[serde(rename = "variaveis")]
    pub variables: Vec<String>,
    /// Row-major coefficients.
    #[serde(rename = "matriz")]
    pub matrix: Vec<Vec<f64>>,
}

/// A single classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The most probable case type.
    #[serde(rename = "classe_predita")]
    pub predicted_class: String,
    /// Class label to probability.
    #[serde(rename = "probabilidades")]
    pub probabilities: ScoreMap,
}

/// A case location with map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    /// Neighborhood name.
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Victim sex and age with the case type, for box plots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexAgeType {
    /// Victim sex.
    #[serde(rename = "sexo")]
    pub sex: String,
    /// Victim age.
    #[serde(rename = "idade")]
    pub age: u32,
    /// Case type.
    #[serde(rename = "tipo_do_caso")]
    pub case_type: String,
}

/// Case type to number of cases.
pub type TypeCounts = BTreeMap<String, u64>;

/// Summary of the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Class labels in code order.
    pub classes: Vec<String>,
    /// Expanded feature names.
    pub features: Vec<String>,
    /// Training accuracy, if recorded.
    #[serde(rename = "acuracia")]
    pub accuracy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_cover_zero_to_one_hundred() {
        assert_eq!(AgeBracket::of(0), Some(AgeBracket::Minor));
        assert_eq!(AgeBracket::of(18), Some(AgeBracket::Minor));
        assert_eq!(AgeBracket::of(19), Some(AgeBracket::YoungAdult));
        assert_eq!(AgeBracket::of(60), Some(AgeBracket::MiddleAged));
        assert_eq!(AgeBracket::of(100), Some(AgeBracket::Senior));
        assert_eq!(AgeBracket::of(101), None);
        assert_eq!(AgeBracket::Adult.to_string(), "31-45");
    }

    #[test]
    fn score_map_keeps_insertion_order() {
        let map = ScoreMap::zip(["Tráfico", "Assalto"], [0.25, 0.75]);
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"Tráfico":0.25,"Assalto":0.75}"#
        );
        let back: ScoreMap = serde_json::from_str(r#"{"b":1.0,"a":2.0}"#).unwrap();
        assert_eq!(back.entries()[0].0, "b");
        assert_eq!(back.get("a"), Some(2.0));
    }

    #[test]
    fn serializes_with_api_field_names() {
        let value = serde_json::to_value(BracketProbabilities {
            bracket: AgeBracket::Senior,
            probabilities: ScoreMap::zip(["Furto"], [1.0]),
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "faixa": "61-100", "probabilidades": { "Furto": 1.0 } })
        );
    }
}
