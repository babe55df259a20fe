//! Column preprocessing: one-hot encoding of categorical columns followed by
//! numeric pass-through.
//!
//! The expanded feature layout is fixed: every categorical level in column
//! order (`etnia_*`, then `localizacao_*`, levels sorted), followed by the
//! numeric columns (`idade`), unscaled.

use case_records_case_models::FeatureRow;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The input columns the pipeline consumes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum FeatureColumn {
    /// Victim ethnicity.
    #[strum(serialize = "etnia")]
    Ethnicity,
    /// Case location.
    #[strum(serialize = "localizacao")]
    Location,
    /// Victim age.
    #[strum(serialize = "idade")]
    Age,
}

/// Categorical columns, in expanded-feature order.
pub const CATEGORICAL_COLUMNS: [FeatureColumn; 2] =
    [FeatureColumn::Ethnicity, FeatureColumn::Location];

/// Numeric columns, in expanded-feature order.
pub const NUMERIC_COLUMNS: [FeatureColumn; 1] = [FeatureColumn::Age];

impl FeatureColumn {
    fn categorical_value(self, row: &FeatureRow) -> Option<&str> {
        match self {
            Self::Ethnicity => Some(&row.ethnicity),
            Self::Location => Some(&row.location),
            Self::Age => None,
        }
    }

    fn numeric_value(self, row: &FeatureRow) -> Option<f64> {
        match self {
            Self::Age => Some(f64::from(row.age)),
            Self::Ethnicity | Self::Location => None,
        }
    }
}

/// One-hot encoder over the categorical columns. Categories unseen at fit
/// time encode to all zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted distinct levels per entry of [`CATEGORICAL_COLUMNS`].
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learns the sorted levels of each categorical column.
    #[must_use]
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let categories = CATEGORICAL_COLUMNS
            .iter()
            .map(|col| {
                let mut levels: Vec<String> = rows
                    .iter()
                    .filter_map(|r| col.categorical_value(r))
                    .map(ToString::to_string)
                    .collect();
                levels.sort();
                levels.dedup();
                levels
            })
            .collect();

        Self { categories }
    }

    /// Total number of one-hot outputs.
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Appends the one-hot encoding of `row` to `out`.
    pub fn transform_into(&self, row: &FeatureRow, out: &mut Vec<f64>) {
        for (col, levels) in CATEGORICAL_COLUMNS.iter().zip(&self.categories) {
            let value = col.categorical_value(row);
            let hit = value.and_then(|v| levels.binary_search_by(|l| l.as_str().cmp(v)).ok());
            out.extend((0..levels.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        }
    }

    /// Names of the one-hot outputs, `<column>_<level>`.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        CATEGORICAL_COLUMNS
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, levels)| levels.iter().map(move |level| format!("{col}_{level}")))
            .collect()
    }
}

/// The fitted preprocessing step: one-hot categorical encoding followed by
/// unscaled numeric pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preprocessor {
    one_hot: OneHotEncoder,
}

impl Preprocessor {
    /// Fits the preprocessing step.
    #[must_use]
    pub fn fit(rows: &[FeatureRow]) -> Self {
        Self {
            one_hot: OneHotEncoder::fit(rows),
        }
    }

    /// Width of a transformed row.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.one_hot.width() + NUMERIC_COLUMNS.len()
    }

    /// Transforms a single row.
    #[must_use]
    pub fn transform_row(&self, row: &FeatureRow) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_features());
        self.one_hot.transform_into(row, &mut out);
        out.extend(NUMERIC_COLUMNS.iter().filter_map(|col| col.numeric_value(row)));
        out
    }

    /// Transforms a batch of rows.
    #[must_use]
    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Expanded feature names in output order: `[categorical..., numeric...]`.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.one_hot.feature_names();
        names.extend(NUMERIC_COLUMNS.iter().map(ToString::to_string));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(age: u32, ethnicity: &str, location: &str) -> FeatureRow {
        FeatureRow {
            age,
            ethnicity: ethnicity.to_string(),
            location: location.to_string(),
        }
    }

    #[test]
    fn expands_categorical_levels_then_numeric() {
        let rows = [
            row(30, "Preta", "Centro"),
            row(12, "Branca", "Zona Rural"),
            row(50, "Preta", "Bairro A"),
        ];
        let pre = Preprocessor::fit(&rows);
        assert_eq!(
            pre.feature_names(),
            [
                "etnia_Branca",
                "etnia_Preta",
                "localizacao_Bairro A",
                "localizacao_Centro",
                "localizacao_Zona Rural",
                "idade"
            ]
        );
        assert_eq!(pre.n_features(), 6);
        assert_eq!(
            pre.transform_row(&rows[0]),
            [0.0, 1.0, 0.0, 1.0, 0.0, 30.0]
        );
    }

    #[test]
    fn unknown_categories_encode_to_zeros() {
        let pre = Preprocessor::fit(&[row(30, "Preta", "Centro")]);
        assert_eq!(
            pre.transform_row(&row(44, "Amarela", "Bairro Z")),
            [0.0, 0.0, 44.0]
        );
    }

    #[test]
    fn column_names_match_wire_names() {
        assert_eq!(FeatureColumn::Ethnicity.to_string(), "etnia");
        assert_eq!(FeatureColumn::Location.as_ref(), "localizacao");
        assert_eq!("idade".parse::<FeatureColumn>().unwrap(), FeatureColumn::Age);
    }
}
