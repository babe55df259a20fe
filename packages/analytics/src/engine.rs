//! Model-backed aggregations over a projected [`FeatureTable`].

use std::collections::BTreeMap;

use case_records_analytics_models::{
    AgeBracket, BracketProbabilities, ClassAccuracy, CorrelationMatrix, ModelInfo, Prediction,
    ScoreMap,
};
use case_records_case_models::{FeatureRow, FeatureTable};
use case_records_classifier::forest::argmax;
use case_records_classifier::{ForestConfig, LabelCodec, ModelBundle, train};

use crate::AnalyticsError;

/// Variables of the age/case-type correlation matrix.
pub const CORRELATION_VARIABLES: [&str; 2] = ["idade", "tipo_do_caso_codificado"];

/// Rounds `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

fn rounded_scores(classes: &[String], values: &[f64]) -> ScoreMap {
    ScoreMap::zip(
        classes.iter().map(String::as_str),
        values.iter().map(|&p| round_to(p, 4)),
    )
}

/// Mean predicted class probabilities per age bracket.
///
/// Brackets with no rows are omitted; each probability is rounded to 4
/// decimals.
///
/// # Errors
///
/// Returns [`AnalyticsError::NoData`] if `table` is empty.
pub fn probability_by_age_bracket(
    table: &FeatureTable,
    model: &ModelBundle,
) -> Result<Vec<BracketProbabilities>, AnalyticsError> {
    if table.is_empty() {
        return Err(AnalyticsError::NoData);
    }

    let n_classes = model.classes().len();
    let mut by_bracket: BTreeMap<AgeBracket, Vec<FeatureRow>> = BTreeMap::new();
    for row in table.rows() {
        if let Some(bracket) = AgeBracket::of(row.features.age) {
            by_bracket
                .entry(bracket)
                .or_default()
                .push(row.features.clone());
        }
    }

    let mut out = Vec::with_capacity(by_bracket.len());
    for (bracket, rows) in by_bracket {
        let mut mean = vec![0.0; n_classes];
        for proba in model.predict_proba(&rows) {
            for (acc, p) in mean.iter_mut().zip(proba) {
                *acc += p;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let n = rows.len() as f64;
        for p in &mut mean {
            *p /= n;
        }

        out.push(BracketProbabilities {
            bracket,
            probabilities: rounded_scores(model.classes(), &mean),
        });
    }

    Ok(out)
}

/// Rows whose label the codec knows, paired with their class code.
fn encoded_rows<'a>(
    table: &'a FeatureTable,
    codec: &LabelCodec,
) -> (Vec<&'a FeatureRow>, Vec<usize>) {
    let mut rows = Vec::with_capacity(table.len());
    let mut codes = Vec::with_capacity(table.len());
    let mut skipped = 0_usize;

    for row in table.rows() {
        match codec.encode(&row.case_type) {
            Ok(code) => {
                rows.push(&row.features);
                codes.push(code);
            }
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping row: {e}");
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} row(s) with case types unknown to the model");
    }

    (rows, codes)
}

/// Per-class accuracy percentages, rounded to 2 decimals, in codec order.
///
/// Classes with no rows report 0. An empty table yields an empty result.
#[must_use]
pub fn per_class_accuracy(table: &FeatureTable, model: &ModelBundle) -> ClassAccuracy {
    if table.is_empty() {
        return ClassAccuracy::default();
    }

    let (rows, truth) = encoded_rows(table, model.codec());
    let rows: Vec<FeatureRow> = rows.into_iter().cloned().collect();
    let predicted = model.pipeline().predict(&rows);

    let classes = model.classes().to_vec();
    let precision = (0..classes.len())
        .map(|class| {
            let total = truth.iter().filter(|&&t| t == class).count();
            let correct = truth
                .iter()
                .zip(&predicted)
                .filter(|&(&t, &p)| t == class && p == class)
                .count();
            if total == 0 {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let pct = correct as f64 / total as f64 * 100.0;
                round_to(pct, 2)
            }
        })
        .collect();

    ClassAccuracy { classes, precision }
}

/// Pearson coefficient of `xs` and `ys`, or `None` when either has zero
/// variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    #[allow(clippy::cast_precision_loss)]
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// 2x2 Pearson correlation matrix between victim age and encoded case type,
/// over rows whose label the codec knows.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] with fewer than 2 usable rows
/// or when either variable is constant.
pub fn age_case_type_correlation(
    table: &FeatureTable,
    codec: &LabelCodec,
) -> Result<CorrelationMatrix, AnalyticsError> {
    let (rows, codes) = encoded_rows(table, codec);
    if rows.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            message: format!(
                "correlation needs at least 2 records with known case types, found {}",
                rows.len()
            ),
        });
    }

    let ages: Vec<f64> = rows.iter().map(|r| f64::from(r.age)).collect();
    #[allow(clippy::cast_precision_loss)]
    let labels: Vec<f64> = codes.iter().map(|&c| c as f64).collect();

    let r = pearson(&ages, &labels).ok_or_else(|| AnalyticsError::InsufficientData {
        message: "correlation is undefined when age or case type is constant".to_string(),
    })?;
    let r = round_to(r, 4);

    Ok(CorrelationMatrix {
        variables: CORRELATION_VARIABLES.iter().map(ToString::to_string).collect(),
        matrix: vec![vec![1.0, r], vec![r, 1.0]],
    })
}

/// Expanded feature name to importance, categorical features first.
#[must_use]
pub fn feature_importances(model: &ModelBundle) -> ScoreMap {
    ScoreMap::new(model.feature_importances())
}

/// Classifies a single row.
///
/// # Errors
///
/// Returns [`AnalyticsError::Codec`] if the predicted code cannot be decoded.
pub fn predict_one(model: &ModelBundle, row: FeatureRow) -> Result<Prediction, AnalyticsError> {
    let proba = model
        .predict_proba(&[row])
        .into_iter()
        .next()
        .unwrap_or_default();
    let predicted_class = model.codec().decode(argmax(&proba))?.to_string();

    Ok(Prediction {
        predicted_class,
        probabilities: rounded_scores(model.classes(), &proba),
    })
}

/// Trains a throwaway model on `table` and returns its feature importances.
/// The shared model is never touched.
///
/// # Errors
///
/// * [`AnalyticsError::NoData`] if `table` is empty
/// * [`AnalyticsError::InsufficientData`] if it has too few rows or only
///   one case type
pub fn refit_importances(
    table: &FeatureTable,
    config: &ForestConfig,
) -> Result<ScoreMap, AnalyticsError> {
    if table.is_empty() {
        return Err(AnalyticsError::NoData);
    }
    let model = train(table, config)?;
    Ok(feature_importances(&model))
}

/// Summary of the loaded model.
#[must_use]
pub fn model_info(model: &ModelBundle) -> ModelInfo {
    ModelInfo {
        classes: model.classes().to_vec(),
        features: model.pipeline().feature_names(),
        accuracy: model.accuracy(),
    }
}
