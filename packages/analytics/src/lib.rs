#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation engine for case records.
//!
//! Raw store documents are projected into a [`FeatureTable`] by
//! [`projector::project`]; the [`engine`] functions then combine that table
//! with a trained [`ModelBundle`] to produce the analytics served over HTTP.
//! [`stats`] holds model-free descriptive statistics over raw documents.
//!
//! [`FeatureTable`]: case_records_case_models::FeatureTable
//! [`ModelBundle`]: case_records_classifier::ModelBundle

pub mod engine;
pub mod projector;
pub mod stats;

use case_records_classifier::{ClassifierError, CodecError};
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// No usable records matched the query.
    #[error("No data available for the given filters")]
    NoData,

    /// Records exist but are too few or too uniform for the computation.
    #[error("Insufficient data: {message}")]
    InsufficientData {
        /// What was missing.
        message: String,
    },

    /// A label or code outside the model's vocabulary.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Model fitting or inference failed.
    #[error(transparent)]
    Classifier(ClassifierError),
}

impl From<ClassifierError> for AnalyticsError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::InsufficientData { rows, required } => Self::InsufficientData {
                message: format!("{rows} usable record(s), at least {required} required"),
            },
            ClassifierError::SingleClass { class } => Self::InsufficientData {
                message: format!("every usable record is labelled '{class}'"),
            },
            ClassifierError::Codec(e) => Self::Codec(e),
            other => Self::Classifier(other),
        }
    }
}
