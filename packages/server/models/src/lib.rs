#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the case records server.
//!
//! These types define the JSON contract of the HTTP API. They are separate
//! from the store and analytics types to allow independent evolution of the
//! API contract.

use case_records_case_models::FeatureRow;
use case_records_database_models::{CaseFilter, FilterError, RawFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filter query parameters shared by the listing, statistics, and model
/// endpoints. Every parameter is optional; blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseQueryParams {
    /// Victim sex, or `todos`/`all`.
    #[serde(rename = "sexo")]
    pub sex: Option<String>,
    /// Victim ethnicity, or `todos`/`all`.
    #[serde(rename = "etnia")]
    pub ethnicity: Option<String>,
    /// Inclusive minimum victim age.
    #[serde(rename = "idadeMin")]
    pub age_min: Option<String>,
    /// Inclusive maximum victim age.
    #[serde(rename = "idadeMax")]
    pub age_max: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`).
    #[serde(rename = "dataInicio")]
    pub date_from: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`).
    #[serde(rename = "dataFim")]
    pub date_to: Option<String>,
}

impl CaseQueryParams {
    /// Parses the parameters into filter criteria.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if an age or date parameter is malformed.
    pub fn to_filter(&self) -> Result<CaseFilter, FilterError> {
        CaseFilter::from_params(RawFilter {
            sex: self.sex.as_deref(),
            ethnicity: self.ethnicity.as_deref(),
            age_min: self.age_min.as_deref(),
            age_max: self.age_max.as_deref(),
            date_from: self.date_from.as_deref(),
            date_to: self.date_to.as_deref(),
        })
    }
}

/// A prediction request is missing a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid JSON. Expected: idade, etnia, localizacao (missing '{field}')")]
pub struct MissingFieldError {
    /// Name of the first missing field.
    pub field: &'static str,
}

/// Body of `POST /api/predizer`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionRequest {
    /// Victim age.
    #[serde(rename = "idade")]
    pub age: Option<u32>,
    /// Victim ethnicity.
    #[serde(rename = "etnia")]
    pub ethnicity: Option<String>,
    /// Case location.
    #[serde(rename = "localizacao")]
    pub location: Option<String>,
}

impl TryFrom<PredictionRequest> for FeatureRow {
    type Error = MissingFieldError;

    fn try_from(req: PredictionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            age: req.age.ok_or(MissingFieldError { field: "idade" })?,
            ethnicity: req.ethnicity.ok_or(MissingFieldError { field: "etnia" })?,
            location: req
                .location
                .ok_or(MissingFieldError { field: "localizacao" })?,
        })
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Application version.
    pub version: String,
    /// Whether a trained model is loaded.
    pub model_loaded: bool,
}

/// A plain confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Human-readable message.
    pub message: String,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable error message.
    #[serde(rename = "erro")]
    pub error: String,
    /// Machine-readable reason, for 422 responses.
    #[serde(rename = "motivo", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_use_api_names() {
        let params: CaseQueryParams = serde_json::from_value(serde_json::json!({
            "sexo": "todos",
            "idadeMin": "18",
            "dataFim": "2024-12-31"
        }))
        .unwrap();
        let filter = params.to_filter().unwrap();
        assert_eq!(filter.sex, None);
        assert_eq!(filter.age_min, Some(18));
        assert_eq!(filter.date_to.as_deref(), Some("2024-12-31"));
    }

    #[test]
    fn malformed_age_is_rejected() {
        let params = CaseQueryParams {
            age_max: Some("old".to_string()),
            ..CaseQueryParams::default()
        };
        assert!(params.to_filter().is_err());
    }

    #[test]
    fn prediction_request_requires_all_fields() {
        let err = FeatureRow::try_from(PredictionRequest {
            age: Some(30),
            ethnicity: Some("Parda".to_string()),
            location: None,
        })
        .unwrap_err();
        assert_eq!(err.field, "localizacao");

        let row = FeatureRow::try_from(PredictionRequest {
            age: Some(30),
            ethnicity: Some("Parda".to_string()),
            location: Some("Centro".to_string()),
        })
        .unwrap();
        assert_eq!(row.age, 30);
    }

    #[test]
    fn error_body_omits_absent_reason() {
        let body = serde_json::to_value(ApiErrorBody {
            error: "x".to_string(),
            reason: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "erro": "x" }));
    }
}
