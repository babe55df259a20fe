//! Conversion of domain errors into HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use case_records_analytics::AnalyticsError;
use case_records_classifier::CodecError;
use case_records_database::DbError;
use case_records_database_models::FilterError;
use case_records_server_models::{ApiErrorBody, MissingFieldError};
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed.
    #[error("{0}")]
    Input(String),

    /// No records matched.
    #[error("No data available for the given filters")]
    NoData,

    /// Too few or too uniform records for the computation.
    #[error("{0}")]
    InsufficientData(String),

    /// The request references a label the model does not know.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store or the model is unavailable.
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    /// Machine-readable reason attached to 422 responses.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::NoData => Some("sem_dados"),
            Self::InsufficientData(_) => Some("dados_insuficientes"),
            Self::Codec(_) => Some("rotulo_desconhecido"),
            Self::Input(_) | Self::NotFound(_) | Self::Unavailable(_) => None,
        }
    }

    /// Error returned when a model-backed endpoint is called without a
    /// loaded model.
    #[must_use]
    pub fn model_missing() -> Self {
        Self::Unavailable("Model not loaded; run the train command first".to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::NoData | Self::InsufficientData(_) | Self::Codec(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{status}: {self}");
        }

        HttpResponse::build(status).json(ApiErrorBody {
            error: self.to_string(),
            reason: self.reason().map(ToString::to_string),
        })
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidCase(e) => Self::Input(format!("Invalid case: {e}")),
            other => Self::Unavailable(format!("Case store unavailable: {other}")),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        Self::Input(e.to_string())
    }
}

impl From<MissingFieldError> for ApiError {
    fn from(e: MissingFieldError) -> Self {
        Self::Input(e.to_string())
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::NoData => Self::NoData,
            AnalyticsError::InsufficientData { message } => Self::InsufficientData(message),
            AnalyticsError::Codec(e) => Self::Codec(e),
            AnalyticsError::Classifier(e) => Self::Unavailable(format!("Model error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(
            ApiError::from(FilterError::Age {
                param: "idadeMin",
                value: "x".to_string()
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AnalyticsError::NoData).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::model_missing().status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unprocessable_errors_carry_a_reason() {
        assert_eq!(ApiError::NoData.reason(), Some("sem_dados"));
        assert_eq!(
            ApiError::InsufficientData(String::new()).reason(),
            Some("dados_insuficientes")
        );
        assert_eq!(ApiError::Input(String::new()).reason(), None);
    }
}
