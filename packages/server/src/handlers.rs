//! HTTP handler functions for the case records API.

use actix_web::{HttpResponse, web};
use case_records_analytics::{engine, projector, stats};
use case_records_case_models::{CaseField, FeatureRow};
use case_records_database::queries;
use case_records_database_models::Projection;
use case_records_server_models::{ApiHealth, ApiMessage, CaseQueryParams, PredictionRequest};
use serde_json::Value;

use crate::{ApiError, AppState};

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Bem vindo à API de análise de casos criminais")
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: state.model.is_some(),
    })
}

async fn filtered_docs(
    state: &AppState,
    params: &CaseQueryParams,
    projection: &Projection,
) -> Result<Vec<Value>, ApiError> {
    let filter = params.to_filter()?;
    Ok(queries::find_cases_projected(state.store.as_ref(), &filter, projection).await?)
}

/// `GET /api/casos`
///
/// Lists cases matching the filter parameters.
pub async fn list_cases(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let docs = filtered_docs(&state, &params, &Projection::Full).await?;
    Ok(HttpResponse::Ok().json(docs))
}

/// `POST /api/casos`
pub async fn create_case(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    queries::insert_case(state.store.as_ref(), &body).await?;
    Ok(HttpResponse::Created().json(ApiMessage {
        message: "Caso criado com sucesso".to_string(),
    }))
}

fn case_not_found(date: &str) -> ApiError {
    ApiError::NotFound(format!("Caso não encontrado: {date}"))
}

/// `GET /api/casos/{data}`
///
/// Returns the first case recorded on the given date.
pub async fn get_case(
    state: web::Data<AppState>,
    date: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let case = queries::find_case_by_date(state.store.as_ref(), &date)
        .await?
        .ok_or_else(|| case_not_found(&date))?;
    Ok(HttpResponse::Ok().json(case))
}

/// `DELETE /api/casos/{data}`
///
/// Deletes the first case recorded on the given date.
pub async fn delete_case(
    state: web::Data<AppState>,
    date: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = queries::delete_case_by_date(state.store.as_ref(), &date).await?;
    if deleted == 0 {
        return Err(case_not_found(&date));
    }
    Ok(HttpResponse::Ok().json(ApiMessage {
        message: "Caso deletado com sucesso".to_string(),
    }))
}

/// `GET /api/stats/localizacoes`
pub async fn location_stats(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let projection = Projection::Fields(vec![CaseField::Location]);
    let docs = filtered_docs(&state, &params, &projection).await?;
    Ok(HttpResponse::Ok().json(stats::location_points(&docs)))
}

/// `GET /api/stats/idades`
pub async fn age_stats(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let projection = Projection::Fields(vec![CaseField::VictimAge]);
    let docs = filtered_docs(&state, &params, &projection).await?;
    Ok(HttpResponse::Ok().json(stats::ages(&docs)))
}

/// `GET /api/stats/boxplot-sexo`
pub async fn sex_age_stats(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let projection = Projection::Fields(vec![
        CaseField::VictimSex,
        CaseField::VictimAge,
        CaseField::CaseType,
    ]);
    let docs = filtered_docs(&state, &params, &projection).await?;
    Ok(HttpResponse::Ok().json(stats::sex_age_types(&docs)))
}

/// `GET /api/stats/pizza-tipo`
pub async fn type_stats(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let projection = Projection::Fields(vec![CaseField::CaseType]);
    let docs = filtered_docs(&state, &params, &projection).await?;
    Ok(HttpResponse::Ok().json(stats::type_counts(&docs)))
}

/// `POST /api/predizer`
///
/// Classifies a single `{idade, etnia, localizacao}` payload.
pub async fn predict(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    let request: PredictionRequest = serde_json::from_value(body.into_inner()).map_err(|e| {
        ApiError::Input(format!("Invalid JSON. Expected: idade, etnia, localizacao ({e})"))
    })?;
    let row = FeatureRow::try_from(request)?;

    log::debug!("predict: {row:?}");
    Ok(HttpResponse::Ok().json(engine::predict_one(model, row)?))
}

/// `GET /api/modelo/coefs`
pub async fn importances(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    Ok(HttpResponse::Ok().json(engine::feature_importances(model)))
}

/// `GET /api/modelo/coefs-filtrados`
///
/// Trains a throwaway model on the filtered cases and returns its feature
/// importances. The shared model is left untouched.
pub async fn filtered_importances(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let docs = filtered_docs(&state, &params, &Projection::Full).await?;
    let table = projector::project(&docs);
    let config = state.forest;

    let importances = web::block(move || engine::refit_importances(&table, &config))
        .await
        .map_err(|e| ApiError::Unavailable(format!("Refit task failed: {e}")))??;

    Ok(HttpResponse::Ok().json(importances))
}

/// `GET /api/modelo/probabilidade-idade`
pub async fn probability_by_age(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    let docs = filtered_docs(&state, &params, &Projection::Full).await?;
    let table = projector::project(&docs);
    Ok(HttpResponse::Ok().json(engine::probability_by_age_bracket(&table, model)?))
}

/// `GET /api/modelo/correlacoes`
pub async fn correlations(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    let docs = filtered_docs(&state, &params, &Projection::Full).await?;
    let table = projector::project(&docs);
    Ok(HttpResponse::Ok().json(engine::age_case_type_correlation(&table, model.codec())?))
}

/// `GET /api/modelo/acuracia`
pub async fn accuracy(
    state: web::Data<AppState>,
    params: web::Query<CaseQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    let docs = filtered_docs(&state, &params, &Projection::Full).await?;
    let table = projector::project(&docs);
    Ok(HttpResponse::Ok().json(engine::per_class_accuracy(&table, model)))
}

/// `GET /api/modelo/info`
pub async fn model_info(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let model = state.model()?;
    Ok(HttpResponse::Ok().json(engine::model_info(model)))
}
