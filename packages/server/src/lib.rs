#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for case records.
//!
//! Serves CRUD over the case store, descriptive statistics, and the
//! classification endpoints backed by a trained [`ModelBundle`]. The model is
//! loaded once at startup and shared read-only; when it is missing the model
//! endpoints answer 503 while everything else keeps working.

pub mod error;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use case_records_classifier::artifact::DEFAULT_MODEL_PATH;
use case_records_classifier::{ForestConfig, ModelBundle};
use case_records_database::db::{DEFAULT_DB_PATH, StoreKind, open_store};
use case_records_database::{CaseStore, DbError};

pub use error::ApiError;

/// Shared application state.
pub struct AppState {
    /// Case document store.
    pub store: Arc<dyn CaseStore>,
    /// Trained model, if one could be loaded.
    pub model: Option<Arc<ModelBundle>>,
    /// Hyperparameters for the ad-hoc refit endpoint.
    pub forest: ForestConfig,
}

impl AppState {
    /// The loaded model.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unavailable`] if no model is loaded.
    pub fn model(&self) -> Result<&ModelBundle, ApiError> {
        self.model.as_deref().ok_or_else(ApiError::model_missing)
    }
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to listen on (`PORT`).
    pub port: u16,
    /// Store implementation (`CASES_STORE`).
    pub store: StoreKind,
    /// `SQLite` store path (`CASES_DB_PATH`).
    pub db_path: PathBuf,
    /// Model artifact path (`MODEL_PATH`).
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5000,
            store: StoreKind::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `CASES_STORE`, `CASES_DB_PATH`, and
    /// `MODEL_PATH`, falling back to defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            store: std::env::var("CASES_STORE")
                .ok()
                .and_then(|s| {
                    s.parse::<StoreKind>()
                        .inspect_err(|e| log::warn!("Ignoring CASES_STORE: {e}"))
                        .ok()
                })
                .unwrap_or(defaults.store),
            db_path: std::env::var("CASES_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            model_path: std::env::var("MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
        }
    }
}

/// Opens the store and loads the model described by `config`.
///
/// A missing or unreadable model is logged and leaves [`AppState::model`]
/// empty.
///
/// # Errors
///
/// Returns [`DbError`] if the store cannot be opened.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, DbError> {
    log::info!("Opening case store...");
    let store = open_store(config.store, &config.db_path).await?;

    log::info!("Loading model from {}...", config.model_path.display());
    let model = match ModelBundle::load(&config.model_path) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            log::error!(
                "Failed to load model from {}: {e}; model endpoints will be unavailable",
                config.model_path.display()
            );
            None
        }
    };

    Ok(AppState {
        store: Arc::from(store),
        model,
        forest: ForestConfig::default(),
    })
}

/// Registers every route.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/casos", web::get().to(handlers::list_cases))
            .route("/casos", web::post().to(handlers::create_case))
            .route("/casos/{data}", web::get().to(handlers::get_case))
            .route("/casos/{data}", web::delete().to(handlers::delete_case))
            .route("/stats/localizacoes", web::get().to(handlers::location_stats))
            .route("/stats/idades", web::get().to(handlers::age_stats))
            .route("/stats/boxplot-sexo", web::get().to(handlers::sex_age_stats))
            .route("/stats/pizza-tipo", web::get().to(handlers::type_stats))
            .route("/predizer", web::post().to(handlers::predict))
            .route("/modelo/coefs", web::get().to(handlers::importances))
            .route(
                "/modelo/coefs-filtrados",
                web::get().to(handlers::filtered_importances),
            )
            .route(
                "/modelo/probabilidade-idade",
                web::get().to(handlers::probability_by_age),
            )
            .route("/modelo/correlacoes", web::get().to(handlers::correlations))
            .route("/modelo/acuracia", web::get().to(handlers::accuracy))
            .route("/modelo/info", web::get().to(handlers::model_info)),
    );
}

/// Starts the case records API server.
///
/// The caller is responsible for initializing logging and providing the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Error` if the store cannot be opened, or if the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = build_state(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to open case store: {e}")))?;
    let state = web::Data::new(state);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
