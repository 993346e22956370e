#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for site profitability analysis.
//!
//! Serves the REST API for running the area-to-revenue pipeline, classifying
//! map screenshots with a vision provider, and browsing saved analyses, plus
//! the static frontend build. Saved analyses are persisted in a `SQLite`
//! database at `data/results.db`.

mod handlers;
pub mod interactive;
pub mod pipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, middleware, web};
use site_profit_ai::AiError;
use site_profit_ai::classifier::{LandUseClassifier, ParseFailurePolicy};
use site_profit_ai::providers::{self, VisionProvider};
use site_profit_analysis::Calibration;
use site_profit_server_models::ApiError;
use switchy_database::Database;

/// Maximum JSON request body size. Screenshots arrive base64-encoded.
pub const JSON_PAYLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Default directory of the frontend build.
pub const DEFAULT_STATIC_DIR: &str = "app/dist";

/// Shared application state.
pub struct AppState {
    /// `SQLite` database of saved analyses.
    pub db: Arc<dyn Database>,
    /// Land-use classifier, when a vision provider is configured.
    pub classifier: Option<Arc<LandUseClassifier>>,
    /// Calibration constants used by every analysis.
    pub calibration: Arc<Calibration>,
}

impl AppState {
    /// Loads calibration, opens the results database, and creates the
    /// classifier from environment variables.
    ///
    /// A missing vision provider is not an error: `/api/analyze` then
    /// answers 503 while the rest of the API keeps working.
    ///
    /// # Errors
    ///
    /// Returns an error if the calibration file is invalid, the results
    /// database cannot be opened, or the classifier settings are invalid.
    pub async fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let calibration = Calibration::from_env()?;

        let classifier = build_classifier(
            &calibration,
            providers::create_provider_from_env(),
            ParseFailurePolicy::from_env(),
        )?;

        let db_path = site_profit_database::db_path_from_env();
        log::info!("Opening results database at {}...", db_path.display());
        let db = site_profit_database::open_db(&db_path).await?;

        Ok(Self {
            db: Arc::from(db),
            classifier: classifier.map(Arc::new),
            calibration: Arc::new(calibration),
        })
    }
}

/// Builds the classifier from the configured provider and parse-failure
/// policy. Only a provider that is not configured at all disables
/// classification; every other settings error is returned.
fn build_classifier(
    calibration: &Calibration,
    provider: Result<Box<dyn VisionProvider>, AiError>,
    policy: Result<ParseFailurePolicy, AiError>,
) -> Result<Option<LandUseClassifier>, AiError> {
    let policy = policy?;
    let provider = match provider {
        Ok(provider) => provider,
        Err(e @ AiError::NotConfigured { .. }) => {
            log::warn!("Screenshot classification disabled: {e}");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    log::info!(
        "Land-use classifier using {} ({}), on parse failure: {policy}",
        provider.name(),
        provider.model(),
    );
    Ok(Some(LandUseClassifier::new(provider, calibration, policy)))
}

/// Turns a request that cannot be deserialized into a 400 with an
/// [`ApiError`] body.
fn bad_request<E>(err: E, _req: &HttpRequest) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    let body = ApiError::new("bad_request", err.to_string());
    log::debug!("Rejected malformed request: {err}");
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Registers the `/api` routes and the JSON and query extractor settings.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_PAYLOAD_LIMIT)
            .error_handler(bad_request::<JsonPayloadError>),
    )
    .app_data(web::QueryConfig::default().error_handler(bad_request::<QueryPayloadError>))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/calibration", web::get().to(handlers::calibration))
            .route("/calculate", web::post().to(handlers::calculate))
            .route("/analyze", web::post().to(handlers::analyze))
            .route("/results", web::get().to(handlers::list_results))
            .route("/results", web::post().to(handlers::create_result))
            .route("/results/{id}", web::get().to(handlers::get_result))
            .route("/results/{id}", web::patch().to(handlers::update_result))
            .route("/results/{id}", web::delete().to(handlers::delete_result)),
    );
}

/// Returns the frontend directory from `STATIC_DIR`, or
/// [`DEFAULT_STATIC_DIR`], if it exists.
fn static_dir_from_env() -> Option<PathBuf> {
    let dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string());
    let path = Path::new(&dir);
    if path.is_dir() {
        Some(path.to_path_buf())
    } else {
        log::info!("No frontend build at {dir}, serving API only");
        None
    }
}

/// Starts the site profitability API server.
///
/// Builds the [`AppState`] from environment variables and starts the
/// Actix-Web HTTP server on `BIND_ADDR`:`PORT`. This is a regular async
/// function; the caller is responsible for providing the async runtime
/// (e.g. via `#[actix_web::main]`) and for initializing logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the state cannot be built, or the
/// HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let state = AppState::from_env()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = web::Data::new(state);

    let static_dir = static_dir_from_env();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let static_dir = static_dir.clone();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            // Serve frontend static files (production)
            .configure(move |cfg| {
                if let Some(dir) = static_dir {
                    cfg.service(Files::new("/", dir).index_file("index.html"));
                }
            })
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
