//! HTTP handler functions for the site profitability API.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use site_profit_ai::AiError;
use site_profit_ai::classifier::{Classification, ClassificationRequest};
use site_profit_ai::image::ImageInput;
use site_profit_analysis::{AnalysisError, geometry, normalize_currency, parser};
use site_profit_analysis_models::BreakdownSource;
use site_profit_database::ResultStoreError;
use site_profit_database_models::{NewAnalysisResult, PageRequest, RecordError, ResultUpdate};
use site_profit_server_models::{
    AnalysisResponse, AnalyzeRequest, ApiError, ApiHealth, CalculateRequest, ClassificationInfo,
    ListResultsParams,
};

use crate::AppState;
use crate::pipeline::{self, PipelineError, PipelineInput};

/// A failed request, mapped to a status code and [`ApiError`] body.
#[derive(Debug)]
enum Failure {
    /// The pipeline rejected its inputs.
    Analysis(AnalysisError),
    /// The request itself is malformed.
    BadRequest {
        kind: &'static str,
        message: String,
    },
    /// No saved analysis has the requested id.
    NotFound(String),
    /// No vision provider is configured.
    ClassifierUnavailable,
    /// The vision provider call failed.
    Classifier(AiError),
    /// The result store failed.
    Store(ResultStoreError),
}

impl Failure {
    fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            kind,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ClassifierUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Classifier(e) => match e {
                AiError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AiError::InvalidImage { .. } => StatusCode::BAD_REQUEST,
                AiError::Config { .. } | AiError::NotConfigured { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AiError::Http(_) | AiError::Json(_) | AiError::Provider { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Store(e) => match e {
                ResultStoreError::Record(RecordError::InvalidPage { .. }) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ApiError {
        match self {
            Self::Analysis(e) => ApiError {
                error: e.to_string(),
                kind: e.kind().to_string(),
                step: e.step().map(|s| s.to_string()),
            },
            Self::BadRequest { kind, message } => ApiError::new(*kind, message.clone()),
            Self::NotFound(id) => ApiError::new("not_found", format!("No saved analysis {id}")),
            Self::ClassifierUnavailable => ApiError::new(
                "classifier_not_configured",
                "No vision provider configured. Set ANTHROPIC_API_KEY, OPENAI_API_KEY, or \
                 AI_BASE_URL.",
            ),
            Self::Classifier(e) => {
                let kind = match e {
                    AiError::Parse(_) => "parse_error",
                    AiError::InvalidImage { .. } => "invalid_image",
                    AiError::Config { .. } | AiError::NotConfigured { .. } => {
                        "classifier_not_configured"
                    }
                    AiError::Http(_) | AiError::Json(_) | AiError::Provider { .. } => {
                        "classifier_failed"
                    }
                };
                ApiError::new(kind, e.to_string())
            }
            Self::Store(e) => match e {
                ResultStoreError::Record(RecordError::InvalidPage { .. }) => {
                    ApiError::new("invalid_page", e.to_string())
                }
                _ => ApiError::new("store_error", "Failed to access saved analyses"),
            },
        }
    }

    fn response(&self) -> HttpResponse {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self:?}");
        } else {
            log::debug!("Request rejected: {self:?}");
        }
        HttpResponse::build(status).json(self.body())
    }
}

impl From<AnalysisError> for Failure {
    fn from(e: AnalysisError) -> Self {
        Self::Analysis(e)
    }
}

impl From<ResultStoreError> for Failure {
    fn from(e: ResultStoreError) -> Self {
        Self::Store(e)
    }
}

impl From<PipelineError> for Failure {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Analysis(e) => Self::Analysis(e),
            PipelineError::MetricsOutOfRange(e) => {
                Self::bad_request("metrics_out_of_range", e.to_string())
            }
            PipelineError::IncompleteResult => {
                Self::bad_request("incomplete_result", e.to_string())
            }
            PipelineError::Store(e) => Self::Store(e),
        }
    }
}

impl From<AiError> for Failure {
    fn from(e: AiError) -> Self {
        Self::Classifier(e)
    }
}

fn respond<T: serde::Serialize>(result: Result<T, Failure>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(failure) => failure.response(),
    }
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier_configured: state.classifier.is_some(),
    })
}

/// `GET /api/calibration`
///
/// Returns the calibration constants in effect.
pub async fn calibration(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.calibration.as_ref())
}

/// `POST /api/calculate`
///
/// Runs the pipeline on a caller-supplied breakdown.
pub async fn calculate(
    state: web::Data<AppState>,
    body: web::Json<CalculateRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let result = pipeline::complete_analysis(
        state.db.as_ref(),
        &state.calibration,
        PipelineInput {
            breakdown: request.area_distribution,
            source: BreakdownSource::Supplied,
            screenshot: request.screenshot,
            parameters: Some(request.business_parameters),
            location: request.location,
            classification: None,
        },
        request.save,
    )
    .await;
    respond(result.map_err(Failure::from))
}

/// `POST /api/analyze`
///
/// Classifies a screenshot with the vision provider, then runs the
/// pipeline when business parameters are supplied.
pub async fn analyze(state: web::Data<AppState>, body: web::Json<AnalyzeRequest>) -> HttpResponse {
    respond(analyze_inner(&state, body.into_inner()).await)
}

async fn analyze_inner(
    state: &AppState,
    request: AnalyzeRequest,
) -> Result<AnalysisResponse, Failure> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or(Failure::ClassifierUnavailable)?;

    // Reject bad geometry before paying for a provider call.
    geometry::resolve_geometry(
        &request.screenshot,
        state.calibration.scale_correction_factor,
    )?;

    let image = ImageInput::from_base64(&request.image)?;
    let classification = classifier
        .classify(&ClassificationRequest {
            image,
            metadata: request.screenshot,
        })
        .await?;

    let Classification {
        breakdown,
        source,
        raw_response,
        parse_error,
    } = classification;

    let info = ClassificationInfo {
        provider: classifier.provider_name().to_string(),
        model: classifier.model().to_string(),
        raw_response,
        parse_error,
    };

    Ok(pipeline::complete_analysis(
        state.db.as_ref(),
        &state.calibration,
        PipelineInput {
            breakdown,
            source,
            screenshot: request.screenshot,
            parameters: request.business_parameters,
            location: request.location,
            classification: Some(info),
        },
        request.save,
    )
    .await?)
}

/// `GET /api/results`
///
/// Lists saved analyses, newest first.
pub async fn list_results(
    state: web::Data<AppState>,
    params: web::Query<ListResultsParams>,
) -> HttpResponse {
    let result = async {
        let page = PageRequest::new(params.offset, params.limit).map_err(ResultStoreError::from)?;
        Ok::<_, Failure>(site_profit_database::list_results(state.db.as_ref(), page).await?)
    }
    .await;
    respond(result)
}

/// `POST /api/results`
///
/// Saves a caller-computed analysis.
pub async fn create_result(
    state: web::Data<AppState>,
    body: web::Json<NewAnalysisResult>,
) -> HttpResponse {
    let result = async {
        let mut record = body.into_inner();
        let location = &record.location_data;
        if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lng) {
            return Err(Failure::bad_request(
                "invalid_location",
                format!(
                    "coordinates out of range: {}, {}",
                    location.lat, location.lng
                ),
            ));
        }
        parser::check_breakdown(&record.area_distribution)
            .map_err(|e| Failure::bad_request("invalid_breakdown", e.to_string()))?;
        site_profit_analysis::validate_parameters(&record.business_parameters)
            .map_err(|e| Failure::bad_request("invalid_parameters", e.to_string()))?;
        record.business_parameters.currency =
            normalize_currency(&record.business_parameters.currency)?;
        Ok(site_profit_database::save_result(state.db.as_ref(), record).await?)
    }
    .await;
    respond(result)
}

/// `GET /api/results/{id}`
pub async fn get_result(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    let result = async {
        site_profit_database::get_result(state.db.as_ref(), &id)
            .await?
            .ok_or_else(|| Failure::NotFound(id.clone()))
    }
    .await;
    respond(result)
}

/// `PATCH /api/results/{id}`
///
/// Updates the title and/or notes of a saved analysis.
pub async fn update_result(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ResultUpdate>,
) -> HttpResponse {
    let id = path.into_inner();
    let result = async {
        site_profit_database::update_result(state.db.as_ref(), &id, body.into_inner())
            .await?
            .ok_or_else(|| Failure::NotFound(id.clone()))
    }
    .await;
    respond(result)
}

/// `DELETE /api/results/{id}`
pub async fn delete_result(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match site_profit_database::delete_result(state.db.as_ref(), &id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => Failure::NotFound(id).response(),
        Err(e) => Failure::Store(e).response(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use actix_web::{App, test};
    use site_profit_ai::classifier::{LandUseClassifier, ParseFailurePolicy};
    use site_profit_ai::providers::VisionProvider;
    use site_profit_analysis::Calibration;
    use site_profit_analysis_models::LandUseBreakdown;
    use site_profit_database_models::{AnalysisResult, Page};
    use site_profit_server_models::SaveOptions;

    use super::*;
    use crate::configure_api;

    /// Base64 of the 8-byte PNG signature.
    const PNG_BASE64: &str = "iVBORw0KGgo=";

    struct FixedProvider(&'static str);

    #[async_trait::async_trait]
    impl VisionProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-vision"
        }

        async fn describe_image(
            &self,
            _system_prompt: &str,
            _prompt: &str,
            _image: &ImageInput,
        ) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    struct TestState {
        path: PathBuf,
        state: web::Data<AppState>,
    }

    impl Drop for TestState {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    async fn test_state(answer: Option<&'static str>) -> TestState {
        let path = std::env::temp_dir().join(format!(
            "site_profit_server_test_{}.db",
            uuid::Uuid::new_v4()
        ));
        let db = site_profit_database::open_db(&path).await.unwrap();
        let calibration = Calibration::default();
        let classifier = answer.map(|answer| {
            Arc::new(LandUseClassifier::new(
                Box::new(FixedProvider(answer)),
                &calibration,
                ParseFailurePolicy::UseDefault,
            ))
        });
        TestState {
            path,
            state: web::Data::new(AppState {
                db: Arc::from(db),
                classifier,
                calibration: Arc::new(calibration),
            }),
        }
    }

    fn calculate_body(road: f64, save: bool) -> serde_json::Value {
        serde_json::json!({
            "areaDistribution": {"residential": 45, "road": road, "openSpace": 30},
            "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536},
            "businessParameters": {
                "buildingWidth": 3.8,
                "operatingHours": 12,
                "productPrice": 50000,
                "currency": "idr"
            },
            "location": {"lat": -6.2088, "lng": 106.8456, "address": "Jl. Sudirman"},
            "save": save,
            "title": "Corner lot"
        })
    }

    #[actix_web::test]
    async fn health_reports_classifier_status() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["classifierConfigured"], false);
    }

    #[actix_web::test]
    async fn calculate_returns_fixture_metrics() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/calculate")
            .set_json(calculate_body(25.0, false))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["breakdownSource"], "supplied");
        assert_eq!(body["businessMetrics"]["cglp"], 38);
        assert_eq!(body["businessMetrics"]["apt"], 141_834);
        assert_eq!(body["businessMetrics"]["dailyRevenue"], 6_382_541);
        assert_eq!(body["businessMetrics"]["yearlyRevenue"], 2_329_627_392_i64);
        assert_eq!(body["locationData"]["address"], "Jl. Sudirman");
        assert!(body.get("saved").is_none());
    }

    #[actix_web::test]
    async fn calculate_maps_division_by_zero_to_422() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/calculate")
            .set_json(calculate_body(0.0, false))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "division_by_zero");
        assert_eq!(body.step.as_deref(), Some("pdr"));
    }

    #[actix_web::test]
    async fn saved_results_can_be_listed_updated_and_deleted() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/calculate")
            .set_json(calculate_body(25.0, true))
            .to_request();
        let body: AnalysisResponse = test::call_and_read_body_json(&app, req).await;
        let saved = body.saved.unwrap();
        assert_eq!(saved.business_parameters.currency, "IDR");
        assert_eq!(saved.title.as_deref(), Some("Corner lot"));

        let req = test::TestRequest::get()
            .uri("/api/results?limit=10")
            .to_request();
        let page: Page<AnalysisResult> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page.total, 1);
        assert!(!page.has_more);
        assert_eq!(page.results[0].id, saved.id);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/results/{}", saved.id))
            .set_json(serde_json::json!({"notes": "Near a school"}))
            .to_request();
        let updated: AnalysisResult = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.notes.as_deref(), Some("Near a school"));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/results/{}", saved.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/results/{}", saved.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_json_body_gets_api_error() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let mut body = calculate_body(25.0, false);
        body["screenshot"]["pixelWidth"] = serde_json::json!(-1);
        let req = test::TestRequest::post()
            .uri("/api/calculate")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "bad_request");
        assert!(body.step.is_none());
        assert!(!body.error.is_empty());
    }

    #[actix_web::test]
    async fn malformed_query_gets_api_error() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/results?limit=abc")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "bad_request");
    }

    #[actix_web::test]
    async fn create_result_validates_breakdown_and_parameters() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/calculate")
            .set_json(calculate_body(25.0, false))
            .to_request();
        let response: AnalysisResponse = test::call_and_read_body_json(&app, req).await;
        let record = pipeline::new_record(&response, SaveOptions::default()).unwrap();

        let mut bad = record.clone();
        bad.area_distribution = LandUseBreakdown::new(150.0, 25.0, 25.0);
        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(&bad)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "invalid_breakdown");

        let mut bad = record.clone();
        bad.area_distribution = LandUseBreakdown::new(45.0, -25.0, 30.0);
        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(&bad)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut bad = record.clone();
        bad.business_parameters.product_price = -50_000.0;
        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(&bad)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "invalid_parameters");

        let mut bad = record.clone();
        bad.business_parameters.operating_hours = 30.0;
        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(&bad)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/results")
            .set_json(&record)
            .to_request();
        let saved: AnalysisResult = test::call_and_read_body_json(&app, req).await;
        assert_eq!(saved.area_distribution, record.area_distribution);

        let req = test::TestRequest::get().uri("/api/results").to_request();
        let page: Page<AnalysisResult> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page.total, 1);
    }

    #[actix_web::test]
    async fn list_rejects_zero_limit() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/results?limit=0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn analyze_without_provider_is_503() {
        let fixture = test_state(None).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(serde_json::json!({
                "image": PNG_BASE64,
                "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn analyze_classifies_and_computes() {
        let fixture = test_state(Some("Residential: 45%\nRoad: 25%\nOpen Space: 30%")).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(serde_json::json!({
                "image": format!("data:image/png;base64,{PNG_BASE64}"),
                "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536},
                "businessParameters": {
                    "buildingWidth": 3.8,
                    "operatingHours": 12,
                    "productPrice": 50000,
                    "currency": "IDR"
                }
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["breakdownSource"], "classifier");
        assert_eq!(body["classification"]["provider"], "fixed");
        assert_eq!(body["businessMetrics"]["tppd"], 128);
    }

    #[actix_web::test]
    async fn analyze_falls_back_to_default_breakdown() {
        let fixture = test_state(Some("The image is too blurry to tell.")).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(serde_json::json!({
                "image": PNG_BASE64,
                "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536}
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["breakdownSource"], "default");
        assert_eq!(body["areaDistribution"]["road"], 25.0);
        assert!(body["classification"]["parseError"].is_string());
        assert!(body.get("businessMetrics").is_none());
    }

    #[actix_web::test]
    async fn analyze_rejects_missing_scale_before_classifying() {
        let fixture = test_state(Some("Residential: 45%\nRoad: 25%\nOpen Space: 30%")).await;
        let app = test::init_service(
            App::new()
                .app_data(fixture.state.clone())
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(serde_json::json!({
                "image": PNG_BASE64,
                "screenshot": {"pixelWidth": 800, "pixelHeight": 600}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.kind, "invalid_metadata");
    }
}
