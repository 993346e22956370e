//! The tail shared by every analysis, whether it arrives over HTTP or
//! from the CLI: currency normalization, metrics, location, and the
//! record to persist.

use site_profit_analysis::{AnalysisError, Calibration, geometry, normalize_currency};
use site_profit_analysis_models::{
    BreakdownSource, BusinessParameters, LandUseBreakdown, ScreenshotMetadata,
};
use site_profit_database::ResultStoreError;
use site_profit_database_models::{NewAnalysisResult, RecordError, StoredMetrics};
use site_profit_server_models::{AnalysisResponse, ClassificationInfo, LocationInput, SaveOptions};
use switchy_database::Database;
use thiserror::Error;

/// Errors from completing an analysis.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline rejected its inputs.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// A metric cannot be stored as a whole number.
    #[error("Metrics out of range: {0}")]
    MetricsOutOfRange(RecordError),

    /// Saving was requested without a location or business parameters.
    #[error("Saving requires a location and business parameters")]
    IncompleteResult,

    /// The result store failed.
    #[error(transparent)]
    Store(#[from] ResultStoreError),
}

/// Everything known about a site once its breakdown is settled.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// The breakdown to compute from.
    pub breakdown: LandUseBreakdown,
    /// Whether the breakdown was supplied, parsed, or substituted.
    pub source: BreakdownSource,
    /// Pixel dimensions and scale of the screenshot.
    pub screenshot: ScreenshotMetadata,
    /// Business inputs. Without them only geometry is resolved.
    pub parameters: Option<BusinessParameters>,
    /// Site coordinates and address.
    pub location: Option<LocationInput>,
    /// Classifier details, when the breakdown came from a screenshot.
    pub classification: Option<ClassificationInfo>,
}

/// Resolves geometry, runs the metrics chain when parameters are given,
/// and builds the location record. Nothing is saved.
///
/// # Errors
///
/// Returns [`PipelineError::Analysis`] for invalid inputs or a failing
/// step, and [`PipelineError::MetricsOutOfRange`] if a metric does not fit
/// the stored representation.
pub fn evaluate(
    calibration: &Calibration,
    input: PipelineInput,
) -> Result<AnalysisResponse, PipelineError> {
    let PipelineInput {
        breakdown,
        source,
        screenshot,
        parameters,
        location,
        classification,
    } = input;

    let (geometry, metrics, parameters) = match parameters {
        Some(mut parameters) => {
            parameters.currency = normalize_currency(&parameters.currency)?;
            let outcome =
                site_profit_analysis::analyze(&breakdown, &screenshot, &parameters, calibration)?;
            (outcome.geometry, Some(outcome.metrics), Some(parameters))
        }
        None => (
            geometry::resolve_geometry(&screenshot, calibration.scale_correction_factor)?,
            None,
            None,
        ),
    };

    let location_data = location
        .map(|l| site_profit_analysis::locate(l.lat, l.lng, l.address, &geometry, calibration))
        .transpose()?;

    let business_metrics = metrics
        .as_ref()
        .map(StoredMetrics::try_from)
        .transpose()
        .map_err(PipelineError::MetricsOutOfRange)?;

    Ok(AnalysisResponse {
        area_distribution: breakdown,
        breakdown_source: source,
        geometry,
        business_metrics,
        business_parameters: parameters,
        location_data,
        classification,
        saved: None,
    })
}

/// Builds the record to persist for an evaluated analysis.
///
/// # Errors
///
/// Returns [`PipelineError::IncompleteResult`] unless the analysis has a
/// location and computed metrics.
pub fn new_record(
    response: &AnalysisResponse,
    options: SaveOptions,
) -> Result<NewAnalysisResult, PipelineError> {
    let (Some(location_data), Some(business_metrics), Some(business_parameters)) = (
        response.location_data.clone(),
        response.business_metrics,
        response.business_parameters.clone(),
    ) else {
        return Err(PipelineError::IncompleteResult);
    };

    Ok(NewAnalysisResult {
        location_data,
        area_distribution: response.area_distribution,
        business_metrics,
        business_parameters,
        title: options.title,
        notes: options.notes,
    })
}

/// Evaluates an analysis and saves it to `db` when `save.save` is set.
///
/// # Errors
///
/// Returns any error from [`evaluate`] or [`new_record`], or
/// [`PipelineError::Store`] if saving fails.
pub async fn complete_analysis(
    db: &dyn Database,
    calibration: &Calibration,
    input: PipelineInput,
    save: SaveOptions,
) -> Result<AnalysisResponse, PipelineError> {
    let mut response = evaluate(calibration, input)?;

    if save.save {
        let record = new_record(&response, save)?;
        let saved = site_profit_database::save_result(db, record).await?;
        log::info!("Saved analysis {}", saved.id);
        response.saved = Some(saved);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn input(parameters: Option<BusinessParameters>) -> PipelineInput {
        PipelineInput {
            breakdown: LandUseBreakdown::new(45.0, 25.0, 30.0),
            source: BreakdownSource::Supplied,
            screenshot: ScreenshotMetadata {
                pixel_width: 800,
                pixel_height: 600,
                scale_meters_per_pixel: Some(0.0536),
            },
            parameters,
            location: Some(LocationInput {
                lat: -6.2088,
                lng: 106.8456,
                address: None,
            }),
            classification: None,
        }
    }

    fn parameters() -> BusinessParameters {
        BusinessParameters {
            building_width: 3.8,
            operating_hours: 12.0,
            product_price: 50_000.0,
            currency: "idr".to_string(),
        }
    }

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("site_profit_pipeline_{}.db", uuid::Uuid::new_v4()))
    }

    #[test]
    fn evaluate_normalizes_currency_and_computes_metrics() {
        let response = evaluate(&Calibration::default(), input(Some(parameters()))).unwrap();

        assert_eq!(
            response.business_parameters.as_ref().unwrap().currency,
            "IDR"
        );
        let metrics = response.business_metrics.unwrap();
        assert_eq!(metrics.daily_revenue.get(), 6_382_541);
        assert_eq!(metrics.yearly_revenue.get(), 2_329_627_392);
        assert!(response.location_data.is_some());
        assert!(response.saved.is_none());
    }

    #[test]
    fn record_requires_business_parameters() {
        let response = evaluate(&Calibration::default(), input(None)).unwrap();
        assert!(response.business_metrics.is_none());
        assert!(matches!(
            new_record(&response, SaveOptions::default()),
            Err(PipelineError::IncompleteResult)
        ));
    }

    #[test]
    fn evaluate_surfaces_analysis_errors() {
        let mut input = input(Some(parameters()));
        input.breakdown = LandUseBreakdown::new(100.0, 0.0, 0.0);
        let err = evaluate(&Calibration::default(), input).unwrap_err();
        let PipelineError::Analysis(err) = err else {
            panic!("expected an analysis error, got {err:?}");
        };
        assert_eq!(err.kind(), "division_by_zero");
    }

    #[actix_web::test]
    async fn complete_analysis_saves_when_requested() {
        let path = temp_db_path();
        let db = site_profit_database::open_db(&path).await.unwrap();

        let response = complete_analysis(
            db.as_ref(),
            &Calibration::default(),
            input(Some(parameters())),
            SaveOptions {
                save: true,
                title: Some("Corner lot".to_string()),
                notes: None,
            },
        )
        .await
        .unwrap();

        let saved = response.saved.unwrap();
        assert_eq!(saved.title.as_deref(), Some("Corner lot"));
        assert_eq!(saved.business_parameters.currency, "IDR");
        let fetched = site_profit_database::get_result(db.as_ref(), &saved.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, saved.id);

        drop(db);
        let _ = std::fs::remove_file(path);
    }
}
