#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the site profitability server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the stored record types to allow independent evolution of the API
//! contract; saved analyses are returned as-is.

use serde::{Deserialize, Serialize};
use site_profit_analysis_models::{
    BreakdownSource, BusinessParameters, LandUseBreakdown, LocationData, ScreenshotGeometry,
    ScreenshotMetadata,
};
use site_profit_database_models::{AnalysisResult, StoredMetrics};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Whether a vision provider is configured for `/api/analyze`.
    pub classifier_configured: bool,
}

/// Coordinates and optional address of the analyzed site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Human-readable address.
    #[serde(default)]
    pub address: Option<String>,
}

/// Options shared by the calculate and analyze endpoints for persisting
/// the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Persist the analysis. Requires a location.
    #[serde(default)]
    pub save: bool,
    /// Title for the saved analysis.
    #[serde(default)]
    pub title: Option<String>,
    /// Notes for the saved analysis.
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/calculate` body: run the pipeline on a known breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    /// Land-use percentages.
    pub area_distribution: LandUseBreakdown,
    /// Screenshot pixel dimensions and scale.
    pub screenshot: ScreenshotMetadata,
    /// Business inputs.
    pub business_parameters: BusinessParameters,
    /// Site location; required when saving.
    #[serde(default)]
    pub location: Option<LocationInput>,
    /// Persistence options.
    #[serde(flatten)]
    pub save: SaveOptions,
}

/// `POST /api/analyze` body: classify a screenshot, then optionally run the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64 image or `data:image/...;base64,` URL.
    pub image: String,
    /// Screenshot pixel dimensions and scale.
    pub screenshot: ScreenshotMetadata,
    /// Business inputs. Without them only the classification is returned.
    #[serde(default)]
    pub business_parameters: Option<BusinessParameters>,
    /// Site location; required when saving.
    #[serde(default)]
    pub location: Option<LocationInput>,
    /// Persistence options.
    #[serde(flatten)]
    pub save: SaveOptions,
}

/// Classifier details returned by `/api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInfo {
    /// Provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// The provider's unmodified answer.
    pub raw_response: String,
    /// Why the answer could not be parsed, when a default was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Response from `/api/calculate` and `/api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// The breakdown the metrics were computed from.
    pub area_distribution: LandUseBreakdown,
    /// Where the breakdown came from.
    pub breakdown_source: BreakdownSource,
    /// Physical extent of the screenshot.
    pub geometry: ScreenshotGeometry,
    /// Business metrics, absent when `/api/analyze` was called without
    /// business parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_metrics: Option<StoredMetrics>,
    /// Business inputs with the currency normalized, when metrics were
    /// computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_parameters: Option<BusinessParameters>,
    /// Location record, when a location was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_data: Option<LocationData>,
    /// Classifier details, for `/api/analyze`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationInfo>,
    /// The saved record, when saving was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<AnalysisResult>,
}

/// Query parameters for `GET /api/results`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResultsParams {
    /// Number of records to skip.
    pub offset: Option<u32>,
    /// Maximum number of records to return.
    pub limit: Option<u32>,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable kind.
    pub kind: String,
    /// Failing metrics step, for metrics errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ApiError {
    /// Creates an error body without a step.
    #[must_use]
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
            step: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculate_request_accepts_flattened_save_options() {
        let request: CalculateRequest = serde_json::from_value(serde_json::json!({
            "areaDistribution": {"residential": 45, "road": 25, "openSpace": 30},
            "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536},
            "businessParameters": {
                "buildingWidth": 3.8,
                "operatingHours": 12,
                "productPrice": 50000,
                "currency": "IDR"
            },
            "location": {"lat": -6.2, "lng": 106.8},
            "save": true,
            "title": "Corner lot"
        }))
        .unwrap();

        assert!(request.save.save);
        assert_eq!(request.save.title.as_deref(), Some("Corner lot"));
        assert_eq!(request.location.unwrap().address, None);
        assert!((request.area_distribution.open_space - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn analyze_request_needs_only_image_and_screenshot() {
        let request: AnalyzeRequest = serde_json::from_value(serde_json::json!({
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "screenshot": {"pixelWidth": 800, "pixelHeight": 600, "scaleMetersPerPixel": 0.0536}
        }))
        .unwrap();

        assert!(request.business_parameters.is_none());
        assert_eq!(request.save, SaveOptions::default());
    }

    #[test]
    fn api_error_omits_missing_step() {
        let json = serde_json::to_value(ApiError::new("invalid_metadata", "scale missing")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "scale missing", "kind": "invalid_metadata"})
        );
    }
}
