#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area-to-revenue calculation pipeline.
//!
//! Three pure stages:
//!
//! 1. [`parser`] turns free-form classifier text into a land-use breakdown.
//! 2. [`geometry`] turns screenshot pixel dimensions and map scale into a
//!    physical area.
//! 3. [`metrics`] runs the twelve-step chain from breakdown, area, and
//!    business parameters to population, traffic, and revenue.
//!
//! [`analyze`] runs stages 2 and 3 together. Nothing here performs I/O; the
//! classifier call lives in `site_profit_ai`.

pub mod calibration;
pub mod geometry;
pub mod metrics;
pub mod parser;

use site_profit_analysis_models::{
    BusinessMetrics, BusinessParameters, LandUseBreakdown, LocationData, MetricStep,
    ScreenshotGeometry, ScreenshotMetadata,
};
use thiserror::Error;

pub use calibration::{Calibration, CalibrationError};
pub use parser::ParseError;

/// Errors that can occur while analyzing a site.
///
/// No partial metrics are produced: an analysis yields either a complete
/// [`AnalysisOutcome`] or one of these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Classifier output did not contain usable percentages.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Screenshot or location metadata is missing or physically invalid.
    #[error("Invalid metadata: {message}")]
    InvalidMetadata {
        /// Description of what went wrong.
        message: String,
    },

    /// The road area is zero, so people per square meter of road is
    /// undefined.
    #[error("Division by zero at step {step}: {message}")]
    DivisionByZero {
        /// The step that would have divided by zero.
        step: MetricStep,
        /// Description.
        message: String,
    },

    /// A step received invalid input or produced a negative or non-finite
    /// value.
    #[error("Metrics computation failed at step {step}: {message}")]
    MetricsComputation {
        /// The failing step.
        step: MetricStep,
        /// Description.
        message: String,
    },
}

impl AnalysisError {
    /// The step that failed, for errors raised inside the metrics chain.
    #[must_use]
    pub const fn step(&self) -> Option<MetricStep> {
        match self {
            Self::DivisionByZero { step, .. } | Self::MetricsComputation { step, .. } => {
                Some(*step)
            }
            Self::Parse(_) | Self::InvalidMetadata { .. } => None,
        }
    }

    /// Stable machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::MetricsComputation { .. } => "metrics_computation",
        }
    }
}

/// Geometry and metrics produced by one analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOutcome {
    /// Physical extent of the screenshot.
    pub geometry: ScreenshotGeometry,
    /// Rounded business metrics.
    pub metrics: BusinessMetrics,
}

/// Resolves screenshot geometry and runs the metrics chain.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidMetadata`] for bad screenshot metadata,
/// otherwise any error from [`metrics::compute_metrics`].
pub fn analyze(
    breakdown: &LandUseBreakdown,
    metadata: &ScreenshotMetadata,
    parameters: &BusinessParameters,
    calibration: &Calibration,
) -> Result<AnalysisOutcome, AnalysisError> {
    validate_currency(&parameters.currency)?;

    let geometry = geometry::resolve_geometry(metadata, calibration.scale_correction_factor)?;
    let metrics = metrics::compute_metrics(breakdown, &geometry, parameters, calibration)?;

    log::info!(
        "Analyzed {:.4} km² ({}% residential, {}% road, {}% open): daily revenue {} {}",
        geometry.area_sq_km,
        breakdown.residential,
        breakdown.road,
        breakdown.open_space,
        metrics.daily_revenue,
        parameters.currency,
    );

    Ok(AnalysisOutcome { geometry, metrics })
}

/// Builds the location record for an analysis.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidMetadata`] if the coordinates are
/// outside WGS84 bounds.
pub fn locate(
    lat: f64,
    lng: f64,
    address: Option<String>,
    geometry: &ScreenshotGeometry,
    calibration: &Calibration,
) -> Result<LocationData, AnalysisError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AnalysisError::InvalidMetadata {
            message: format!("latitude must be within -90..90, got {lat}"),
        });
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AnalysisError::InvalidMetadata {
            message: format!("longitude must be within -180..180, got {lng}"),
        });
    }

    Ok(LocationData {
        lat,
        lng,
        population_density_per_sq_km: calibration.population_density_per_sq_km,
        address: address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        area_square_km: geometry.area_sq_km,
    })
}

/// Normalizes a currency code to upper case, rejecting anything that is not
/// three ASCII letters.
///
/// # Errors
///
/// Returns [`AnalysisError::MetricsComputation`] at the daily revenue step,
/// since revenue is expressed in this currency.
pub fn normalize_currency(code: &str) -> Result<String, AnalysisError> {
    let code = code.trim();
    validate_currency(code)?;
    Ok(code.to_ascii_uppercase())
}

/// Checks business parameters without running the chain: positive
/// building width and price, operating hours in `(0, 24]`, and a
/// three-letter currency.
///
/// # Errors
///
/// Returns [`AnalysisError::MetricsComputation`] naming the step that
/// consumes the offending parameter.
pub fn validate_parameters(parameters: &BusinessParameters) -> Result<(), AnalysisError> {
    let positive = [
        (MetricStep::Apc, "building width", parameters.building_width),
        (MetricStep::Apt, "operating hours", parameters.operating_hours),
        (MetricStep::DailyRevenue, "product price", parameters.product_price),
    ];
    for (step, name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(AnalysisError::MetricsComputation {
                step,
                message: format!("{name} must be a positive number, got {value}"),
            });
        }
    }
    if parameters.operating_hours > 24.0 {
        return Err(AnalysisError::MetricsComputation {
            step: MetricStep::Apt,
            message: format!(
                "operating hours cannot exceed 24 per day, got {}",
                parameters.operating_hours
            ),
        });
    }
    validate_currency(&parameters.currency)
}

fn validate_currency(code: &str) -> Result<(), AnalysisError> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(AnalysisError::MetricsComputation {
            step: MetricStep::DailyRevenue,
            message: format!("currency must be a three-letter code, got {code:?}"),
        })
    }
}
