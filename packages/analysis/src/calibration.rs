//! Calibration constants for the area-to-revenue chain.
//!
//! The defaults below are the values the model was tuned with. Their
//! derivation is business-domain calibration, so they are kept as named
//! constants rather than recomputed. Deployments can override any subset of
//! them with a TOML file whose path is given by `CALIBRATION_PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use site_profit_analysis_models::LandUseBreakdown;
use thiserror::Error;

/// People per square kilometer across the analyzed area.
pub const POPULATION_DENSITY_PER_SQ_KM: f64 = 16_000.0;

/// Average road width in front of a storefront, in meters.
pub const AVG_ROAD_WIDTH_METERS: f64 = 30.0;

/// Percent of daily road traffic that becomes a store visitor.
pub const VISITOR_RATE_PERCENT: f64 = 0.1;

/// Percent of visitors who make a purchase.
pub const PURCHASE_RATE_PERCENT: f64 = 90.0;

/// Daily-to-monthly revenue multiplier.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Daily-to-yearly revenue multiplier.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Empirical correction applied to the map library's meters-per-pixel scale.
pub const SCALE_CORRECTION_FACTOR: f64 = 1.305;

/// Breakdowns whose total is further than this from 100 are rescaled.
pub const NORMALIZATION_TOLERANCE: f64 = 10.0;

/// Breakdown substituted when a classifier response cannot be parsed.
pub const DEFAULT_BREAKDOWN: LandUseBreakdown = LandUseBreakdown::new(45.0, 25.0, 30.0);

/// Environment variable naming an override TOML file.
pub const CALIBRATION_PATH_ENV: &str = "CALIBRATION_PATH";

/// The shipped calibration file. Kept in sync with the constants above.
pub const DEFAULT_CALIBRATION_TOML: &str = include_str!("../calibration.toml");

/// Errors from loading or validating a calibration.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The override file could not be read.
    #[error("Failed to read calibration file {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The override file is not valid TOML for this schema.
    #[error("Invalid calibration TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is outside its physically meaningful range.
    #[error("Invalid calibration value for {field}: {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// The full set of tunable constants used by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// People per km².
    pub population_density_per_sq_km: f64,
    /// Road width in meters.
    pub avg_road_width_meters: f64,
    /// Visitor conversion, in percent of road traffic.
    pub visitor_rate_percent: f64,
    /// Purchase conversion, in percent of visitors.
    pub purchase_rate_percent: f64,
    /// Monthly revenue multiplier.
    pub days_per_month: f64,
    /// Yearly revenue multiplier.
    pub days_per_year: f64,
    /// Multiplier applied to the nominal map scale.
    pub scale_correction_factor: f64,
    /// Maximum distance of a parsed total from 100 before rescaling.
    pub normalization_tolerance: f64,
    /// Breakdown used when classification output is unusable.
    pub default_breakdown: LandUseBreakdown,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            population_density_per_sq_km: POPULATION_DENSITY_PER_SQ_KM,
            avg_road_width_meters: AVG_ROAD_WIDTH_METERS,
            visitor_rate_percent: VISITOR_RATE_PERCENT,
            purchase_rate_percent: PURCHASE_RATE_PERCENT,
            days_per_month: DAYS_PER_MONTH,
            days_per_year: DAYS_PER_YEAR,
            scale_correction_factor: SCALE_CORRECTION_FACTOR,
            normalization_tolerance: NORMALIZATION_TOLERANCE,
            default_breakdown: DEFAULT_BREAKDOWN,
        }
    }
}

impl Calibration {
    /// Parses a calibration from TOML. Keys that are absent keep their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] if the TOML is malformed or a value is
    /// out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, CalibrationError> {
        let calibration: Self = toml::de::from_str(s)?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Reads and parses a calibration file.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, CalibrationError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads the calibration named by `CALIBRATION_PATH`, or the defaults
    /// when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError`] if the referenced file is unreadable or
    /// invalid.
    pub fn from_env() -> Result<Self, CalibrationError> {
        match std::env::var(CALIBRATION_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading calibration overrides from {path}");
                Self::from_path(Path::new(path.trim()))
            }
            _ => Ok(Self::default()),
        }
    }

    /// Checks that every constant is physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let positive = [
            (
                "population_density_per_sq_km",
                self.population_density_per_sq_km,
            ),
            ("avg_road_width_meters", self.avg_road_width_meters),
            ("visitor_rate_percent", self.visitor_rate_percent),
            ("purchase_rate_percent", self.purchase_rate_percent),
            ("days_per_month", self.days_per_month),
            ("days_per_year", self.days_per_year),
            ("scale_correction_factor", self.scale_correction_factor),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalibrationError::Invalid {
                    field,
                    message: format!("must be a positive number, got {value}"),
                });
            }
        }

        for (field, value) in [
            ("visitor_rate_percent", self.visitor_rate_percent),
            ("purchase_rate_percent", self.purchase_rate_percent),
        ] {
            if value > 100.0 {
                return Err(CalibrationError::Invalid {
                    field,
                    message: format!("is a percentage and cannot exceed 100, got {value}"),
                });
            }
        }

        if !self.normalization_tolerance.is_finite() || self.normalization_tolerance < 0.0 {
            return Err(CalibrationError::Invalid {
                field: "normalization_tolerance",
                message: format!(
                    "must be zero or positive, got {}",
                    self.normalization_tolerance
                ),
            });
        }

        let breakdown = &self.default_breakdown;
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !(in_range(breakdown.residential)
            && in_range(breakdown.road)
            && in_range(breakdown.open_space))
            || breakdown.road <= 0.0
        {
            return Err(CalibrationError::Invalid {
                field: "default_breakdown",
                message: "percentages must be within 0-100 with a non-zero road share"
                    .to_string(),
            });
        }

        Ok(())
    }
}
