#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Value types for the area-to-revenue calculation pipeline.
//!
//! These types describe the inputs (land-use breakdown, screenshot metadata,
//! business parameters) and outputs (geometry, business metrics, location
//! data) of a single site analysis. They carry no behaviour beyond small
//! accessors; the parser, geometry resolver, and metrics engine live in
//! `site_profit_analysis`.
//!
//! All types serialize as `camelCase` JSON so they can be embedded directly
//! in API responses and persisted records.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Percentages of an analyzed area covered by each land-use class.
///
/// Each value is in `[0, 100]` and the three together sum to roughly 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandUseBreakdown {
    /// Residential land share (percent).
    pub residential: f64,
    /// Road surface share (percent).
    pub road: f64,
    /// Open space / green share (percent).
    #[serde(alias = "open_space")]
    pub open_space: f64,
}

impl LandUseBreakdown {
    /// Creates a breakdown from the three percentages.
    #[must_use]
    pub const fn new(residential: f64, road: f64, open_space: f64) -> Self {
        Self {
            residential,
            road,
            open_space,
        }
    }

    /// Sum of the three percentages.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.residential + self.road + self.open_space
    }

    /// Returns the percentage for a single land-use class.
    #[must_use]
    pub const fn get(&self, class: LandUseClass) -> f64 {
        match class {
            LandUseClass::Residential => self.residential,
            LandUseClass::Road => self.road,
            LandUseClass::OpenSpace => self.open_space,
        }
    }
}

/// One of the three land-use classes reported by the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum LandUseClass {
    /// Houses, apartments, residential blocks.
    Residential,
    /// Streets and other paved road surface.
    Road,
    /// Parks, fields, water, and other unbuilt land.
    OpenSpace,
}

impl LandUseClass {
    /// All classes in the canonical residential, road, open-space order.
    pub const ALL: [Self; 3] = [Self::Residential, Self::Road, Self::OpenSpace];
}

/// Where the land-use breakdown used for an analysis came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BreakdownSource {
    /// Parsed from the image classifier's response.
    Classifier,
    /// Supplied directly by the caller.
    Supplied,
    /// The classifier response was unusable and the configured default
    /// breakdown was substituted.
    Default,
}

/// Pixel-space metadata of a captured map screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotMetadata {
    /// Image width in pixels.
    pub pixel_width: u32,
    /// Image height in pixels.
    pub pixel_height: u32,
    /// Nominal map scale reported by the map library (meters per pixel).
    pub scale_meters_per_pixel: Option<f64>,
}

/// Real-world extent of a screenshot, derived from [`ScreenshotMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotGeometry {
    /// Image width in pixels.
    pub pixel_width: u32,
    /// Image height in pixels.
    pub pixel_height: u32,
    /// Corrected scale (nominal scale times the correction factor).
    pub meters_per_pixel: f64,
    /// Width of the captured area in meters.
    pub width_meters: f64,
    /// Height of the captured area in meters.
    pub height_meters: f64,
    /// Captured area in square meters.
    pub area_sq_m: f64,
    /// Captured area in square kilometers.
    pub area_sq_km: f64,
}

/// User-supplied parameters describing the prospective business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessParameters {
    /// Storefront width facing the road, in meters.
    pub building_width: f64,
    /// Opening hours per day.
    pub operating_hours: f64,
    /// Average price of one purchase, in `currency` units.
    pub product_price: f64,
    /// ISO 4217 currency code (e.g. `"IDR"`).
    pub currency: String,
}

/// Output of the metrics engine.
///
/// Population, traffic, and revenue figures are rounded to whole numbers;
/// `pdr` keeps six decimals and `apc` three.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetrics {
    /// Current gross local population of the whole area.
    pub cglp: f64,
    /// Population attributable to residential land.
    pub pops: f64,
    /// Road surface in square meters.
    pub road_area_sqm: f64,
    /// People per square meter of road.
    pub pdr: f64,
    /// Population capitalization rate past the storefront.
    pub apc: f64,
    /// Daily foot traffic past the storefront.
    pub apt: f64,
    /// Estimated daily visitors.
    pub vcdt: f64,
    /// Estimated daily purchasing customers.
    pub tppd: f64,
    /// Daily revenue.
    pub daily_revenue: f64,
    /// Monthly revenue.
    pub monthly_revenue: f64,
    /// Yearly revenue.
    pub yearly_revenue: f64,
}

/// Location of an analysis on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    /// Latitude of the selected point.
    pub lat: f64,
    /// Longitude of the selected point.
    pub lng: f64,
    /// Population density used for the analysis (people per km²).
    pub population_density_per_sq_km: f64,
    /// Reverse-geocoded address, when the client supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Area covered by the screenshot in square kilometers.
    pub area_square_km: f64,
}

/// The twelve steps of the area-to-revenue chain.
///
/// Used to name the step at which a computation failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricStep {
    /// Screenshot area from pixel dimensions and scale.
    Area,
    /// Gross local population.
    Cglp,
    /// Residential population.
    Pops,
    /// Road surface area.
    RoadArea,
    /// Population density on road.
    Pdr,
    /// Population capitalization.
    Apc,
    /// Daily traffic.
    Apt,
    /// Daily visitors.
    Vcdt,
    /// Daily purchasers.
    Tppd,
    /// Daily revenue.
    DailyRevenue,
    /// Monthly revenue.
    MonthlyRevenue,
    /// Yearly revenue.
    YearlyRevenue,
}

impl MetricStep {
    /// Position of the step in the chain (1-based).
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }
}
