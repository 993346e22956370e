#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persisted analysis result records and pagination types.
//!
//! These types represent the shape of data as stored in and retrieved from
//! the result store. Whole-number metrics use [`WholeNumber`] so population
//! and revenue figures beyond 2^53 survive storage and JSON exactly; the
//! analysis crate's `f64` values are converted at this boundary only.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use site_profit_analysis_models::{
    BusinessMetrics, BusinessParameters, LandUseBreakdown, LocationData,
};
use thiserror::Error;

/// Default page size for result listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Errors converting into storage types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A floating-point metric is NaN, infinite, or outside the `i64` range.
    #[error("{field} cannot be stored as a whole number: {value}")]
    NotWholeNumber {
        /// Metric name.
        field: &'static str,
        /// The rejected value, formatted.
        value: String,
    },

    /// A pagination request is out of bounds.
    #[error("Invalid page request: {message}")]
    InvalidPage {
        /// Description.
        message: String,
    },
}

/// A 64-bit signed integer used for population, traffic, and revenue
/// figures at the storage boundary.
///
/// Serializes as an exact JSON integer. Deserializes from a JSON integer, an
/// integral float, or a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WholeNumber(i64);

/// Smallest `f64` strictly greater than `i64::MAX`; `i64::MIN` is exactly
/// representable.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl WholeNumber {
    /// Wraps an integer.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The wrapped integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Lossy conversion for display and arithmetic in `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// Rounds `value` to the nearest integer and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotWholeNumber`] if `value` is not finite or
    /// does not fit in an `i64`.
    pub fn from_f64(field: &'static str, value: f64) -> Result<Self, RecordError> {
        let rounded = value.round();
        if !rounded.is_finite() || rounded < -I64_UPPER_BOUND || rounded >= I64_UPPER_BOUND {
            return Err(RecordError::NotWholeNumber {
                field,
                value: value.to_string(),
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(rounded as i64))
    }
}

impl From<i64> for WholeNumber {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<WholeNumber> for i64 {
    fn from(value: WholeNumber) -> Self {
        value.0
    }
}

impl TryFrom<f64> for WholeNumber {
    type Error = RecordError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64("value", value)
    }
}

impl fmt::Display for WholeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WholeNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl Serialize for WholeNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for WholeNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WholeNumberVisitor)
    }
}

struct WholeNumberVisitor;

impl Visitor<'_> for WholeNumberVisitor {
    type Value = WholeNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 64-bit integer or a decimal integer string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(WholeNumber(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(WholeNumber)
            .map_err(|_| E::custom(format!("{v} is out of range for a 64-bit integer")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.fract() != 0.0 {
            return Err(E::custom(format!("{v} is not a whole number")));
        }
        WholeNumber::from_f64("value", v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map_err(|e| E::custom(format!("invalid integer string {v:?}: {e}")))
    }
}

/// Business metrics as persisted: whole-number fields are exact integers,
/// `pdr` and `apc` stay fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMetrics {
    /// Current gross local population.
    pub cglp: WholeNumber,
    /// Population on the residential share.
    pub pops: WholeNumber,
    /// Road area in square meters.
    pub road_area_sqm: WholeNumber,
    /// People per square meter of road.
    pub pdr: f64,
    /// People passing per meter of frontage.
    pub apc: f64,
    /// Daily passing traffic.
    pub apt: WholeNumber,
    /// Daily visitors.
    pub vcdt: WholeNumber,
    /// Daily purchasers.
    pub tppd: WholeNumber,
    /// Revenue per day.
    pub daily_revenue: WholeNumber,
    /// Revenue per month.
    pub monthly_revenue: WholeNumber,
    /// Revenue per year.
    pub yearly_revenue: WholeNumber,
}

impl TryFrom<&BusinessMetrics> for StoredMetrics {
    type Error = RecordError;

    fn try_from(m: &BusinessMetrics) -> Result<Self, Self::Error> {
        Ok(Self {
            cglp: WholeNumber::from_f64("cglp", m.cglp)?,
            pops: WholeNumber::from_f64("pops", m.pops)?,
            road_area_sqm: WholeNumber::from_f64("roadAreaSqm", m.road_area_sqm)?,
            pdr: m.pdr,
            apc: m.apc,
            apt: WholeNumber::from_f64("apt", m.apt)?,
            vcdt: WholeNumber::from_f64("vcdt", m.vcdt)?,
            tppd: WholeNumber::from_f64("tppd", m.tppd)?,
            daily_revenue: WholeNumber::from_f64("dailyRevenue", m.daily_revenue)?,
            monthly_revenue: WholeNumber::from_f64("monthlyRevenue", m.monthly_revenue)?,
            yearly_revenue: WholeNumber::from_f64("yearlyRevenue", m.yearly_revenue)?,
        })
    }
}

impl From<&StoredMetrics> for BusinessMetrics {
    fn from(m: &StoredMetrics) -> Self {
        Self {
            cglp: m.cglp.as_f64(),
            pops: m.pops.as_f64(),
            road_area_sqm: m.road_area_sqm.as_f64(),
            pdr: m.pdr,
            apc: m.apc,
            apt: m.apt.as_f64(),
            vcdt: m.vcdt.as_f64(),
            tppd: m.tppd.as_f64(),
            daily_revenue: m.daily_revenue.as_f64(),
            monthly_revenue: m.monthly_revenue.as_f64(),
            yearly_revenue: m.yearly_revenue.as_f64(),
        }
    }
}

/// A saved analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// UUID v4.
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Where the analysis was made.
    pub location_data: LocationData,
    /// Land-use breakdown the metrics were computed from.
    pub area_distribution: LandUseBreakdown,
    /// Computed metrics.
    pub business_metrics: StoredMetrics,
    /// Business inputs.
    pub business_parameters: BusinessParameters,
    /// User-supplied title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// User-supplied notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An analysis to save; the store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysisResult {
    /// Where the analysis was made.
    pub location_data: LocationData,
    /// Land-use breakdown the metrics were computed from.
    pub area_distribution: LandUseBreakdown,
    /// Computed metrics.
    pub business_metrics: StoredMetrics,
    /// Business inputs.
    pub business_parameters: BusinessParameters,
    /// User-supplied title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// User-supplied notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Editable fields of a saved analysis. `None` leaves a field unchanged;
/// an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResultUpdate {
    /// Returns `true` if the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.notes.is_none()
    }
}

/// A validated `(offset, limit)` pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    offset: u32,
    limit: u32,
}

impl PageRequest {
    /// Validates a pagination request. A missing limit defaults to
    /// [`DEFAULT_PAGE_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidPage`] if `limit` is zero or above
    /// [`MAX_PAGE_LIMIT`].
    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Result<Self, RecordError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 {
            return Err(RecordError::InvalidPage {
                message: "limit must be at least 1".to_string(),
            });
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(RecordError::InvalidPage {
                message: format!("limit must be at most {MAX_PAGE_LIMIT}, got {limit}"),
            });
        }
        Ok(Self {
            offset: offset.unwrap_or(0),
            limit,
        })
    }

    /// Number of records to skip.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Maximum number of records to return.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page.
    pub results: Vec<T>,
    /// Total number of records across all pages.
    pub total: u64,
    /// Whether more records follow this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Builds a page, deriving `has_more` from the request and total.
    #[must_use]
    pub fn new(results: Vec<T>, total: u64, request: PageRequest) -> Self {
        let has_more = u64::from(request.offset()) + (results.len() as u64) < total;
        Self {
            results,
            total,
            has_more,
        }
    }
}
