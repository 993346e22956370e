//! The area-to-revenue metrics chain.
//!
//! Every step runs in full `f64` precision; only the reported
//! [`BusinessMetrics`] are rounded. Rounding an intermediate (e.g. `apc` to
//! three decimals before computing `apt`) changes the end result, so the
//! chain is kept in [`MetricsChain`] and rounded once at the end.

use site_profit_analysis_models::{
    BusinessMetrics, BusinessParameters, LandUseBreakdown, MetricStep, ScreenshotGeometry,
};

use crate::AnalysisError;
use crate::calibration::Calibration;

/// Seconds per hour, converting operating hours into the traffic window.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Unrounded values of every step in the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsChain {
    /// Step 2.
    pub cglp: f64,
    /// Step 3.
    pub pops: f64,
    /// Step 4.
    pub road_area_sqm: f64,
    /// Step 5.
    pub pdr: f64,
    /// Step 6.
    pub apc: f64,
    /// Step 7.
    pub apt: f64,
    /// Step 8.
    pub vcdt: f64,
    /// Step 9.
    pub tppd: f64,
    /// Step 10.
    pub daily_revenue: f64,
    /// Step 11.
    pub monthly_revenue: f64,
    /// Step 12.
    pub yearly_revenue: f64,
}

impl MetricsChain {
    /// Rounds the chain into reported metrics.
    #[must_use]
    pub fn rounded(&self) -> BusinessMetrics {
        BusinessMetrics {
            cglp: self.cglp.round(),
            pops: self.pops.round(),
            road_area_sqm: self.road_area_sqm.round(),
            pdr: round_to(self.pdr, 6),
            apc: round_to(self.apc, 3),
            apt: self.apt.round(),
            vcdt: self.vcdt.round(),
            tppd: self.tppd.round(),
            daily_revenue: self.daily_revenue.round(),
            monthly_revenue: self.monthly_revenue.round(),
            yearly_revenue: self.yearly_revenue.round(),
        }
    }
}

/// Runs the metrics chain and returns rounded metrics.
///
/// # Errors
///
/// See [`compute_chain`].
pub fn compute_metrics(
    breakdown: &LandUseBreakdown,
    geometry: &ScreenshotGeometry,
    parameters: &BusinessParameters,
    calibration: &Calibration,
) -> Result<BusinessMetrics, AnalysisError> {
    compute_chain(breakdown, geometry, parameters, calibration).map(|chain| chain.rounded())
}

/// Runs the metrics chain without rounding.
///
/// # Errors
///
/// Returns [`AnalysisError::DivisionByZero`] if the road area is zero, and
/// [`AnalysisError::MetricsComputation`] naming the step whose input is
/// invalid or whose output is negative or non-finite.
pub fn compute_chain(
    breakdown: &LandUseBreakdown,
    geometry: &ScreenshotGeometry,
    parameters: &BusinessParameters,
    calibration: &Calibration,
) -> Result<MetricsChain, AnalysisError> {
    let area_sq_m = require_positive(MetricStep::Area, "area (m²)", geometry.area_sq_m)?;
    let area_sq_km = require_positive(MetricStep::Area, "area (km²)", geometry.area_sq_km)?;

    let density = require_positive(
        MetricStep::Cglp,
        "population density",
        calibration.population_density_per_sq_km,
    )?;
    let cglp = checked(MetricStep::Cglp, density * area_sq_km)?;

    let residential = require_percent(MetricStep::Pops, "residential", breakdown.residential)?;
    let pops = checked(MetricStep::Pops, cglp * (residential / 100.0))?;

    let road = require_percent(MetricStep::RoadArea, "road", breakdown.road)?;
    let road_area_sqm = checked(MetricStep::RoadArea, area_sq_m * (road / 100.0))?;

    if road_area_sqm <= 0.0 {
        return Err(AnalysisError::DivisionByZero {
            step: MetricStep::Pdr,
            message: format!(
                "road area is {road_area_sqm} m² (road share {road}%), cannot compute people per \
                 square meter of road"
            ),
        });
    }
    let pdr = checked(MetricStep::Pdr, pops / road_area_sqm)?;

    let building_width =
        require_positive(MetricStep::Apc, "building width", parameters.building_width)?;
    let road_width = require_positive(
        MetricStep::Apc,
        "average road width",
        calibration.avg_road_width_meters,
    )?;
    let apc = checked(MetricStep::Apc, building_width * road_width * pdr)?;

    let operating_hours =
        require_positive(MetricStep::Apt, "operating hours", parameters.operating_hours)?;
    if operating_hours > 24.0 {
        return Err(AnalysisError::MetricsComputation {
            step: MetricStep::Apt,
            message: format!("operating hours cannot exceed 24 per day, got {operating_hours}"),
        });
    }
    let apt = checked(MetricStep::Apt, apc * (operating_hours * SECONDS_PER_HOUR))?;

    let visitor_rate = require_positive(
        MetricStep::Vcdt,
        "visitor rate",
        calibration.visitor_rate_percent,
    )?;
    let vcdt = checked(MetricStep::Vcdt, apt * (visitor_rate / 100.0))?;

    let purchase_rate = require_positive(
        MetricStep::Tppd,
        "purchase rate",
        calibration.purchase_rate_percent,
    )?;
    let tppd = checked(MetricStep::Tppd, vcdt * (purchase_rate / 100.0))?;

    let price = require_positive(
        MetricStep::DailyRevenue,
        "product price",
        parameters.product_price,
    )?;
    let daily_revenue = checked(MetricStep::DailyRevenue, tppd * price)?;

    let monthly_revenue = checked(
        MetricStep::MonthlyRevenue,
        daily_revenue * calibration.days_per_month,
    )?;
    let yearly_revenue = checked(
        MetricStep::YearlyRevenue,
        daily_revenue * calibration.days_per_year,
    )?;

    let chain = MetricsChain {
        cglp,
        pops,
        road_area_sqm,
        pdr,
        apc,
        apt,
        vcdt,
        tppd,
        daily_revenue,
        monthly_revenue,
        yearly_revenue,
    };

    log::debug!(
        "Metrics chain: cglp={cglp} pops={pops} road_area={road_area_sqm} pdr={pdr} apc={apc} \
         apt={apt} vcdt={vcdt} tppd={tppd} daily={daily_revenue} {}",
        parameters.currency
    );

    Ok(chain)
}

/// Rounds to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fails the step if its output is not a finite, non-negative number.
fn checked(step: MetricStep, value: f64) -> Result<f64, AnalysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AnalysisError::MetricsComputation {
            step,
            message: format!("step {} ({step}) produced {value}", step.number()),
        })
    }
}

fn require_positive(step: MetricStep, name: &str, value: f64) -> Result<f64, AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AnalysisError::MetricsComputation {
            step,
            message: format!("{name} must be a positive number, got {value}"),
        })
    }
}

fn require_percent(step: MetricStep, name: &str, value: f64) -> Result<f64, AnalysisError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(AnalysisError::MetricsComputation {
            step,
            message: format!("{name} percentage must be within 0-100, got {value}"),
        })
    }
}
