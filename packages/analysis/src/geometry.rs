//! Screenshot geometry: pixel dimensions and map scale to physical area.

use site_profit_analysis_models::{ScreenshotGeometry, ScreenshotMetadata};

use crate::AnalysisError;

/// Square meters per square kilometer.
const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;

/// Converts screenshot metadata into real-world extent.
///
/// The nominal scale is multiplied by `correction_factor` (1.305 by
/// default, see [`crate::calibration::SCALE_CORRECTION_FACTOR`]) before use.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidMetadata`] if the scale is missing,
/// non-positive, or non-finite, if either pixel dimension is zero, or if
/// the correction factor itself is not a positive number.
pub fn resolve_geometry(
    metadata: &ScreenshotMetadata,
    correction_factor: f64,
) -> Result<ScreenshotGeometry, AnalysisError> {
    let scale = metadata
        .scale_meters_per_pixel
        .ok_or_else(|| AnalysisError::InvalidMetadata {
            message: "scale (meters per pixel) is missing".to_string(),
        })?;

    if !scale.is_finite() || scale <= 0.0 {
        return Err(AnalysisError::InvalidMetadata {
            message: format!("scale must be a positive number, got {scale}"),
        });
    }

    if metadata.pixel_width == 0 || metadata.pixel_height == 0 {
        return Err(AnalysisError::InvalidMetadata {
            message: format!(
                "pixel dimensions must be positive, got {}x{}",
                metadata.pixel_width, metadata.pixel_height
            ),
        });
    }

    if !correction_factor.is_finite() || correction_factor <= 0.0 {
        return Err(AnalysisError::InvalidMetadata {
            message: format!("scale correction factor must be positive, got {correction_factor}"),
        });
    }

    let meters_per_pixel = scale * correction_factor;
    let width_meters = f64::from(metadata.pixel_width) * meters_per_pixel;
    let height_meters = f64::from(metadata.pixel_height) * meters_per_pixel;
    let area_sq_m = width_meters * height_meters;
    let area_sq_km = area_sq_m / SQ_M_PER_SQ_KM;

    log::debug!(
        "Screenshot {}x{} px at {meters_per_pixel} m/px covers {width_meters:.1}m x \
         {height_meters:.1}m = {area_sq_m:.1} m² ({area_sq_km:.6} km²)",
        metadata.pixel_width,
        metadata.pixel_height,
    );

    Ok(ScreenshotGeometry {
        pixel_width: metadata.pixel_width,
        pixel_height: metadata.pixel_height,
        meters_per_pixel,
        width_meters,
        height_meters,
        area_sq_m,
        area_sq_km,
    })
}
