//! Plain-text rendering of analyses for the terminal.

use std::fmt::Write as _;

use site_profit_database_models::{AnalysisResult, StoredMetrics};
use site_profit_server_models::AnalysisResponse;

/// Formats an integer with `,` thousands separators.
#[must_use]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders the twelve-step chart for a set of metrics.
#[must_use]
pub fn format_metrics(metrics: &StoredMetrics, area_sq_km: f64, currency: &str) -> String {
    let rows: [(&str, String); 12] = [
        ("Area", format!("{area_sq_km:.6} km²")),
        ("CGLP", group_thousands(metrics.cglp.get())),
        ("POPS", group_thousands(metrics.pops.get())),
        ("Road area", format!("{} m²", group_thousands(metrics.road_area_sqm.get()))),
        ("PDR", format!("{:.6}", metrics.pdr)),
        ("APC", format!("{:.3}", metrics.apc)),
        ("APT", group_thousands(metrics.apt.get())),
        ("VCDT", group_thousands(metrics.vcdt.get())),
        ("TPPD", group_thousands(metrics.tppd.get())),
        (
            "Daily revenue",
            format!("{currency} {}", group_thousands(metrics.daily_revenue.get())),
        ),
        (
            "Monthly revenue",
            format!("{currency} {}", group_thousands(metrics.monthly_revenue.get())),
        ),
        (
            "Yearly revenue",
            format!("{currency} {}", group_thousands(metrics.yearly_revenue.get())),
        ),
    ];

    let mut out = String::new();
    for (i, (label, value)) in rows.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {label:<16} {value:>24}", i + 1);
    }
    out
}

/// Renders a calculate/classify response.
#[must_use]
pub fn format_response(response: &AnalysisResponse) -> String {
    let mut out = String::new();
    let breakdown = &response.area_distribution;

    if let Some(info) = &response.classification {
        let _ = writeln!(out, "Classifier: {} ({})", info.provider, info.model);
        if let Some(error) = &info.parse_error {
            let _ = writeln!(out, "Unusable answer, default breakdown used: {error}");
        }
    }

    let _ = writeln!(
        out,
        "Land use ({}): {:.1}% residential, {:.1}% road, {:.1}% open space",
        response.breakdown_source, breakdown.residential, breakdown.road, breakdown.open_space
    );
    let _ = writeln!(
        out,
        "Screenshot: {}x{} px at {:.4} m/px = {:.1} x {:.1} m",
        response.geometry.pixel_width,
        response.geometry.pixel_height,
        response.geometry.meters_per_pixel,
        response.geometry.width_meters,
        response.geometry.height_meters,
    );

    if let Some(location) = &response.location_data {
        let _ = writeln!(
            out,
            "Location: {:.5}, {:.5}{}",
            location.lat,
            location.lng,
            location
                .address
                .as_deref()
                .map(|a| format!(" ({a})"))
                .unwrap_or_default()
        );
    }

    if let Some(metrics) = &response.business_metrics {
        let currency = response
            .business_parameters
            .as_ref()
            .map_or("", |p| p.currency.as_str());
        let _ = writeln!(out);
        out.push_str(&format_metrics(
            metrics,
            response.geometry.area_sq_km,
            currency,
        ));
    }

    if let Some(saved) = &response.saved {
        let _ = writeln!(out);
        let _ = writeln!(out, "Saved as {}", saved.id);
    }

    out
}

/// Renders a saved analysis in full.
#[must_use]
pub fn format_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let location = &result.location_data;
    let breakdown = &result.area_distribution;
    let parameters = &result.business_parameters;

    let _ = writeln!(out, "ID:        {}", result.id);
    let _ = writeln!(out, "Saved:     {}", format_timestamp(result.timestamp));
    if let Some(title) = &result.title {
        let _ = writeln!(out, "Title:     {title}");
    }
    let _ = writeln!(
        out,
        "Location:  {:.5}, {:.5}{}",
        location.lat,
        location.lng,
        location
            .address
            .as_deref()
            .map(|a| format!(" ({a})"))
            .unwrap_or_default()
    );
    let _ = writeln!(
        out,
        "Land use:  {:.1}% residential, {:.1}% road, {:.1}% open space",
        breakdown.residential, breakdown.road, breakdown.open_space
    );
    let _ = writeln!(
        out,
        "Business:  {} m frontage, {} h/day, {} {} per purchase",
        parameters.building_width,
        parameters.operating_hours,
        parameters.currency,
        parameters.product_price
    );
    let _ = writeln!(out);
    out.push_str(&format_metrics(
        &result.business_metrics,
        location.area_square_km,
        &parameters.currency,
    ));
    if let Some(notes) = &result.notes {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes: {notes}");
    }
    out
}

/// Formats epoch milliseconds as a UTC date and time.
#[must_use]
pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use site_profit_database_models::WholeNumber;

    use super::*;

    fn metrics() -> StoredMetrics {
        StoredMetrics {
            cglp: WholeNumber::new(38),
            pops: WholeNumber::new(17),
            road_area_sqm: WholeNumber::new(587),
            pdr: 0.0288,
            apc: 3.283,
            apt: WholeNumber::new(141_834),
            vcdt: WholeNumber::new(142),
            tppd: WholeNumber::new(128),
            daily_revenue: WholeNumber::new(6_382_541),
            monthly_revenue: WholeNumber::new(191_476_224),
            yearly_revenue: WholeNumber::new(2_329_627_392),
        }
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(2_329_627_392), "2,329,627,392");
        assert_eq!(group_thousands(-141_834), "-141,834");
    }

    #[test]
    fn chart_has_twelve_numbered_steps() {
        let chart = format_metrics(&metrics(), 0.002_348_5, "IDR");
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 12);
        assert!(lines[0].starts_with(" 1. Area"));
        assert!(lines[6].contains("141,834"));
        assert!(lines[11].starts_with("12. Yearly revenue"));
        assert!(lines[11].ends_with("IDR 2,329,627,392"));
    }

    #[test]
    fn formats_timestamps_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13");
    }
}
