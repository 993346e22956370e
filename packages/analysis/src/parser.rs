//! Land-use percentage extraction from free-form classifier output.
//!
//! Vision models answer in many shapes:
//! - Labeled lines: `"Residential: 45%\nRoad: 25%\nOpen space: 30%"`
//! - JSON-ish: `{"residential": 45, "road": 25, "open_space": 30}`
//! - Markdown: `"**Roads**: ~25%"`
//! - Prose: `"Analysis: 40% residential, 35% road, 25% open"`
//!
//! Labeled values are tried first. When no label matches, the first three
//! bare percentages are taken in residential, road, open-space order.

use std::sync::LazyLock;

use regex::Regex;
use site_profit_analysis_models::{LandUseBreakdown, LandUseClass};
use thiserror::Error;

/// Regex for `<label>: <number>%` with loose label spellings and optional
/// quoting/markdown around the label. Words may sit between the separator
/// and the number, but not another separator, line break, or list comma.
static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)["'*]*\b({LABEL})\b["'*]*\s*[:=][^%\n,;:=]*?([+-]?\d+(?:\.\d+)?)\s*%"#
    ))
    .expect("valid regex")
});

/// Regex for JSON-style `"<label>": <number>`, where `%` is optional.
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)["']({LABEL})["']\s*:\s*([+-]?\d+(?:\.\d+)?)"#
    ))
    .expect("valid regex")
});

/// Label spellings shared by the labeled patterns.
const LABEL: &str = r"residential|roads?|open[\s_-]?spaces?|green(?:[\s_-]?spaces?)?";

/// Regex for any bare `<number>%`.
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"));

/// Errors from turning classifier text into a [`LandUseBreakdown`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Neither labeled values nor bare percentages were present.
    #[error("No land-use percentages found in classifier output")]
    NoPercentages,

    /// The fallback scan found some, but fewer than three, percentages.
    #[error("Expected three percentages in classifier output, found {found}")]
    TooFewPercentages {
        /// Number of percentages found.
        found: usize,
    },

    /// All three values are zero, so nothing can be normalized.
    #[error("Land-use percentages sum to zero")]
    ZeroTotal,

    /// A value is not a finite number.
    #[error("Land-use percentage for {class} is not a number")]
    NotANumber {
        /// The class with the bad value.
        class: LandUseClass,
    },

    /// A value is outside `[0, 100]`, before or after normalization.
    #[error("Land-use percentage for {class} is out of range: {value}")]
    OutOfRange {
        /// The class with the bad value.
        class: LandUseClass,
        /// The offending value.
        value: f64,
    },
}

/// Parses classifier output into a normalized breakdown.
///
/// `tolerance` is the maximum distance of the total from 100 that is
/// accepted as-is; anything further is rescaled to 100 and rounded.
///
/// # Errors
///
/// Returns [`ParseError`] if fewer than three values can be found, all
/// values are zero, or a value is not a finite percentage in `[0, 100]`
/// (including signed values such as `-20%`).
pub fn parse_land_use(text: &str, tolerance: f64) -> Result<LandUseBreakdown, ParseError> {
    let labeled = extract_labeled(text)?;

    let raw = if LandUseClass::ALL
        .iter()
        .all(|class| labeled.get(*class).abs() < f64::EPSILON)
    {
        log::debug!("No labeled land-use values found, scanning for bare percentages");
        extract_first_three(text)?
    } else {
        labeled
    };

    normalize_breakdown(raw, tolerance)
}

/// Rescales a breakdown to total 100 when it is further than `tolerance`
/// away, then checks every value is a finite percentage.
///
/// # Errors
///
/// Returns [`ParseError::ZeroTotal`] for an all-zero breakdown,
/// [`ParseError::NotANumber`] for non-finite values, and
/// [`ParseError::OutOfRange`] for values outside `[0, 100]` either as given
/// or after rescaling.
pub fn normalize_breakdown(
    breakdown: LandUseBreakdown,
    tolerance: f64,
) -> Result<LandUseBreakdown, ParseError> {
    check_breakdown(&breakdown)?;

    let total = breakdown.total();
    let normalized = if (total - 100.0).abs() > tolerance {
        let factor = 100.0 / total;
        log::debug!("Land-use total {total} is outside 100±{tolerance}, rescaling by {factor}");
        LandUseBreakdown::new(
            (breakdown.residential * factor).round(),
            (breakdown.road * factor).round(),
            (breakdown.open_space * factor).round(),
        )
    } else {
        breakdown
    };

    for class in LandUseClass::ALL {
        let value = normalized.get(class);
        if !value.is_finite() {
            return Err(ParseError::NotANumber { class });
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(ParseError::OutOfRange { class, value });
        }
    }

    Ok(normalized)
}

/// Checks a breakdown as given: every value a finite percentage and the
/// total above zero. Does not rescale.
///
/// # Errors
///
/// Returns [`ParseError::NotANumber`] for non-finite values,
/// [`ParseError::OutOfRange`] for values outside `[0, 100]`, and
/// [`ParseError::ZeroTotal`] for an all-zero breakdown.
pub fn check_breakdown(breakdown: &LandUseBreakdown) -> Result<(), ParseError> {
    for class in LandUseClass::ALL {
        if !breakdown.get(class).is_finite() {
            return Err(ParseError::NotANumber { class });
        }
    }

    for class in LandUseClass::ALL {
        let value = breakdown.get(class);
        if !(0.0..=100.0).contains(&value) {
            return Err(ParseError::OutOfRange { class, value });
        }
    }

    if breakdown.total() <= 0.0 {
        return Err(ParseError::ZeroTotal);
    }

    Ok(())
}

/// Maps a matched label onto its class.
fn classify_label(label: &str) -> LandUseClass {
    let label = label.to_ascii_lowercase();
    if label.starts_with("res") {
        LandUseClass::Residential
    } else if label.starts_with("road") {
        LandUseClass::Road
    } else {
        LandUseClass::OpenSpace
    }
}

/// Collects labeled values. `%`-suffixed values are preferred over bare
/// JSON numbers, the first occurrence of each class wins, and classes that
/// are never mentioned stay at zero.
fn extract_labeled(text: &str) -> Result<LandUseBreakdown, ParseError> {
    let mut values: [Option<f64>; 3] = [None; 3];

    for re in [&*LABELED_RE, &*QUOTED_RE] {
        for caps in re.captures_iter(text) {
            let class = classify_label(&caps[1]);
            let slot = match class {
                LandUseClass::Residential => &mut values[0],
                LandUseClass::Road => &mut values[1],
                LandUseClass::OpenSpace => &mut values[2],
            };
            if slot.is_none() {
                *slot = Some(parse_number(&caps[2], class)?);
            }
        }
    }

    Ok(LandUseBreakdown::new(
        values[0].unwrap_or(0.0),
        values[1].unwrap_or(0.0),
        values[2].unwrap_or(0.0),
    ))
}

/// Takes the first three bare percentages in order of appearance.
fn extract_first_three(text: &str) -> Result<LandUseBreakdown, ParseError> {
    let numbers: Vec<&str> = PERCENT_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .take(3)
        .collect();

    match numbers.as_slice() {
        [] => Err(ParseError::NoPercentages),
        [residential, road, open_space] => Ok(LandUseBreakdown::new(
            parse_number(residential, LandUseClass::Residential)?,
            parse_number(road, LandUseClass::Road)?,
            parse_number(open_space, LandUseClass::OpenSpace)?,
        )),
        found => Err(ParseError::TooFewPercentages { found: found.len() }),
    }
}

fn parse_number(s: &str, class: LandUseClass) -> Result<f64, ParseError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ParseError::NotANumber { class })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 10.0;

    fn assert_breakdown(actual: LandUseBreakdown, expected: (f64, f64, f64)) {
        assert!(
            (actual.residential - expected.0).abs() < 1e-9
                && (actual.road - expected.1).abs() < 1e-9
                && (actual.open_space - expected.2).abs() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn parses_labeled_lines() {
        let text = "Residential: 45%\nRoad: 25%\nOpen space: 30%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (45.0, 25.0, 30.0));
    }

    #[test]
    fn parses_labels_case_insensitively_in_any_order() {
        let text = "OPEN_SPACE: 20%, ROADS: 30%, residential: 50%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (50.0, 30.0, 20.0));
    }

    #[test]
    fn parses_json_shaped_answer() {
        let text = r#"{"residential": 55.5, "road": 20, "openSpace": 24.5}"#;
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (55.5, 20.0, 24.5));
    }

    #[test]
    fn parses_markdown_and_green_label() {
        let text = "**Residential**: ~40%\n**Road**: 35%\n**Green**: 25%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (40.0, 35.0, 25.0));
    }

    #[test]
    fn first_labeled_value_wins() {
        let text = "Residential: 45%\nRoad: 25%\nOpen space: 30%\n(residential: 99%)";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (45.0, 25.0, 30.0));
    }

    #[test]
    fn missing_label_defaults_to_zero_then_normalizes() {
        // 60 + 20 = 80 is outside 100±10, so it is rescaled to 75/25/0.
        let text = "residential: 60%\nroad: 20%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (75.0, 25.0, 0.0));
    }

    #[test]
    fn falls_back_to_first_three_percentages() {
        let text = "Analysis: 40% residential, 35% road, 25% open";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (40.0, 35.0, 25.0));
    }

    #[test]
    fn fallback_ignores_percentages_after_the_third() {
        let text = "about 50% homes, 30% streets, 20% parks (confidence 90%)";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (50.0, 30.0, 20.0));
    }

    #[test]
    fn all_zero_labels_are_rejected() {
        let text = "residential: 0%, road: 0%, open space: 0%";
        assert_eq!(parse_land_use(text, TOLERANCE), Err(ParseError::ZeroTotal));
    }

    #[test]
    fn labels_without_values_fall_back_to_bare_percentages() {
        let text = "Residential areas cover 52%, roads 18% and open space 30%.";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (52.0, 18.0, 30.0));
    }

    #[test]
    fn rescales_when_total_is_far_from_one_hundred() {
        let text = "residential: 90%, road: 50%, open space: 60%";
        let breakdown = parse_land_use(text, TOLERANCE).unwrap();
        assert_breakdown(breakdown, (45.0, 25.0, 30.0));
    }

    #[test]
    fn rescaled_total_is_within_one_of_one_hundred() {
        for (r, ro, o) in [(33.0, 33.0, 33.0), (10.0, 10.0, 10.0), (70.0, 70.0, 7.0)] {
            let text = format!("residential: {r}%, road: {ro}%, open space: {o}%");
            let breakdown = parse_land_use(&text, TOLERANCE).unwrap();
            assert!(
                (breakdown.total() - 100.0).abs() <= 1.0,
                "{text} -> {breakdown:?}"
            );
        }
    }

    #[test]
    fn keeps_values_within_tolerance_untouched() {
        let text = "residential: 47.5%, road: 24%, open space: 33%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (47.5, 24.0, 33.0));
    }

    #[test]
    fn rejects_text_without_percentages() {
        assert_eq!(
            parse_land_use("I cannot determine land use.", TOLERANCE),
            Err(ParseError::NoPercentages)
        );
    }

    #[test]
    fn rejects_fewer_than_three_bare_percentages() {
        assert_eq!(
            parse_land_use("Mostly 70% houses and 30% roads", TOLERANCE),
            Err(ParseError::TooFewPercentages { found: 2 })
        );
    }

    #[test]
    fn rejects_all_zero_values() {
        assert_eq!(
            parse_land_use("0% 0% 0%", TOLERANCE),
            Err(ParseError::ZeroTotal)
        );
    }

    #[test]
    fn labeled_value_requires_percent_sign() {
        let text = "Residential: 2023 survey shows 45%, Road: 25%, Open space: 30%";
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (45.0, 25.0, 30.0));
    }

    #[test]
    fn labeled_value_does_not_borrow_the_next_label() {
        let text = "Residential: unclear\nRoad: 25%\nOpen space: 30%";
        // Residential stays 0, so 25 + 30 = 55 is rescaled.
        assert_breakdown(parse_land_use(text, TOLERANCE).unwrap(), (0.0, 45.0, 55.0));
    }

    #[test]
    fn rejects_negative_labeled_value() {
        let text = "residential: -20%, road: 60%, open space: 60%";
        assert_eq!(
            parse_land_use(text, TOLERANCE),
            Err(ParseError::OutOfRange {
                class: LandUseClass::Residential,
                value: -20.0
            })
        );
    }

    #[test]
    fn rejects_raw_value_over_one_hundred_before_rescaling() {
        let text = "residential: 150%, road: 25%, open space: 25%";
        assert_eq!(
            parse_land_use(text, TOLERANCE),
            Err(ParseError::OutOfRange {
                class: LandUseClass::Residential,
                value: 150.0
            })
        );
    }

    #[test]
    fn check_breakdown_keeps_totals_off_one_hundred() {
        assert_eq!(
            check_breakdown(&LandUseBreakdown::new(40.0, 20.0, 20.0)),
            Ok(())
        );
        assert_eq!(
            check_breakdown(&LandUseBreakdown::new(45.0, -5.0, 30.0)),
            Err(ParseError::OutOfRange {
                class: LandUseClass::Road,
                value: -5.0
            })
        );
        assert_eq!(
            check_breakdown(&LandUseBreakdown::new(0.0, 0.0, 0.0)),
            Err(ParseError::ZeroTotal)
        );
    }

    #[test]
    fn normalize_rejects_nan() {
        let breakdown = LandUseBreakdown::new(f64::NAN, 25.0, 30.0);
        assert_eq!(
            normalize_breakdown(breakdown, TOLERANCE),
            Err(ParseError::NotANumber {
                class: LandUseClass::Residential
            })
        );
    }

    #[test]
    fn normalize_rejects_value_over_one_hundred_within_tolerance() {
        let breakdown = LandUseBreakdown::new(105.0, 0.0, 0.0);
        assert!(matches!(
            normalize_breakdown(breakdown, TOLERANCE),
            Err(ParseError::OutOfRange {
                class: LandUseClass::Residential,
                ..
            })
        ));
    }
}
