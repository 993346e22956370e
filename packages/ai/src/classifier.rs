//! Land-use classifier adapter.
//!
//! Sends a map screenshot and its metadata to a [`VisionProvider`], then
//! parses the free-form answer into a [`LandUseBreakdown`]. When the answer
//! has no usable percentages the configured [`ParseFailurePolicy`] decides
//! between the calibrated default breakdown and an error.

use serde::{Deserialize, Serialize};
use site_profit_analysis::Calibration;
use site_profit_analysis::parser::parse_land_use;
use site_profit_analysis_models::{BreakdownSource, LandUseBreakdown, ScreenshotMetadata};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;
use crate::image::ImageInput;
use crate::providers::{self, VisionProvider};

/// Environment variable selecting the [`ParseFailurePolicy`].
pub const ON_PARSE_FAILURE_ENV: &str = "ON_PARSE_FAILURE";

/// System prompt sent with every classification request.
pub const SYSTEM_PROMPT: &str = "You are an urban land-use analyst. You look at top-down map \
screenshots and estimate what share of the visible area is residential buildings, roads, and \
open space (parks, fields, water, vacant land). Answer only with the three percentages.";

/// What to do when the classifier answer contains no usable percentages.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ParseFailurePolicy {
    /// Substitute the calibrated default breakdown (45/25/30) and mark it
    /// with [`BreakdownSource::Default`].
    #[default]
    #[serde(rename = "default")]
    #[strum(serialize = "default")]
    UseDefault,
    /// Fail the classification with [`AiError::Parse`].
    Abort,
}

impl ParseFailurePolicy {
    /// Reads the policy from `ON_PARSE_FAILURE`, defaulting to
    /// [`ParseFailurePolicy::UseDefault`] when unset.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] for an unrecognized value.
    pub fn from_env() -> Result<Self, AiError> {
        Self::from_setting(std::env::var(ON_PARSE_FAILURE_ENV).ok().as_deref())
    }

    /// Parses an `ON_PARSE_FAILURE` value. Unset or blank means
    /// [`ParseFailurePolicy::UseDefault`].
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] for an unrecognized value.
    pub fn from_setting(value: Option<&str>) -> Result<Self, AiError> {
        match value.map(str::trim) {
            Some(value) if !value.is_empty() => value.parse().map_err(|_| AiError::Config {
                message: format!(
                    "{ON_PARSE_FAILURE_ENV} must be 'default' or 'abort', got {value:?}"
                ),
            }),
            _ => Ok(Self::default()),
        }
    }
}

/// One screenshot to classify.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// The captured map image.
    pub image: ImageInput,
    /// Pixel dimensions and map scale of the image.
    pub metadata: ScreenshotMetadata,
}

/// Result of classifying a screenshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// The breakdown used downstream.
    pub breakdown: LandUseBreakdown,
    /// Whether the breakdown was parsed or substituted.
    pub source: BreakdownSource,
    /// The provider's unmodified answer.
    pub raw_response: String,
    /// Why parsing failed, when the default breakdown was substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Classifies map screenshots into land-use percentages.
pub struct LandUseClassifier {
    provider: Box<dyn VisionProvider>,
    policy: ParseFailurePolicy,
    tolerance: f64,
    default_breakdown: LandUseBreakdown,
}

impl std::fmt::Debug for LandUseClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandUseClassifier")
            .field("policy", &self.policy)
            .field("tolerance", &self.tolerance)
            .field("default_breakdown", &self.default_breakdown)
            .finish_non_exhaustive()
    }
}

impl LandUseClassifier {
    /// Creates a classifier around an existing provider.
    #[must_use]
    pub fn new(
        provider: Box<dyn VisionProvider>,
        calibration: &Calibration,
        policy: ParseFailurePolicy,
    ) -> Self {
        Self {
            provider,
            policy,
            tolerance: calibration.normalization_tolerance,
            default_breakdown: calibration.default_breakdown,
        }
    }

    /// Creates a classifier with the provider and parse-failure policy
    /// configured through environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `ON_PARSE_FAILURE` is invalid or the
    /// provider settings are wrong, and [`AiError::NotConfigured`] if no
    /// provider is configured.
    pub fn from_env(calibration: &Calibration) -> Result<Self, AiError> {
        let policy = ParseFailurePolicy::from_env()?;
        let provider = providers::create_provider_from_env()?;
        log::info!(
            "Land-use classifier using {} ({}), on parse failure: {policy}",
            provider.name(),
            provider.model(),
        );
        Ok(Self::new(provider, calibration, policy))
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Model used by the underlying provider.
    #[must_use]
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// The configured parse-failure policy.
    #[must_use]
    pub const fn policy(&self) -> ParseFailurePolicy {
        self.policy
    }

    /// Sends the screenshot to the provider and interprets the answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the provider call fails, or
    /// [`AiError::Parse`] when the answer is unusable and the policy is
    /// [`ParseFailurePolicy::Abort`].
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, AiError> {
        let prompt = build_prompt(&request.metadata);
        log::debug!(
            "Classifying {}x{} screenshot ({}, {} bytes) with {}",
            request.metadata.pixel_width,
            request.metadata.pixel_height,
            request.image.media_type(),
            request.image.bytes().len(),
            self.provider.name(),
        );

        let raw = self
            .provider
            .describe_image(SYSTEM_PROMPT, &prompt, &request.image)
            .await?;

        log::debug!("Classifier response: {raw}");

        self.interpret(raw)
    }

    /// Parses a raw classifier answer, applying the parse-failure policy.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Parse`] when the answer is unusable and the policy
    /// is [`ParseFailurePolicy::Abort`].
    pub fn interpret(&self, raw_response: String) -> Result<Classification, AiError> {
        match parse_land_use(&raw_response, self.tolerance) {
            Ok(breakdown) => Ok(Classification {
                breakdown,
                source: BreakdownSource::Classifier,
                raw_response,
                parse_error: None,
            }),
            Err(e) => match self.policy {
                ParseFailurePolicy::Abort => {
                    log::warn!("Classifier response unusable, aborting: {e}");
                    Err(AiError::Parse(e))
                }
                ParseFailurePolicy::UseDefault => {
                    log::warn!(
                        "Classifier response unusable ({e}), using default breakdown \
                         {}/{}/{}",
                        self.default_breakdown.residential,
                        self.default_breakdown.road,
                        self.default_breakdown.open_space,
                    );
                    Ok(Classification {
                        breakdown: self.default_breakdown,
                        source: BreakdownSource::Default,
                        raw_response,
                        parse_error: Some(e.to_string()),
                    })
                }
            },
        }
    }
}

/// Builds the user prompt for one screenshot.
#[must_use]
pub fn build_prompt(metadata: &ScreenshotMetadata) -> String {
    let scale = metadata.scale_meters_per_pixel.map_or_else(
        || "unknown".to_string(),
        |scale| format!("{scale} meters per pixel"),
    );

    format!(
        "This map screenshot is {width}x{height} pixels at a scale of {scale}.\n\
         Estimate the percentage of the visible area covered by each land-use class. \
         The three percentages must add up to 100.\n\
         Reply in exactly this format:\n\
         Residential: <number>%\n\
         Road: <number>%\n\
         Open Space: <number>%",
        width = metadata.pixel_width,
        height = metadata.pixel_height,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::image::tests::PNG_HEADER;

    struct MockProvider {
        answer: Result<String, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl VisionProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-vision"
        }

        async fn describe_image(
            &self,
            system_prompt: &str,
            prompt: &str,
            image: &ImageInput,
        ) -> Result<String, AiError> {
            assert_eq!(system_prompt, SYSTEM_PROMPT);
            assert!(prompt.contains("800x600 pixels"));
            assert_eq!(image.bytes(), PNG_HEADER);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .map_err(|message| AiError::Provider { message })
        }
    }

    fn classifier(
        answer: Result<&str, &str>,
        policy: ParseFailurePolicy,
    ) -> (LandUseClassifier, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = MockProvider {
            answer: answer.map(ToString::to_string).map_err(ToString::to_string),
            calls: Arc::clone(&calls),
        };
        (
            LandUseClassifier::new(Box::new(provider), &Calibration::default(), policy),
            calls,
        )
    }

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            image: ImageInput::from_bytes(PNG_HEADER.to_vec()).unwrap(),
            metadata: ScreenshotMetadata {
                pixel_width: 800,
                pixel_height: 600,
                scale_meters_per_pixel: Some(0.0536),
            },
        }
    }

    #[tokio::test]
    async fn classifies_labeled_answer() {
        let (classifier, calls) = classifier(
            Ok("Residential: 45%\nRoad: 25%\nOpen Space: 30%"),
            ParseFailurePolicy::UseDefault,
        );
        let classification = classifier.classify(&request()).await.unwrap();
        assert_eq!(
            classification.breakdown,
            LandUseBreakdown::new(45.0, 25.0, 30.0)
        );
        assert_eq!(classification.source, BreakdownSource::Classifier);
        assert_eq!(classification.parse_error, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unusable_answer_falls_back_to_default() {
        let (classifier, _) = classifier(
            Ok("I cannot determine land use from this image."),
            ParseFailurePolicy::UseDefault,
        );
        let classification = classifier.classify(&request()).await.unwrap();
        assert_eq!(
            classification.breakdown,
            LandUseBreakdown::new(45.0, 25.0, 30.0)
        );
        assert_eq!(classification.source, BreakdownSource::Default);
        assert!(classification.parse_error.is_some());
        assert_eq!(
            classification.raw_response,
            "I cannot determine land use from this image."
        );
    }

    #[tokio::test]
    async fn unusable_answer_aborts_when_configured() {
        let (classifier, _) = classifier(Ok("no idea"), ParseFailurePolicy::Abort);
        let err = classifier.classify(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let (classifier, _) = classifier(Err("overloaded"), ParseFailurePolicy::UseDefault);
        let err = classifier.classify(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::Provider { .. }));
    }

    #[test]
    fn interpret_normalizes_out_of_tolerance_totals() {
        let (classifier, _) = classifier(Ok(""), ParseFailurePolicy::Abort);
        let classification = classifier
            .interpret("Residential: 60%, Road: 40%, Open Space: 40%".to_string())
            .unwrap();
        let total = classification.breakdown.total();
        assert!((total - 100.0).abs() <= 1.0, "total {total}");
    }

    #[test]
    fn prompt_mentions_dimensions_and_scale() {
        let prompt = build_prompt(&request().metadata);
        assert!(prompt.contains("800x600 pixels"));
        assert!(prompt.contains("0.0536 meters per pixel"));
        assert!(prompt.contains("Open Space: <number>%"));

        let prompt = build_prompt(&ScreenshotMetadata {
            pixel_width: 10,
            pixel_height: 10,
            scale_meters_per_pixel: None,
        });
        assert!(prompt.contains("scale of unknown"));
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(
            "default".parse::<ParseFailurePolicy>().unwrap(),
            ParseFailurePolicy::UseDefault
        );
        assert_eq!(
            "ABORT".parse::<ParseFailurePolicy>().unwrap(),
            ParseFailurePolicy::Abort
        );
        assert_eq!(ParseFailurePolicy::UseDefault.to_string(), "default");
        assert!("retry".parse::<ParseFailurePolicy>().is_err());
    }

    #[test]
    fn policy_setting_defaults_when_blank_and_rejects_typos() {
        assert_eq!(
            ParseFailurePolicy::from_setting(None).unwrap(),
            ParseFailurePolicy::UseDefault
        );
        assert_eq!(
            ParseFailurePolicy::from_setting(Some("  ")).unwrap(),
            ParseFailurePolicy::UseDefault
        );
        assert_eq!(
            ParseFailurePolicy::from_setting(Some(" abort ")).unwrap(),
            ParseFailurePolicy::Abort
        );
        assert!(matches!(
            ParseFailurePolicy::from_setting(Some("abrot")),
            Err(AiError::Config { .. })
        ));
    }
}
