//! `classify` subcommand: send a screenshot to the vision provider, then
//! optionally run the pipeline on the breakdown it returns.

use std::path::Path;

use dialoguer::{Confirm, Input};
use site_profit_ai::classifier::{ClassificationRequest, LandUseClassifier};
use site_profit_ai::image::ImageInput;
use site_profit_analysis::{Calibration, geometry};
use site_profit_analysis_models::{BusinessParameters, ScreenshotMetadata};
use site_profit_server_models::ClassificationInfo;

use crate::calculate::{self, SaveArgs};

/// Classifies an image file and prints the result.
///
/// # Errors
///
/// Returns an error if no provider is configured, the image is invalid,
/// the provider call fails, or the analysis fails.
pub async fn run(
    calibration: &Calibration,
    image_path: &Path,
    metadata: &ScreenshotMetadata,
    parameters: Option<BusinessParameters>,
    save: &SaveArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Reject bad geometry before paying for a provider call.
    geometry::resolve_geometry(metadata, calibration.scale_correction_factor)?;

    let classifier = LandUseClassifier::from_env(calibration)?;
    let image = ImageInput::from_bytes(std::fs::read(image_path)?)?;

    log::info!(
        "Classifying {} with {} ({})...",
        image_path.display(),
        classifier.provider_name(),
        classifier.model()
    );

    let classification = classifier
        .classify(&ClassificationRequest {
            image,
            metadata: *metadata,
        })
        .await?;

    if let Some(error) = &classification.parse_error {
        log::warn!("Classifier answer unusable ({error}), using default breakdown");
    }

    let info = ClassificationInfo {
        provider: classifier.provider_name().to_string(),
        model: classifier.model().to_string(),
        raw_response: classification.raw_response,
        parse_error: classification.parse_error,
    };

    let response = calculate::complete(
        calibration,
        classification.breakdown,
        classification.source,
        metadata,
        parameters,
        save,
        Some(info),
    )
    .await?;

    calculate::print_response(&response, json)
}

/// Prompts for an image and its metadata, then classifies it.
///
/// # Errors
///
/// Returns an error if a prompt fails or classification fails.
pub async fn interactive(calibration: &Calibration) -> Result<(), Box<dyn std::error::Error>> {
    let path: String = Input::new()
        .with_prompt("Screenshot file")
        .interact_text()?;

    let metadata = calculate::prompt_screenshot()?;

    let parameters = if Confirm::new()
        .with_prompt("Compute business metrics?")
        .default(true)
        .interact()?
    {
        Some(calculate::prompt_business()?)
    } else {
        None
    };

    let save = if parameters.is_some() {
        calculate::prompt_save()?
    } else {
        SaveArgs::default()
    };

    run(
        calibration,
        Path::new(path.trim()),
        &metadata,
        parameters,
        &save,
        false,
    )
    .await
}
