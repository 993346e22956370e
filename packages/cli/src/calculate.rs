//! `calculate` subcommand and the CLI arguments it shares with `classify`.

use clap::Args;
use dialoguer::{Confirm, Input};
use site_profit_analysis::Calibration;
use site_profit_analysis_models::{
    BreakdownSource, BusinessParameters, LandUseBreakdown, ScreenshotMetadata,
};
use site_profit_server::pipeline::{self, PipelineInput};
use site_profit_server_models::{AnalysisResponse, ClassificationInfo, LocationInput, SaveOptions};

use crate::report;

/// Currency used when none is given.
pub const DEFAULT_CURRENCY: &str = "IDR";

/// Screenshot dimensions and scale.
#[derive(Args)]
pub struct ScreenshotArgs {
    /// Screenshot width in pixels
    #[arg(long)]
    pub width: u32,
    /// Screenshot height in pixels
    #[arg(long)]
    pub height: u32,
    /// Map scale in meters per pixel
    #[arg(long)]
    pub scale: Option<f64>,
}

impl ScreenshotArgs {
    pub const fn metadata(&self) -> ScreenshotMetadata {
        ScreenshotMetadata {
            pixel_width: self.width,
            pixel_height: self.height,
            scale_meters_per_pixel: self.scale,
        }
    }
}

/// Business inputs, all required.
#[derive(Args)]
pub struct BusinessArgs {
    /// Storefront width in meters
    #[arg(long)]
    pub building_width: f64,
    /// Operating hours per day
    #[arg(long)]
    pub hours: f64,
    /// Average price per purchase
    #[arg(long)]
    pub price: f64,
    /// ISO 4217 currency code
    #[arg(long, default_value = DEFAULT_CURRENCY)]
    pub currency: String,
}

impl BusinessArgs {
    pub fn parameters(self) -> BusinessParameters {
        BusinessParameters {
            building_width: self.building_width,
            operating_hours: self.hours,
            product_price: self.price,
            currency: self.currency,
        }
    }
}

/// Business inputs for `classify`, where metrics are optional.
#[derive(Args)]
pub struct OptionalBusinessArgs {
    /// Storefront width in meters
    #[arg(long)]
    pub building_width: Option<f64>,
    /// Operating hours per day
    #[arg(long)]
    pub hours: Option<f64>,
    /// Average price per purchase
    #[arg(long)]
    pub price: Option<f64>,
    /// ISO 4217 currency code
    #[arg(long, default_value = DEFAULT_CURRENCY)]
    pub currency: String,
}

impl OptionalBusinessArgs {
    /// Returns the parameters when all three numbers are given, `None` when
    /// none are.
    ///
    /// # Errors
    ///
    /// Returns an error if only some of them are given.
    pub fn parameters(self) -> Result<Option<BusinessParameters>, String> {
        match (self.building_width, self.hours, self.price) {
            (Some(building_width), Some(operating_hours), Some(product_price)) => {
                Ok(Some(BusinessParameters {
                    building_width,
                    operating_hours,
                    product_price,
                    currency: self.currency,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(
                "--building-width, --hours, and --price must be given together".to_string(),
            ),
        }
    }
}

/// Site location and save options.
#[derive(Args, Default)]
pub struct SaveArgs {
    /// Latitude of the site
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Longitude of the site
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,
    /// Address of the site
    #[arg(long)]
    pub address: Option<String>,
    /// Save the analysis to the results database (requires --lat and --lng)
    #[arg(long)]
    pub save: bool,
    /// Title for the saved analysis
    #[arg(long)]
    pub title: Option<String>,
    /// Notes for the saved analysis
    #[arg(long)]
    pub notes: Option<String>,
}

impl SaveArgs {
    /// Title and notes for the saved record.
    pub fn options(&self) -> SaveOptions {
        SaveOptions {
            save: self.save,
            title: self.title.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Runs the pipeline on a known breakdown and prints the result.
///
/// # Errors
///
/// Returns an error if the analysis fails or the result cannot be saved.
pub async fn run(
    calibration: &Calibration,
    breakdown: LandUseBreakdown,
    metadata: &ScreenshotMetadata,
    parameters: BusinessParameters,
    save: &SaveArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = complete(
        calibration,
        breakdown,
        BreakdownSource::Supplied,
        metadata,
        Some(parameters),
        save,
        None,
    )
    .await?;
    print_response(&response, json)
}

/// Runs the shared pipeline tail and saves to the results database if
/// requested. The database is only opened when saving.
///
/// # Errors
///
/// Returns an error if any stage fails, or saving was requested without a
/// location or parameters.
pub async fn complete(
    calibration: &Calibration,
    breakdown: LandUseBreakdown,
    source: BreakdownSource,
    metadata: &ScreenshotMetadata,
    parameters: Option<BusinessParameters>,
    save: &SaveArgs,
    classification: Option<ClassificationInfo>,
) -> Result<AnalysisResponse, Box<dyn std::error::Error>> {
    let location = match (save.lat, save.lng) {
        (Some(lat), Some(lng)) => Some(LocationInput {
            lat,
            lng,
            address: save.address.clone(),
        }),
        (None, None) => None,
        _ => return Err("--lat and --lng must be given together".into()),
    };

    let mut response = pipeline::evaluate(
        calibration,
        PipelineInput {
            breakdown,
            source,
            screenshot: *metadata,
            parameters,
            location,
            classification,
        },
    )?;

    if save.save {
        let record = pipeline::new_record(&response, save.options())?;
        let db = site_profit_database::open_db(&site_profit_database::db_path_from_env()).await?;
        let saved = site_profit_database::save_result(db.as_ref(), record).await?;
        log::info!("Saved analysis {}", saved.id);
        response.saved = Some(saved);
    }

    Ok(response)
}

/// Prints a response as JSON or as a text report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_response(
    response: &AnalysisResponse,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        print!("{}", report::format_response(response));
    }
    Ok(())
}

/// Prompts for a calculation and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the analysis fails.
pub async fn interactive(calibration: &Calibration) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = calibration.default_breakdown;

    let residential: f64 = Input::new()
        .with_prompt("Residential %")
        .default(defaults.residential)
        .interact_text()?;
    let road: f64 = Input::new()
        .with_prompt("Road %")
        .default(defaults.road)
        .interact_text()?;
    let open_space: f64 = Input::new()
        .with_prompt("Open space %")
        .default(defaults.open_space)
        .interact_text()?;

    let metadata = prompt_screenshot()?;
    let parameters = prompt_business()?;
    let save = prompt_save()?;

    let response = complete(
        calibration,
        LandUseBreakdown::new(residential, road, open_space),
        BreakdownSource::Supplied,
        &metadata,
        Some(parameters),
        &save,
        None,
    )
    .await?;

    println!();
    print_response(&response, false)
}

pub fn prompt_screenshot() -> Result<ScreenshotMetadata, dialoguer::Error> {
    let pixel_width: u32 = Input::new()
        .with_prompt("Screenshot width (px)")
        .default(800)
        .interact_text()?;
    let pixel_height: u32 = Input::new()
        .with_prompt("Screenshot height (px)")
        .default(600)
        .interact_text()?;
    let scale: f64 = Input::new()
        .with_prompt("Map scale (meters per pixel)")
        .interact_text()?;

    Ok(ScreenshotMetadata {
        pixel_width,
        pixel_height,
        scale_meters_per_pixel: Some(scale),
    })
}

pub fn prompt_business() -> Result<BusinessParameters, dialoguer::Error> {
    let building_width: f64 = Input::new()
        .with_prompt("Building width (m)")
        .interact_text()?;
    let operating_hours: f64 = Input::new()
        .with_prompt("Operating hours per day")
        .default(12.0)
        .interact_text()?;
    let product_price: f64 = Input::new()
        .with_prompt("Average purchase price")
        .interact_text()?;
    let currency: String = Input::new()
        .with_prompt("Currency")
        .default(DEFAULT_CURRENCY.to_string())
        .interact_text()?;

    Ok(BusinessParameters {
        building_width,
        operating_hours,
        product_price,
        currency,
    })
}

pub fn prompt_save() -> Result<SaveArgs, dialoguer::Error> {
    if !Confirm::new()
        .with_prompt("Save this analysis?")
        .default(false)
        .interact()?
    {
        return Ok(SaveArgs::default());
    }

    let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
    let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
    let address: String = Input::new()
        .with_prompt("Address (optional)")
        .allow_empty(true)
        .interact_text()?;
    let title: String = Input::new()
        .with_prompt("Title (optional)")
        .allow_empty(true)
        .interact_text()?;

    Ok(SaveArgs {
        lat: Some(lat),
        lng: Some(lng),
        address: Some(address).filter(|a| !a.trim().is_empty()),
        save: true,
        title: Some(title).filter(|t| !t.trim().is_empty()),
        notes: None,
    })
}
