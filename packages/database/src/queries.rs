//! CRUD operations on saved analyses.
//!
//! All queries are raw SQL via `exec_raw_params()`/`query_raw_params()`
//! against the `analysis_results` table created by [`crate::open_db`].

use moosicbox_json_utils::database::ToValue as _;
use site_profit_analysis_models::{BusinessParameters, LandUseBreakdown, LocationData};
use site_profit_database_models::{
    AnalysisResult, NewAnalysisResult, Page, PageRequest, ResultUpdate, StoredMetrics, WholeNumber,
};
use switchy_database::{Database, DatabaseValue, Row};

use crate::ResultStoreError;

const SELECT_COLUMNS: &str = "id, timestamp, lat, lng, population_density_per_sq_km, address, \
     area_square_km, residential, road, open_space, cglp, pops, road_area_sqm, pdr, apc, apt, \
     vcdt, tppd, daily_revenue, monthly_revenue, yearly_revenue, building_width, \
     operating_hours, product_price, currency, title, notes";

/// Reads a required column, converting failures into
/// [`ResultStoreError::Conversion`].
macro_rules! column {
    ($row:expr, $name:literal) => {
        $row.to_value($name)
            .map_err(|e| ResultStoreError::Conversion {
                message: format!("Failed to read column {}: {e}", $name),
            })?
    };
}

/// Saves a new analysis, assigning a UUID v4 id and the current time.
///
/// Blank titles and notes are stored as absent.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the insert fails.
pub async fn save_result(
    db: &dyn Database,
    result: NewAnalysisResult,
) -> Result<AnalysisResult, ResultStoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().timestamp_millis();
    insert_result(db, id, timestamp, result).await
}

/// Inserts an analysis with an explicit id and timestamp.
pub(crate) async fn insert_result(
    db: &dyn Database,
    id: String,
    timestamp: i64,
    result: NewAnalysisResult,
) -> Result<AnalysisResult, ResultStoreError> {
    let record = AnalysisResult {
        id,
        timestamp,
        location_data: result.location_data,
        area_distribution: result.area_distribution,
        business_metrics: result.business_metrics,
        business_parameters: result.business_parameters,
        title: clean_text(result.title),
        notes: clean_text(result.notes),
    };

    let location = &record.location_data;
    let breakdown = &record.area_distribution;
    let metrics = &record.business_metrics;
    let parameters = &record.business_parameters;

    db.exec_raw_params(
        "INSERT INTO analysis_results (
            id, timestamp, lat, lng, population_density_per_sq_km, address, area_square_km,
            residential, road, open_space,
            cglp, pops, road_area_sqm, pdr, apc, apt, vcdt, tppd,
            daily_revenue, monthly_revenue, yearly_revenue,
            building_width, operating_hours, product_price, currency,
            title, notes
         ) VALUES (
            $1, $2, $3, $4, $5, $6, $7,
            $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21,
            $22, $23, $24, $25,
            $26, $27
         )",
        &[
            DatabaseValue::String(record.id.clone()),
            DatabaseValue::Int64(record.timestamp),
            DatabaseValue::Real64(location.lat),
            DatabaseValue::Real64(location.lng),
            DatabaseValue::Real64(location.population_density_per_sq_km),
            optional_text(location.address.as_ref()),
            DatabaseValue::Real64(location.area_square_km),
            DatabaseValue::Real64(breakdown.residential),
            DatabaseValue::Real64(breakdown.road),
            DatabaseValue::Real64(breakdown.open_space),
            DatabaseValue::Int64(metrics.cglp.get()),
            DatabaseValue::Int64(metrics.pops.get()),
            DatabaseValue::Int64(metrics.road_area_sqm.get()),
            DatabaseValue::Real64(metrics.pdr),
            DatabaseValue::Real64(metrics.apc),
            DatabaseValue::Int64(metrics.apt.get()),
            DatabaseValue::Int64(metrics.vcdt.get()),
            DatabaseValue::Int64(metrics.tppd.get()),
            DatabaseValue::Int64(metrics.daily_revenue.get()),
            DatabaseValue::Int64(metrics.monthly_revenue.get()),
            DatabaseValue::Int64(metrics.yearly_revenue.get()),
            DatabaseValue::Real64(parameters.building_width),
            DatabaseValue::Real64(parameters.operating_hours),
            DatabaseValue::Real64(parameters.product_price),
            DatabaseValue::String(parameters.currency.clone()),
            optional_text(record.title.as_ref()),
            optional_text(record.notes.as_ref()),
        ],
    )
    .await
    .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    log::info!("Saved analysis {}", record.id);

    Ok(record)
}

/// Loads one analysis by id.
///
/// Returns `None` if no analysis has that id.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the query fails or the row is malformed.
pub async fn get_result(
    db: &dyn Database,
    id: &str,
) -> Result<Option<AnalysisResult>, ResultStoreError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {SELECT_COLUMNS} FROM analysis_results WHERE id = $1"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await
        .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    rows.first().map(row_to_result).transpose()
}

/// Lists analyses, newest first.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the query fails or a row is malformed.
pub async fn list_results(
    db: &dyn Database,
    page: PageRequest,
) -> Result<Page<AnalysisResult>, ResultStoreError> {
    let total = count_results(db).await?;

    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM analysis_results
                 ORDER BY timestamp DESC, id DESC
                 LIMIT $1 OFFSET $2"
            ),
            &[
                DatabaseValue::Int64(i64::from(page.limit())),
                DatabaseValue::Int64(i64::from(page.offset())),
            ],
        )
        .await
        .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    let results = rows
        .iter()
        .map(row_to_result)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(results, total, page))
}

/// Updates the title and/or notes of an analysis. An empty string clears
/// the field; `None` leaves it unchanged.
///
/// Returns the updated analysis, or `None` if no analysis has that id.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if a query fails.
pub async fn update_result(
    db: &dyn Database,
    id: &str,
    update: ResultUpdate,
) -> Result<Option<AnalysisResult>, ResultStoreError> {
    if update.is_empty() {
        return get_result(db, id).await;
    }

    let mut assignments = Vec::new();
    let mut params = vec![DatabaseValue::String(id.to_string())];

    for (column, value) in [("title", update.title), ("notes", update.notes)] {
        if let Some(value) = value {
            params.push(optional_text(clean_text(Some(value)).as_ref()));
            assignments.push(format!("{column} = ${}", params.len()));
        }
    }

    let updated = db
        .exec_raw_params(
            &format!(
                "UPDATE analysis_results SET {} WHERE id = $1",
                assignments.join(", ")
            ),
            &params,
        )
        .await
        .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    if updated == 0 {
        return Ok(None);
    }

    log::info!("Updated analysis {id}");

    get_result(db, id).await
}

/// Deletes an analysis.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the database operation fails.
pub async fn delete_result(db: &dyn Database, id: &str) -> Result<bool, ResultStoreError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM analysis_results WHERE id = $1",
            &[DatabaseValue::String(id.to_string())],
        )
        .await
        .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    if deleted > 0 {
        log::info!("Deleted analysis {id}");
    }

    Ok(deleted > 0)
}

/// Returns the total number of saved analyses.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the database operation fails.
pub async fn count_results(db: &dyn Database) -> Result<u64, ResultStoreError> {
    let rows = db
        .query_raw_params("SELECT COUNT(*) as cnt FROM analysis_results", &[])
        .await
        .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    count_from_rows(&rows)
}

/// Reads the `cnt` column of a `COUNT(*)` query. No rows means zero.
fn count_from_rows(rows: &[Row]) -> Result<u64, ResultStoreError> {
    let count: i64 = match rows.first() {
        Some(row) => column!(row, "cnt"),
        None => 0,
    };

    #[allow(clippy::cast_sign_loss)]
    Ok(count.max(0) as u64)
}

fn row_to_result(row: &Row) -> Result<AnalysisResult, ResultStoreError> {
    let whole = |value: i64| WholeNumber::new(value);

    Ok(AnalysisResult {
        id: column!(row, "id"),
        timestamp: column!(row, "timestamp"),
        location_data: LocationData {
            lat: column!(row, "lat"),
            lng: column!(row, "lng"),
            population_density_per_sq_km: column!(row, "population_density_per_sq_km"),
            address: row.to_value("address").unwrap_or(None),
            area_square_km: column!(row, "area_square_km"),
        },
        area_distribution: LandUseBreakdown {
            residential: column!(row, "residential"),
            road: column!(row, "road"),
            open_space: column!(row, "open_space"),
        },
        business_metrics: StoredMetrics {
            cglp: whole(column!(row, "cglp")),
            pops: whole(column!(row, "pops")),
            road_area_sqm: whole(column!(row, "road_area_sqm")),
            pdr: column!(row, "pdr"),
            apc: column!(row, "apc"),
            apt: whole(column!(row, "apt")),
            vcdt: whole(column!(row, "vcdt")),
            tppd: whole(column!(row, "tppd")),
            daily_revenue: whole(column!(row, "daily_revenue")),
            monthly_revenue: whole(column!(row, "monthly_revenue")),
            yearly_revenue: whole(column!(row, "yearly_revenue")),
        },
        business_parameters: BusinessParameters {
            building_width: column!(row, "building_width"),
            operating_hours: column!(row, "operating_hours"),
            product_price: column!(row, "product_price"),
            currency: column!(row, "currency"),
        },
        title: row.to_value("title").unwrap_or(None),
        notes: row.to_value("notes").unwrap_or(None),
    })
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_text(value: Option<&String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.clone()))
}
