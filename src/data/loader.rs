use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{
    Boundary, CrimeDataset, DataError, GeoPoint, Incident, Month, Neighborhood, Ring, Weekday,
    UNKNOWN_REGION,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// One-shot startup load of the incident table and the neighborhood
/// boundary file. Any failure here is unrecoverable: the caller aborts
/// with the returned error instead of serving a partial dataset.
pub fn load_dataset(incidents_path: &Path, neighborhoods_path: &Path) -> Result<CrimeDataset> {
    let incidents = load_incidents(incidents_path)
        .with_context(|| format!("loading incidents from {}", incidents_path.display()))?;
    let neighborhoods = load_neighborhoods(neighborhoods_path)
        .with_context(|| format!("loading neighborhoods from {}", neighborhoods_path.display()))?;

    let dataset = CrimeDataset::from_parts(incidents, neighborhoods)?;
    log::info!(
        "loaded {} incidents across {} neighborhood polygons ({} – {})",
        dataset.len(),
        dataset.neighborhoods.len(),
        dataset.date_span.0,
        dataset.date_span.1
    );
    Ok(dataset)
}

/// Load the incident table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the required columns (see below)
/// * `.parquet` – scalar columns with the same names
///
/// Required columns: `DATE`, `TIME_HOUR`, `UCR`, `OFFENSE_CODE_GROUP`,
/// `OFFENSE_DESCRIPTION`, `CRIME_CLASS`, `SHOOTING`, `Name`, `GEOID10`,
/// `STREET`, `X` (longitude), `Y` (latitude).
pub fn load_incidents(path: &Path) -> Result<Vec<Incident>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
            read_incidents_csv(&mut reader)
        }
        "parquet" | "pq" => load_incidents_parquet(path),
        other => Err(DataError::UnsupportedFormat(other.to_string()).into()),
    }
}

/// Load the neighborhood polygons from a GeoJSON FeatureCollection.
/// Each feature must carry `Name` and `GEOID10` properties and a
/// Polygon or MultiPolygon geometry in WGS84.
pub fn load_neighborhoods(path: &Path) -> Result<Vec<Neighborhood>> {
    let text = std::fs::read_to_string(path).context("reading GeoJSON file")?;
    parse_neighborhoods(&text)
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

struct ColumnIndex {
    date: usize,
    hour: usize,
    ucr: usize,
    offense_group: usize,
    offense_description: usize,
    crime_class: usize,
    shooting: usize,
    name: usize,
    region: usize,
    street: usize,
    x: usize,
    y: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &[String]) -> Result<Self, DataError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };
        Ok(ColumnIndex {
            date: find("DATE")?,
            hour: find("TIME_HOUR")?,
            ucr: find("UCR")?,
            offense_group: find("OFFENSE_CODE_GROUP")?,
            offense_description: find("OFFENSE_DESCRIPTION")?,
            crime_class: find("CRIME_CLASS")?,
            shooting: find("SHOOTING")?,
            name: find("Name")?,
            region: find("GEOID10")?,
            street: find("STREET")?,
            x: find("X")?,
            y: find("Y")?,
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_incidents_csv<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<Incident>> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();
    let cols = ColumnIndex::from_headers(&headers)?;

    let mut incidents = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let raw_date = cell(cols.date);
        let date = parse_date(raw_date).ok_or(DataError::InvalidRow {
            row: row_no,
            message: format!("invalid DATE '{raw_date}'"),
        })?;
        let raw_hour = cell(cols.hour);
        let hour = parse_hour(raw_hour).ok_or(DataError::InvalidRow {
            row: row_no,
            message: format!("invalid TIME_HOUR '{raw_hour}'"),
        })?;

        incidents.push(Incident {
            date,
            hour,
            day_of_week: Weekday::from_chrono(date.weekday()),
            month: Month::from_date(date),
            ucr: non_empty(cell(cols.ucr)),
            offense_group: non_empty(cell(cols.offense_group)),
            offense_description: cell(cols.offense_description).trim().to_string(),
            crime_class: non_empty(cell(cols.crime_class)),
            shooting: parse_shooting(cell(cols.shooting)),
            neighborhood: non_empty(cell(cols.name)),
            region_id: parse_region_id(cell(cols.region)),
            street: cell(cols.street).trim().to_string(),
            location: parse_location(cell(cols.x), cell(cols.y)),
        });
    }

    Ok(incidents)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_incidents_parquet(path: &Path) -> Result<Vec<Incident>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut incidents = Vec::new();
    let mut row_base = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let index_of = |name: &str| {
            schema
                .index_of(name)
                .map_err(|_| DataError::MissingColumn(name.to_string()))
        };

        let date_col = batch.column(index_of("DATE")?);
        let hour_col = batch.column(index_of("TIME_HOUR")?);
        let ucr_col = batch.column(index_of("UCR")?);
        let group_col = batch.column(index_of("OFFENSE_CODE_GROUP")?);
        let description_col = batch.column(index_of("OFFENSE_DESCRIPTION")?);
        let class_col = batch.column(index_of("CRIME_CLASS")?);
        let shooting_col = batch.column(index_of("SHOOTING")?);
        let name_col = batch.column(index_of("Name")?);
        let region_col = batch.column(index_of("GEOID10")?);
        let street_col = batch.column(index_of("STREET")?);
        let x_col = batch.column(index_of("X")?);
        let y_col = batch.column(index_of("Y")?);

        for row in 0..batch.num_rows() {
            let row_no = row_base + row;
            let date = cell_date(date_col, row).ok_or(DataError::InvalidRow {
                row: row_no,
                message: "invalid or missing DATE".to_string(),
            })?;
            let hour = cell_i64(hour_col, row)
                .filter(|h| (0..=23).contains(h))
                .ok_or(DataError::InvalidRow {
                    row: row_no,
                    message: "invalid or missing TIME_HOUR".to_string(),
                })? as u8;

            incidents.push(Incident {
                date,
                hour,
                day_of_week: Weekday::from_chrono(date.weekday()),
                month: Month::from_date(date),
                ucr: cell_string(ucr_col, row),
                offense_group: cell_string(group_col, row),
                offense_description: cell_string(description_col, row).unwrap_or_default(),
                crime_class: cell_string(class_col, row),
                shooting: cell_bool(shooting_col, row),
                neighborhood: cell_string(name_col, row),
                region_id: cell_i64(region_col, row).unwrap_or(UNKNOWN_REGION),
                street: cell_string(street_col, row).unwrap_or_default(),
                location: match (cell_f64(x_col, row), cell_f64(y_col, row)) {
                    (Some(lon), Some(lat)) => Some(GeoPoint { lat, lon }),
                    _ => None,
                },
            });
        }
        row_base += batch.num_rows();
    }

    Ok(incidents)
}

// -- Arrow cell helpers --

fn cell_string(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    let raw = match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }?;
    non_empty(&raw)
}

fn cell_i64(col: &ArrayRef, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row)),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row) as i64),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row))
            .filter(|v| v.is_finite())
            .map(|v| v as i64),
        DataType::Utf8 | DataType::LargeUtf8 => {
            let raw = cell_string(col, row)?;
            raw.parse::<i64>().ok().or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v as i64)
            })
        }
        _ => None,
    }
}

fn cell_f64(col: &ArrayRef, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row) as f64),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn cell_bool(col: &ArrayRef, row: usize) -> Option<bool> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| a.value(row)),
        DataType::Utf8 | DataType::LargeUtf8 => parse_shooting(&cell_string(col, row)?),
        _ => None,
    }
}

fn cell_date(col: &ArrayRef, row: usize) -> Option<NaiveDate> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        // Date32 is days since the Unix epoch.
        DataType::Date32 => col
            .as_any()
            .downcast_ref::<Date32Array>()
            .map(|a| NaiveDate::default() + chrono::Duration::days(a.value(row) as i64)),
        DataType::Utf8 | DataType::LargeUtf8 => parse_date(&cell_string(col, row)?),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// GeoJSON loader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: FeatureGeometry,
}

#[derive(Deserialize)]
struct FeatureProperties {
    #[serde(rename = "Name")]
    name: String,
    /// Number in some exports, string in others.
    #[serde(rename = "GEOID10")]
    region_id: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum FeatureGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

fn parse_neighborhoods(text: &str) -> Result<Vec<Neighborhood>> {
    let collection: FeatureCollection =
        serde_json::from_str(text).context("parsing GeoJSON FeatureCollection")?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| {
            let region_id = region_id_from_json(&feature.properties.region_id);
            if region_id == UNKNOWN_REGION {
                return Err(DataError::InvalidRow {
                    row: i,
                    message: format!(
                        "feature '{}' has no usable GEOID10",
                        feature.properties.name
                    ),
                }
                .into());
            }
            let boundary = match feature.geometry {
                FeatureGeometry::Polygon { coordinates } => Boundary {
                    polygons: vec![coordinates],
                },
                FeatureGeometry::MultiPolygon { coordinates } => Boundary {
                    polygons: coordinates,
                },
            };
            Ok(Neighborhood {
                region_id,
                name: feature.properties.name,
                boundary,
            })
        })
        .collect()
}

fn region_id_from_json(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .unwrap_or(UNKNOWN_REGION),
        serde_json::Value::String(s) => parse_region_id(s),
        _ => UNKNOWN_REGION,
    }
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `%Y-%m-%d`, tolerating a trailing time-of-day part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.date())
    })
}

fn parse_hour(raw: &str) -> Option<u8> {
    raw.trim().parse::<u8>().ok().filter(|h| *h <= 23)
}

/// Canonicalize a raw region identifier. The source data encodes these
/// inconsistently: plain integers, float-encoded integers ("25025010500.0"),
/// or blank for unmapped rows. Anything unusable maps to [`UNKNOWN_REGION`].
fn parse_region_id(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_REGION;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return v;
    }
    if let Ok(v) = raw.parse::<f64>() {
        if v.is_finite() {
            return v as i64;
        }
    }
    UNKNOWN_REGION
}

fn parse_shooting(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "1" | "true" => Some(true),
        "n" | "no" | "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_location(x: &str, y: &str) -> Option<GeoPoint> {
    let lon = x.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lat = y.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(GeoPoint { lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "DATE,TIME_HOUR,UCR,OFFENSE_CODE_GROUP,OFFENSE_DESCRIPTION,CRIME_CLASS,SHOOTING,Name,GEOID10,STREET,X,Y";

    fn read_csv(text: &str) -> Result<Vec<Incident>> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        read_incidents_csv(&mut reader)
    }

    #[test]
    fn region_id_canonicalization() {
        assert_eq!(parse_region_id(""), UNKNOWN_REGION);
        assert_eq!(parse_region_id("   "), UNKNOWN_REGION);
        assert_eq!(parse_region_id("25025010500"), 25025010500);
        assert_eq!(parse_region_id("25025010500.0"), 25025010500);
        assert_eq!(parse_region_id("not-a-number"), UNKNOWN_REGION);
    }

    #[test]
    fn shooting_tokens() {
        assert_eq!(parse_shooting("Y"), Some(true));
        assert_eq!(parse_shooting("n"), Some(false));
        assert_eq!(parse_shooting("1"), Some(true));
        assert_eq!(parse_shooting(""), None);
        assert_eq!(parse_shooting("maybe"), None);
    }

    #[test]
    fn date_accepts_trailing_time() {
        let expected = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        assert_eq!(parse_date("2018-01-01"), Some(expected));
        assert_eq!(parse_date("2018-01-01 13:45:00"), Some(expected));
        assert_eq!(parse_date("01/01/2018"), None);
    }

    #[test]
    fn csv_rows_are_normalized() {
        let text = format!(
            "{HEADER}\n\
             2018-01-01,14,Part One,Larceny,LARCENY ALL OTHERS,Violent,Y,Back Bay,25025010500.0,BOYLSTON ST,-71.08,42.35\n\
             2018-02-03,0,,,VERBAL DISPUTE,,,,,,,\n"
        );
        let incidents = read_csv(&text).unwrap();
        assert_eq!(incidents.len(), 2);

        let first = &incidents[0];
        assert_eq!(first.day_of_week, Weekday::Monday);
        assert_eq!(first.month, Month::Jan);
        assert_eq!(first.hour, 14);
        assert_eq!(first.region_id, 25025010500);
        assert_eq!(first.shooting, Some(true));
        let loc = first.location.unwrap();
        assert!((loc.lon - -71.08).abs() < 1e-9);
        assert!((loc.lat - 42.35).abs() < 1e-9);

        let second = &incidents[1];
        assert_eq!(second.day_of_week, Weekday::Saturday);
        assert_eq!(second.ucr, None);
        assert_eq!(second.offense_group, None);
        assert_eq!(second.shooting, None);
        assert_eq!(second.neighborhood, None);
        assert_eq!(second.region_id, UNKNOWN_REGION);
        assert_eq!(second.location, None);
    }

    #[test]
    fn missing_column_is_named_in_the_error() {
        let text = "DATE,TIME_HOUR,UCR\n2018-01-01,3,Part One\n";
        let err = read_csv(text).unwrap_err();
        assert!(err.to_string().contains("OFFENSE_CODE_GROUP"));
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let text = format!("{HEADER}\n2018-01-01,24,,,d,,,,,,,\n");
        assert!(read_csv(&text).is_err());
    }

    #[test]
    fn geojson_polygon_and_multipolygon() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"Name": "Back Bay", "GEOID10": 25025010500},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-71.1, 42.3], [-71.0, 42.3], [-71.0, 42.4], [-71.1, 42.3]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"Name": "Harbor Islands", "GEOID10": "25025980101"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[-70.9, 42.3], [-70.8, 42.3], [-70.8, 42.4], [-70.9, 42.3]]],
                            [[[-70.7, 42.2], [-70.6, 42.2], [-70.6, 42.3], [-70.7, 42.2]]]
                        ]
                    }
                }
            ]
        }"#;
        let neighborhoods = parse_neighborhoods(text).unwrap();
        assert_eq!(neighborhoods.len(), 2);
        assert_eq!(neighborhoods[0].region_id, 25025010500);
        assert_eq!(neighborhoods[0].boundary.polygons.len(), 1);
        assert_eq!(neighborhoods[1].region_id, 25025980101);
        assert_eq!(neighborhoods[1].boundary.exteriors().count(), 2);
    }

    #[test]
    fn geojson_without_region_id_is_fatal() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"Name": "Nowhere", "GEOID10": null},
                    "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]]}
                }
            ]
        }"#;
        assert!(parse_neighborhoods(text).is_err());
    }
}
