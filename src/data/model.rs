use chrono::{Datelike, NaiveDate};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Typed failures of the data layer. Everything here is fatal at startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("incident table is empty")]
    EmptyDataset,
}

// ---------------------------------------------------------------------------
// Calendar dimensions with fixed display order
// ---------------------------------------------------------------------------

/// Day of the week in fixed calendar display order (Sunday first).
///
/// The order here is the canonical chart/axis order; it is never derived
/// from string sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    /// Three-letter label for narrow axes.
    pub fn short(self) -> &'static str {
        &self.label()[..3]
    }

    /// Position in [`Weekday::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }
}

/// Calendar month in fixed display order (Jan..Dec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// Position in [`Month::ALL`] (Jan = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_date(date: NaiveDate) -> Self {
        // month0() is 0-based and always < 12.
        Month::ALL[date.month0() as usize]
    }
}

// ---------------------------------------------------------------------------
// Incident – one row of the crime table
// ---------------------------------------------------------------------------

/// WGS84 point location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Region identifier standing for "unknown / unmapped"; never a valid join
/// key against the neighborhood polygons.
pub const UNKNOWN_REGION: i64 = 0;

/// A single crime report.
///
/// `day_of_week` and `month` are derived from `date` at load time so the
/// calendar dimensions always carry their canonical ordering.
#[derive(Debug, Clone)]
pub struct Incident {
    pub date: NaiveDate,
    /// Hour of the day, 0–23.
    pub hour: u8,
    pub day_of_week: Weekday,
    pub month: Month,
    /// Uniform Crime Reporting class, e.g. "Part One". Missing in some rows.
    pub ucr: Option<String>,
    pub offense_group: Option<String>,
    pub offense_description: String,
    pub crime_class: Option<String>,
    pub shooting: Option<bool>,
    pub neighborhood: Option<String>,
    /// Geographic polygon key; [`UNKNOWN_REGION`] when unmapped.
    pub region_id: i64,
    pub street: String,
    pub location: Option<GeoPoint>,
}

// ---------------------------------------------------------------------------
// Neighborhood – one polygon of the boundary file
// ---------------------------------------------------------------------------

/// A closed ring of `[lon, lat]` vertices.
pub type Ring = Vec<[f64; 2]>;

/// Polygon or multipolygon boundary, normalized to one shape: a list of
/// polygons where ring 0 of each polygon is the exterior and the remaining
/// rings are holes.
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    pub polygons: Vec<Vec<Ring>>,
}

impl Boundary {
    /// Exterior rings of every polygon part, in order.
    pub fn exteriors(&self) -> impl Iterator<Item = &Ring> {
        self.polygons.iter().filter_map(|rings| rings.first())
    }
}

#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub region_id: i64,
    pub name: String,
    pub boundary: Boundary,
}

// ---------------------------------------------------------------------------
// CrimeDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Everything loaded at startup, immutable for the lifetime of the app.
/// Passed by reference into every filter and aggregator call.
#[derive(Debug, Clone)]
pub struct CrimeDataset {
    pub incidents: Vec<Incident>,
    pub neighborhoods: Vec<Neighborhood>,
    /// Unique non-missing UCR classes, first-seen order.
    pub ucr_options: Vec<String>,
    /// Unique non-missing neighborhood names, first-seen order.
    pub neighborhood_options: Vec<String>,
    /// Earliest and latest incident date.
    pub date_span: (NaiveDate, NaiveDate),
}

impl CrimeDataset {
    /// Build the option lists and date span from the loaded rows.
    pub fn from_parts(
        incidents: Vec<Incident>,
        neighborhoods: Vec<Neighborhood>,
    ) -> Result<Self, DataError> {
        let mut ucr_options = Vec::new();
        let mut neighborhood_options = Vec::new();
        for inc in &incidents {
            if let Some(ucr) = &inc.ucr {
                if !ucr_options.contains(ucr) {
                    ucr_options.push(ucr.clone());
                }
            }
            if let Some(name) = &inc.neighborhood {
                if !neighborhood_options.contains(name) {
                    neighborhood_options.push(name.clone());
                }
            }
        }

        let first = incidents
            .iter()
            .map(|inc| inc.date)
            .min()
            .ok_or(DataError::EmptyDataset)?;
        let last = incidents
            .iter()
            .map(|inc| inc.date)
            .max()
            .ok_or(DataError::EmptyDataset)?;

        Ok(CrimeDataset {
            incidents,
            neighborhoods,
            ucr_options,
            neighborhood_options,
            date_span: (first, last),
        })
    }

    /// Number of incident rows.
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(date: &str, name: Option<&str>, ucr: Option<&str>) -> Incident {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Incident {
            date,
            hour: 12,
            day_of_week: Weekday::from_chrono(date.weekday()),
            month: Month::from_date(date),
            ucr: ucr.map(str::to_string),
            offense_group: None,
            offense_description: String::new(),
            crime_class: None,
            shooting: None,
            neighborhood: name.map(str::to_string),
            region_id: UNKNOWN_REGION,
            street: String::new(),
            location: None,
        }
    }

    #[test]
    fn weekday_order_is_calendar_not_lexical() {
        let labels: Vec<&str> = Weekday::ALL.iter().map(|d| d.label()).collect();
        assert_eq!(
            labels,
            ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
        );
        // Lexical order would put Friday first.
        assert_eq!(Weekday::Friday.index(), 5);
    }

    #[test]
    fn month_order_is_calendar_not_lexical() {
        let labels: Vec<&str> = Month::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(
            labels,
            ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"]
        );
        // Lexical order would put Apr first.
        assert_eq!(Month::Apr.index(), 3);
    }

    #[test]
    fn weekday_derivation_matches_calendar() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        assert_eq!(Weekday::from_chrono(date.weekday()), Weekday::Monday);
        assert_eq!(Month::from_date(date), Month::Jan);
    }

    #[test]
    fn option_lists_keep_first_seen_order_and_skip_missing() {
        let ds = CrimeDataset::from_parts(
            vec![
                incident("2018-03-05", Some("Back Bay"), Some("Part Two")),
                incident("2018-01-01", None, Some("Part One")),
                incident("2018-06-09", Some("Roxbury"), Some("Part Two")),
                incident("2018-02-11", Some("Back Bay"), None),
            ],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(ds.ucr_options, ["Part Two", "Part One"]);
        assert_eq!(ds.neighborhood_options, ["Back Bay", "Roxbury"]);
        assert_eq!(
            ds.date_span,
            (
                NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2018, 6, 9).unwrap()
            )
        );
    }

    #[test]
    fn empty_incident_table_is_rejected() {
        assert!(CrimeDataset::from_parts(Vec::new(), Vec::new()).is_err());
    }
}
