use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use super::filter::{filter_incidents, Selection};
use super::model::{CrimeDataset, Incident, Month, Neighborhood, Weekday, UNKNOWN_REGION};

/// Window size of the trailing daily moving average shown on the
/// time-series chart.
pub const MOVING_AVG_WINDOW: usize = 14;

/// Bounds of the top-N slider. Values outside this range produce an empty
/// table rather than an error.
pub const TOP_N_MIN: usize = 3;
pub const TOP_N_MAX: usize = 15;

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// Ordered (label, count) rows; the shape every one-dimensional chart
/// consumes.
pub type CountTable = Vec<(String, u64)>;

/// Dense two-dimensional count matrix with row/column labels. Cells with no
/// matching incidents hold zero; both axes always span their full canonical
/// domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `cells[row][col]`, same lengths as the label vectors.
    pub cells: Vec<Vec<u64>>,
}

impl PivotTable {
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    pub fn max_cell(&self) -> u64 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// One day of the time series: raw count plus the trailing moving average,
/// which is undefined until a full window of days is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub count: u64,
    pub moving_avg: Option<f64>,
}

/// Whether the daily-count series underlying the moving average includes
/// calendar dates with zero incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailySeriesMode {
    /// Every calendar date across the observed span, zero-filled.
    Dense,
    /// Only dates with at least one incident.
    Sparse,
}

/// Per-polygon incident count for the choropleth: one row per neighborhood
/// polygon regardless of activity, joinable back to geometry by
/// `region_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCount {
    pub region_id: i64,
    pub name: String,
    pub count: u64,
}

/// The dimension a bar chart aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Year,
    Month,
    DayOfWeek,
    Hour,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Year,
        Dimension::Month,
        Dimension::DayOfWeek,
        Dimension::Hour,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Year => "Year",
            Dimension::Month => "Month",
            Dimension::DayOfWeek => "Day",
            Dimension::Hour => "Hour",
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregators
// ---------------------------------------------------------------------------

fn rows<'a>(
    incidents: &'a [Incident],
    selected: &'a [usize],
) -> impl Iterator<Item = &'a Incident> + 'a {
    selected.iter().map(move |&i| &incidents[i])
}

/// Count rows per offense code group in first-seen order, then sort by
/// count descending. The sort is stable so ties keep first-seen order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> CountTable {
    let mut order: CountTable = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in values {
        match index.get(value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.to_string(), order.len());
                order.push((value.to_string(), 1));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

/// Group the subset by `dimension` and count rows per group.
///
/// Calendar and hour dimensions produce the full canonical domain in display
/// order (zero counts included); Year produces the observed years ascending.
pub fn dimension_count(
    incidents: &[Incident],
    selected: &[usize],
    dimension: Dimension,
) -> CountTable {
    match dimension {
        Dimension::Year => {
            let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
            for inc in rows(incidents, selected) {
                *by_year.entry(inc.date.year()).or_insert(0) += 1;
            }
            by_year
                .into_iter()
                .map(|(year, count)| (year.to_string(), count))
                .collect()
        }
        Dimension::Month => {
            let mut counts = [0u64; 12];
            for inc in rows(incidents, selected) {
                counts[inc.month.index()] += 1;
            }
            Month::ALL
                .iter()
                .map(|m| (m.label().to_string(), counts[m.index()]))
                .collect()
        }
        Dimension::DayOfWeek => {
            let mut counts = [0u64; 7];
            for inc in rows(incidents, selected) {
                counts[inc.day_of_week.index()] += 1;
            }
            Weekday::ALL
                .iter()
                .map(|d| (d.label().to_string(), counts[d.index()]))
                .collect()
        }
        Dimension::Hour => {
            let mut counts = [0u64; 24];
            for inc in rows(incidents, selected) {
                counts[inc.hour.min(23) as usize] += 1;
            }
            counts
                .iter()
                .enumerate()
                .map(|(hour, &count)| (hour.to_string(), count))
                .collect()
        }
    }
}

/// The `n` most frequent offense code groups, descending by count, ties
/// broken by first-encountered order. `n` outside `[TOP_N_MIN, TOP_N_MAX]`
/// yields an empty table.
pub fn top_offense_groups(incidents: &[Incident], selected: &[usize], n: usize) -> CountTable {
    if !(TOP_N_MIN..=TOP_N_MAX).contains(&n) {
        return Vec::new();
    }
    let mut table = value_counts(
        rows(incidents, selected).filter_map(|inc| inc.offense_group.as_deref()),
    );
    table.truncate(n);
    table
}

/// Count rows per crime class, descending. Rows without a class never form
/// a category and so drop out of the denominator.
pub fn crime_class_counts(incidents: &[Incident], selected: &[usize]) -> CountTable {
    value_counts(rows(incidents, selected).filter_map(|inc| inc.crime_class.as_deref()))
}

/// Count rows per shooting flag value, descending. Rows with an unknown
/// flag are excluded.
pub fn shooting_counts(incidents: &[Incident], selected: &[usize]) -> CountTable {
    value_counts(
        rows(incidents, selected)
            .filter_map(|inc| inc.shooting.map(|s| if s { "Yes" } else { "No" })),
    )
}

/// Month rows (12) × weekday columns (7), dense.
pub fn day_month_pivot(incidents: &[Incident], selected: &[usize]) -> PivotTable {
    let mut cells = vec![vec![0u64; Weekday::ALL.len()]; Month::ALL.len()];
    for inc in rows(incidents, selected) {
        cells[inc.month.index()][inc.day_of_week.index()] += 1;
    }
    PivotTable {
        row_labels: Month::ALL.iter().map(|m| m.label().to_string()).collect(),
        col_labels: Weekday::ALL.iter().map(|d| d.label().to_string()).collect(),
        cells,
    }
}

/// Hour rows (24) × weekday columns (7), dense.
pub fn day_hour_pivot(incidents: &[Incident], selected: &[usize]) -> PivotTable {
    let mut cells = vec![vec![0u64; Weekday::ALL.len()]; 24];
    for inc in rows(incidents, selected) {
        cells[inc.hour.min(23) as usize][inc.day_of_week.index()] += 1;
    }
    PivotTable {
        row_labels: (0..24).map(|h| h.to_string()).collect(),
        col_labels: Weekday::ALL.iter().map(|d| d.label().to_string()).collect(),
        cells,
    }
}

/// Count incidents per calendar date ascending and compute a trailing
/// moving average of `window` days over the ordered counts. The first
/// `window - 1` entries carry no average since fewer than `window` periods
/// are available.
pub fn daily_series(
    incidents: &[Incident],
    selected: &[usize],
    mode: DailySeriesMode,
    window: usize,
) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for inc in rows(incidents, selected) {
        *by_date.entry(inc.date).or_insert(0) += 1;
    }
    if by_date.is_empty() {
        return Vec::new();
    }

    let counts: Vec<(NaiveDate, u64)> = match mode {
        DailySeriesMode::Sparse => by_date.iter().map(|(&d, &c)| (d, c)).collect(),
        DailySeriesMode::Dense => {
            // Safe: by_date is non-empty here.
            let first = *by_date.keys().next().unwrap_or(&NaiveDate::default());
            let last = *by_date.keys().next_back().unwrap_or(&NaiveDate::default());
            let mut filled = Vec::new();
            let mut day = first;
            loop {
                filled.push((day, by_date.get(&day).copied().unwrap_or(0)));
                if day >= last {
                    break;
                }
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
            filled
        }
    };

    counts
        .iter()
        .enumerate()
        .map(|(i, &(date, count))| {
            let moving_avg = (window > 0 && i + 1 >= window).then(|| {
                let sum: u64 = counts[i + 1 - window..=i].iter().map(|(_, c)| c).sum();
                sum as f64 / window as f64
            });
            DailyPoint {
                date,
                count,
                moving_avg,
            }
        })
        .collect()
}

/// Count filtered incidents per region identifier and left-join onto the
/// full neighborhood set: exactly one output row per polygon, zero count
/// when nothing matched. Region 0 ("unknown") is excluded before the join.
pub fn region_counts(
    incidents: &[Incident],
    selected: &[usize],
    neighborhoods: &[Neighborhood],
) -> Vec<RegionCount> {
    let mut counts: HashMap<i64, u64> = HashMap::new();
    for inc in rows(incidents, selected) {
        if inc.region_id != UNKNOWN_REGION {
            *counts.entry(inc.region_id).or_insert(0) += 1;
        }
    }
    neighborhoods
        .iter()
        .map(|n| RegionCount {
            region_id: n.region_id,
            name: n.name.clone(),
            count: counts.get(&n.region_id).copied().unwrap_or(0),
        })
        .collect()
}

/// Unique non-missing offense code groups of the subset, first-seen order.
/// Feeds the offense-type dropdown.
pub fn offense_group_options(incidents: &[Incident], selected: &[usize]) -> Vec<String> {
    let mut options = Vec::new();
    for inc in rows(incidents, selected) {
        if let Some(group) = &inc.offense_group {
            if !options.contains(group) {
                options.push(group.clone());
            }
        }
    }
    options
}

// ---------------------------------------------------------------------------
// Output groups – one pure function per group of charts
// ---------------------------------------------------------------------------

/// Everything the Overview tab renders. The offense-type predicate does not
/// apply to this group.
#[derive(Debug, Clone, Default)]
pub struct OverviewTables {
    pub dimension_counts: CountTable,
    pub top_offense_groups: CountTable,
    pub crime_class_counts: CountTable,
    pub shooting_counts: CountTable,
    pub region_counts: Vec<RegionCount>,
}

pub fn overview_tables(
    dataset: &CrimeDataset,
    selection: &Selection,
    dimension: Dimension,
    top_n: usize,
) -> OverviewTables {
    let base = selection.without_offense();
    let selected = filter_incidents(&dataset.incidents, &base);
    OverviewTables {
        dimension_counts: dimension_count(&dataset.incidents, &selected, dimension),
        top_offense_groups: top_offense_groups(&dataset.incidents, &selected, top_n),
        crime_class_counts: crime_class_counts(&dataset.incidents, &selected),
        shooting_counts: shooting_counts(&dataset.incidents, &selected),
        region_counts: region_counts(&dataset.incidents, &selected, &dataset.neighborhoods),
    }
}

/// Everything the offense-type tab renders, filtered with the offense-group
/// predicate applied.
#[derive(Debug, Clone, Default)]
pub struct OffenseTables {
    /// Offense-filtered row indices (drives the scatter map).
    pub rows: Vec<usize>,
    pub daily: Vec<DailyPoint>,
    pub day_month: PivotTable,
    pub day_hour: PivotTable,
}

pub fn offense_tables(
    dataset: &CrimeDataset,
    selection: &Selection,
    mode: DailySeriesMode,
) -> OffenseTables {
    let selected = filter_incidents(&dataset.incidents, selection);
    OffenseTables {
        daily: daily_series(&dataset.incidents, &selected, mode, MOVING_AVG_WINDOW),
        day_month: day_month_pivot(&dataset.incidents, &selected),
        day_hour: day_hour_pivot(&dataset.incidents, &selected),
        rows: selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Boundary, GeoPoint};
    use std::collections::BTreeSet;

    fn incident(date: &str, hour: u8) -> Incident {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Incident {
            date,
            hour,
            day_of_week: Weekday::from_chrono(date.weekday()),
            month: Month::from_date(date),
            ucr: Some("Part One".to_string()),
            offense_group: Some("Larceny".to_string()),
            offense_description: String::new(),
            crime_class: None,
            shooting: None,
            neighborhood: Some("Back Bay".to_string()),
            region_id: UNKNOWN_REGION,
            street: String::new(),
            location: Some(GeoPoint {
                lat: 42.35,
                lon: -71.08,
            }),
        }
    }

    fn with_group(date: &str, group: &str) -> Incident {
        Incident {
            offense_group: Some(group.to_string()),
            ..incident(date, 12)
        }
    }

    fn all_rows(incidents: &[Incident]) -> Vec<usize> {
        (0..incidents.len()).collect()
    }

    fn neighborhood(region_id: i64, name: &str) -> Neighborhood {
        Neighborhood {
            region_id,
            name: name.to_string(),
            boundary: Boundary::default(),
        }
    }

    #[test]
    fn dimension_count_sums_to_total() {
        let incidents: Vec<Incident> = (1..=28)
            .map(|d| incident(&format!("2018-02-{d:02}"), (d % 24) as u8))
            .collect();
        let selected = all_rows(&incidents);
        for dim in Dimension::ALL {
            let total: u64 = dimension_count(&incidents, &selected, dim)
                .iter()
                .map(|(_, c)| c)
                .sum();
            assert_eq!(total, incidents.len() as u64, "{dim:?}");
        }
    }

    #[test]
    fn calendar_dimensions_are_dense_and_in_display_order() {
        let incidents = vec![incident("2018-01-01", 5)];
        let selected = all_rows(&incidents);

        let by_day = dimension_count(&incidents, &selected, Dimension::DayOfWeek);
        assert_eq!(by_day.len(), 7);
        assert_eq!(by_day[0], ("Sunday".to_string(), 0));
        assert_eq!(by_day[1], ("Monday".to_string(), 1));
        assert!(by_day[2..].iter().all(|(_, c)| *c == 0));

        let by_month = dimension_count(&incidents, &selected, Dimension::Month);
        assert_eq!(by_month.len(), 12);
        assert_eq!(by_month[0], ("Jan".to_string(), 1));

        let by_hour = dimension_count(&incidents, &selected, Dimension::Hour);
        assert_eq!(by_hour.len(), 24);
        assert_eq!(by_hour[5], ("5".to_string(), 1));
    }

    #[test]
    fn years_are_ascending_and_observed_only() {
        let incidents = vec![
            incident("2019-05-01", 1),
            incident("2017-05-01", 1),
            incident("2019-06-01", 1),
        ];
        let selected = all_rows(&incidents);
        let by_year = dimension_count(&incidents, &selected, Dimension::Year);
        assert_eq!(
            by_year,
            vec![("2017".to_string(), 1), ("2019".to_string(), 2)]
        );
    }

    #[test]
    fn top_n_breaks_ties_by_first_seen_order() {
        // A:10, B:7, C:7, D:3, E:1, F:1, interleaved so first-seen order
        // of the tied groups is B before C and E before F.
        let mut incidents = Vec::new();
        let mut push = |group: &str, n: usize| {
            for _ in 0..n {
                incidents.push(with_group("2018-01-01", group));
            }
        };
        push("A", 4);
        push("B", 7);
        push("C", 7);
        push("A", 6);
        push("D", 3);
        push("E", 1);
        push("F", 1);

        let selected = all_rows(&incidents);
        let top = top_offense_groups(&incidents, &selected, 5);
        let expected: CountTable = vec![
            ("A".to_string(), 10),
            ("B".to_string(), 7),
            ("C".to_string(), 7),
            ("D".to_string(), 3),
            ("E".to_string(), 1),
        ];
        assert_eq!(top, expected);
    }

    #[test]
    fn top_n_outside_bounds_is_empty() {
        let incidents = vec![with_group("2018-01-01", "A")];
        let selected = all_rows(&incidents);
        assert!(top_offense_groups(&incidents, &selected, 2).is_empty());
        assert!(top_offense_groups(&incidents, &selected, 16).is_empty());
        assert_eq!(top_offense_groups(&incidents, &selected, 3).len(), 1);
    }

    #[test]
    fn proportions_exclude_missing_values() {
        let mut a = incident("2018-01-01", 1);
        a.crime_class = Some("Violent".to_string());
        a.shooting = Some(true);
        let mut b = incident("2018-01-02", 1);
        b.crime_class = Some("Property".to_string());
        b.shooting = Some(false);
        let c = incident("2018-01-03", 1); // class and shooting both unknown
        let mut d = incident("2018-01-04", 1);
        d.crime_class = Some("Violent".to_string());
        d.shooting = Some(false);

        let incidents = vec![a, b, c, d];
        let selected = all_rows(&incidents);

        let classes = crime_class_counts(&incidents, &selected);
        assert_eq!(
            classes,
            vec![("Violent".to_string(), 2), ("Property".to_string(), 1)]
        );

        let shootings = shooting_counts(&incidents, &selected);
        assert_eq!(shootings, vec![("No".to_string(), 2), ("Yes".to_string(), 1)]);
    }

    #[test]
    fn pivots_are_dense_and_sum_to_row_count() {
        let incidents: Vec<Incident> = (1..=31)
            .map(|d| incident(&format!("2018-03-{d:02}"), (d % 24) as u8))
            .collect();
        let selected = all_rows(&incidents);

        let dm = day_month_pivot(&incidents, &selected);
        assert_eq!(dm.cells.len(), 12);
        assert!(dm.cells.iter().all(|row| row.len() == 7));
        assert_eq!(dm.total(), 31);

        let dh = day_hour_pivot(&incidents, &selected);
        assert_eq!(dh.cells.len(), 24);
        assert!(dh.cells.iter().all(|row| row.len() == 7));
        assert_eq!(dh.total(), 31);
    }

    #[test]
    fn empty_selection_degrades_to_zero_output() {
        let incidents = vec![incident("2018-01-01", 1)];
        let selected: Vec<usize> = Vec::new();
        assert!(top_offense_groups(&incidents, &selected, 5).is_empty());
        assert_eq!(day_month_pivot(&incidents, &selected).total(), 0);
        assert_eq!(day_month_pivot(&incidents, &selected).cells.len(), 12);
        assert!(daily_series(&incidents, &selected, DailySeriesMode::Dense, 14).is_empty());
    }

    #[test]
    fn moving_average_is_undefined_below_a_full_window() {
        let incidents: Vec<Incident> = (1..=13)
            .map(|d| incident(&format!("2018-01-{d:02}"), 1))
            .collect();
        let selected = all_rows(&incidents);
        let series = daily_series(&incidents, &selected, DailySeriesMode::Dense, 14);
        assert_eq!(series.len(), 13);
        assert!(series.iter().all(|p| p.moving_avg.is_none()));
    }

    #[test]
    fn moving_average_defined_only_at_the_final_entry_of_a_full_window() {
        // Day d carries d incidents, so the mean over days 1..=14 is 7.5.
        let mut incidents = Vec::new();
        for d in 1..=14usize {
            for _ in 0..d {
                incidents.push(incident(&format!("2018-01-{d:02}"), 1));
            }
        }
        let selected = all_rows(&incidents);
        let series = daily_series(&incidents, &selected, DailySeriesMode::Dense, 14);
        assert_eq!(series.len(), 14);
        assert!(series[..13].iter().all(|p| p.moving_avg.is_none()));
        assert_eq!(series[13].moving_avg, Some(7.5));
    }

    #[test]
    fn dense_mode_fills_gaps_and_sparse_keeps_them() {
        let incidents = vec![
            incident("2018-01-01", 1),
            incident("2018-01-01", 2),
            incident("2018-01-05", 3),
        ];
        let selected = all_rows(&incidents);

        let dense = daily_series(&incidents, &selected, DailySeriesMode::Dense, 14);
        assert_eq!(dense.len(), 5);
        assert_eq!(dense[0].count, 2);
        assert_eq!(dense[1].count, 0);
        assert_eq!(dense[4].count, 1);

        let sparse = daily_series(&incidents, &selected, DailySeriesMode::Sparse, 14);
        assert_eq!(sparse.len(), 2);
        assert_eq!(sparse[0].count, 2);
        assert_eq!(sparse[1].count, 1);
    }

    #[test]
    fn region_join_returns_every_polygon_and_never_region_zero() {
        let neighborhoods = vec![
            neighborhood(101, "Back Bay"),
            neighborhood(102, "Roxbury"),
            neighborhood(103, "Fenway"),
        ];
        let mut a = incident("2018-01-01", 1);
        a.region_id = 101;
        let mut b = incident("2018-01-02", 1);
        b.region_id = 101;
        let c = incident("2018-01-03", 1); // region 0, must not join
        let incidents = vec![a, b, c];
        let selected = all_rows(&incidents);

        let joined = region_counts(&incidents, &selected, &neighborhoods);
        assert_eq!(joined.len(), neighborhoods.len());
        assert!(joined.iter().all(|r| r.region_id != UNKNOWN_REGION));
        assert_eq!(joined[0].count, 2);
        assert_eq!(joined[1].count, 0);
        assert_eq!(joined[2].count, 0);
    }

    #[test]
    fn offense_options_are_unique_first_seen() {
        let incidents = vec![
            with_group("2018-01-01", "Larceny"),
            with_group("2018-01-02", "Vandalism"),
            with_group("2018-01-03", "Larceny"),
        ];
        let selected = all_rows(&incidents);
        assert_eq!(
            offense_group_options(&incidents, &selected),
            vec!["Larceny".to_string(), "Vandalism".to_string()]
        );
    }

    #[test]
    fn end_to_end_back_bay_scenario() {
        let mut first = incident("2018-01-01", 10);
        first.ucr = Some("Part One".to_string());
        let mut second = incident("2018-01-01", 11);
        second.ucr = Some("Part Two".to_string());
        let dataset = CrimeDataset::from_parts(vec![first, second], Vec::new()).unwrap();

        let selection = Selection {
            categories: BTreeSet::from(["Part One".to_string()]),
            neighborhoods: BTreeSet::from(["Back Bay".to_string()]),
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 1, 31).unwrap(),
            offense_type: None,
        };
        let selected = filter_incidents(&dataset.incidents, &selection);
        assert_eq!(selected, vec![0]);

        let by_day = dimension_count(&dataset.incidents, &selected, Dimension::DayOfWeek);
        for (label, count) in &by_day {
            let expected = if label == "Monday" { 1 } else { 0 };
            assert_eq!(*count, expected, "{label}");
        }
    }

    #[test]
    fn overview_group_ignores_the_offense_predicate() {
        let incidents = vec![
            with_group("2018-01-01", "Larceny"),
            with_group("2018-01-02", "Vandalism"),
        ];
        let dataset = CrimeDataset::from_parts(incidents, vec![neighborhood(101, "Back Bay")])
            .unwrap();
        let selection = Selection {
            categories: BTreeSet::from(["Part One".to_string()]),
            neighborhoods: BTreeSet::from(["Back Bay".to_string()]),
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 12, 31).unwrap(),
            offense_type: Some("Larceny".to_string()),
        };

        let overview = overview_tables(&dataset, &selection, Dimension::Year, 5);
        let total: u64 = overview.top_offense_groups.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 2);

        let offense = offense_tables(&dataset, &selection, DailySeriesMode::Dense);
        assert_eq!(offense.rows, vec![0]);
        assert_eq!(offense.day_month.total(), 1);
    }
}
