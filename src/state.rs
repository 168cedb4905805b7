use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::data::aggregate::{
    self, DailySeriesMode, Dimension, OffenseTables, OverviewTables,
};
use crate::data::filter::{filter_incidents, Selection};
use crate::data::model::CrimeDataset;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    OffenseAnalysis,
    Data,
}

/// Tables derived from the current selection. Recomputed as a whole on any
/// control change; owned values with no references back into the UI.
#[derive(Debug, Clone, Default)]
pub struct Derived {
    /// Rows matching the selection without the offense-type predicate
    /// (feeds the Data tab and the status line).
    pub base_rows: Vec<usize>,
    /// Offense-type dropdown options for the current base rows.
    pub offense_options: Vec<String>,
    pub overview: OverviewTables,
    pub offense: OffenseTables,
}

/// The full UI state: the immutable loaded dataset, the current control
/// selection, and the derived tables cached until the next control change.
pub struct AppState {
    dataset: CrimeDataset,
    selection: Selection,
    dimension: Dimension,
    top_n: usize,
    series_mode: DailySeriesMode,
    derived: Derived,
    dirty: bool,

    pub active_tab: Tab,
    pub table_page: usize,
}

impl AppState {
    /// Initial selection mirrors the dashboard defaults: first UCR class,
    /// first two neighborhoods, the full observed date span.
    pub fn new(dataset: CrimeDataset) -> Self {
        let mut categories = BTreeSet::new();
        if let Some(first) = dataset.ucr_options.first() {
            categories.insert(first.clone());
        }
        let neighborhoods: BTreeSet<String> = dataset
            .neighborhood_options
            .iter()
            .take(2)
            .cloned()
            .collect();
        let (start, end) = dataset.date_span;

        let mut state = AppState {
            dataset,
            selection: Selection {
                categories,
                neighborhoods,
                start,
                end,
                offense_type: None,
            },
            dimension: Dimension::Year,
            top_n: 5,
            series_mode: DailySeriesMode::Dense,
            derived: Derived::default(),
            dirty: true,
            active_tab: Tab::Overview,
            table_page: 0,
        };
        state.recompute_if_dirty();
        state
    }

    pub fn dataset(&self) -> &CrimeDataset {
        &self.dataset
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn series_mode(&self) -> DailySeriesMode {
        self.series_mode
    }

    // -- Control mutations; each marks the derived tables stale --

    pub fn toggle_category(&mut self, value: &str) {
        if !self.selection.categories.remove(value) {
            self.selection.categories.insert(value.to_string());
        }
        self.dirty = true;
    }

    pub fn select_all_categories(&mut self) {
        self.selection.categories = self.dataset.ucr_options.iter().cloned().collect();
        self.dirty = true;
    }

    pub fn select_no_categories(&mut self) {
        self.selection.categories.clear();
        self.dirty = true;
    }

    pub fn toggle_neighborhood(&mut self, value: &str) {
        if !self.selection.neighborhoods.remove(value) {
            self.selection.neighborhoods.insert(value.to_string());
        }
        self.dirty = true;
    }

    pub fn select_all_neighborhoods(&mut self) {
        self.selection.neighborhoods = self.dataset.neighborhood_options.iter().cloned().collect();
        self.dirty = true;
    }

    pub fn select_no_neighborhoods(&mut self) {
        self.selection.neighborhoods.clear();
        self.dirty = true;
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        if self.selection.start != start || self.selection.end != end {
            self.selection.start = start;
            self.selection.end = end;
            self.dirty = true;
        }
    }

    pub fn set_offense_type(&mut self, offense_type: Option<String>) {
        if self.selection.offense_type != offense_type {
            self.selection.offense_type = offense_type;
            self.dirty = true;
        }
    }

    pub fn set_dimension(&mut self, dimension: Dimension) {
        if self.dimension != dimension {
            self.dimension = dimension;
            self.dirty = true;
        }
    }

    pub fn set_top_n(&mut self, top_n: usize) {
        if self.top_n != top_n {
            self.top_n = top_n;
            self.dirty = true;
        }
    }

    pub fn set_series_mode(&mut self, mode: DailySeriesMode) {
        if self.series_mode != mode {
            self.series_mode = mode;
            self.dirty = true;
        }
    }

    /// Recompute every derived table from the immutable dataset when any
    /// control changed since the last frame. One fresh, bounded,
    /// synchronous pass; nothing survives from the previous cycle.
    pub fn recompute_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let base_selection = self.selection.without_offense();
        let base_rows = filter_incidents(&self.dataset.incidents, &base_selection);
        let offense_options = aggregate::offense_group_options(&self.dataset.incidents, &base_rows);

        // Keep the chosen offense type while the filtered subset still
        // offers it; otherwise fall back to the first option.
        let keep = self
            .selection
            .offense_type
            .as_ref()
            .is_some_and(|t| offense_options.contains(t));
        if !keep {
            self.selection.offense_type = offense_options.first().cloned();
        }

        let overview =
            aggregate::overview_tables(&self.dataset, &self.selection, self.dimension, self.top_n);
        let offense =
            aggregate::offense_tables(&self.dataset, &self.selection, self.series_mode);

        self.derived = Derived {
            base_rows,
            offense_options,
            overview,
            offense,
        };
        self.table_page = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Boundary, Incident, Month, Neighborhood, Weekday, UNKNOWN_REGION};
    use chrono::Datelike;

    fn incident(date: &str, ucr: &str, group: &str, name: &str) -> Incident {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Incident {
            date,
            hour: 12,
            day_of_week: Weekday::from_chrono(date.weekday()),
            month: Month::from_date(date),
            ucr: Some(ucr.to_string()),
            offense_group: Some(group.to_string()),
            offense_description: String::new(),
            crime_class: None,
            shooting: None,
            neighborhood: Some(name.to_string()),
            region_id: UNKNOWN_REGION,
            street: String::new(),
            location: None,
        }
    }

    fn dataset() -> CrimeDataset {
        CrimeDataset::from_parts(
            vec![
                incident("2018-01-01", "Part One", "Larceny", "Back Bay"),
                incident("2018-02-01", "Part One", "Vandalism", "Back Bay"),
                incident("2018-03-01", "Part Two", "Robbery", "Roxbury"),
            ],
            vec![Neighborhood {
                region_id: 101,
                name: "Back Bay".to_string(),
                boundary: Boundary::default(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn defaults_follow_the_dataset() {
        let state = AppState::new(dataset());
        assert!(state.selection().categories.contains("Part One"));
        assert_eq!(state.selection().neighborhoods.len(), 2);
        assert_eq!(
            state.selection().start,
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
        );
        // The offense dropdown settles on the first derived option.
        assert_eq!(state.selection().offense_type.as_deref(), Some("Larceny"));
        assert_eq!(state.derived().base_rows.len(), 2);
    }

    #[test]
    fn control_changes_recompute_derived_tables() {
        let mut state = AppState::new(dataset());
        assert_eq!(state.derived().base_rows.len(), 2);

        state.toggle_category("Part Two");
        state.recompute_if_dirty();
        assert_eq!(state.derived().base_rows.len(), 3);

        state.select_no_neighborhoods();
        state.recompute_if_dirty();
        assert!(state.derived().base_rows.is_empty());
        assert!(state.derived().offense_options.is_empty());
    }

    #[test]
    fn stale_offense_choice_falls_back_to_first_option() {
        let mut state = AppState::new(dataset());
        state.set_offense_type(Some("Vandalism".to_string()));
        state.recompute_if_dirty();
        assert_eq!(state.selection().offense_type.as_deref(), Some("Vandalism"));

        // Narrow the range so Vandalism disappears from the subset.
        state.set_date_range(
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 1, 31).unwrap(),
        );
        state.recompute_if_dirty();
        assert_eq!(state.selection().offense_type.as_deref(), Some("Larceny"));
    }

    #[test]
    fn recompute_is_a_no_op_while_clean() {
        let mut state = AppState::new(dataset());
        let before = state.derived().base_rows.clone();
        state.recompute_if_dirty();
        assert_eq!(state.derived().base_rows, before);
    }
}
