use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::Incident;

// ---------------------------------------------------------------------------
// Selection – the current state of the filter controls
// ---------------------------------------------------------------------------

/// Everything the filter controls can express. One value of this struct
/// fully determines a filtered subset; filtering is pure and idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected UCR classes. Empty means "nothing selected" and matches
    /// no rows (not "all rows").
    pub categories: BTreeSet<String>,
    /// Selected neighborhood names. Empty matches no rows.
    pub neighborhoods: BTreeSet<String>,
    /// Inclusive start of the date range.
    pub start: NaiveDate,
    /// Inclusive end of the date range. `start > end` matches no rows.
    pub end: NaiveDate,
    /// When set, rows must match this offense code group exactly.
    pub offense_type: Option<String>,
}

impl Selection {
    /// The same selection with the offense-type predicate removed.
    pub fn without_offense(&self) -> Selection {
        Selection {
            offense_type: None,
            ..self.clone()
        }
    }

    /// Whether one incident passes every active predicate.
    pub fn matches(&self, incident: &Incident) -> bool {
        let in_categories = incident
            .ucr
            .as_ref()
            .is_some_and(|ucr| self.categories.contains(ucr));
        let in_neighborhoods = incident
            .neighborhood
            .as_ref()
            .is_some_and(|name| self.neighborhoods.contains(name));
        let in_range = self.start <= incident.date && incident.date <= self.end;
        let offense_ok = match &self.offense_type {
            Some(group) => incident.offense_group.as_deref() == Some(group.as_str()),
            None => true,
        };
        in_categories && in_neighborhoods && in_range && offense_ok
    }
}

/// Return indices of incidents that pass all predicates of `selection`.
///
/// The conjunction over category membership, neighborhood membership, the
/// inclusive date range, and (when present) offense-group equality. Rows
/// with a missing UCR or neighborhood never match the membership
/// predicates.
pub fn filter_incidents(incidents: &[Incident], selection: &Selection) -> Vec<usize> {
    incidents
        .iter()
        .enumerate()
        .filter(|(_, incident)| selection.matches(incident))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Month, Weekday, UNKNOWN_REGION};
    use chrono::Datelike;

    fn incident(date: &str, ucr: &str, group: &str, name: &str) -> Incident {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Incident {
            date,
            hour: 12,
            day_of_week: Weekday::from_chrono(date.weekday()),
            month: Month::from_date(date),
            ucr: (!ucr.is_empty()).then(|| ucr.to_string()),
            offense_group: (!group.is_empty()).then(|| group.to_string()),
            offense_description: String::new(),
            crime_class: None,
            shooting: None,
            neighborhood: (!name.is_empty()).then(|| name.to_string()),
            region_id: UNKNOWN_REGION,
            street: String::new(),
            location: None,
        }
    }

    fn selection(categories: &[&str], neighborhoods: &[&str], start: &str, end: &str) -> Selection {
        Selection {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            neighborhoods: neighborhoods.iter().map(|s| s.to_string()).collect(),
            start: NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            end: NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
            offense_type: None,
        }
    }

    fn fixture() -> Vec<Incident> {
        vec![
            incident("2018-01-01", "Part One", "Larceny", "Back Bay"),
            incident("2018-01-15", "Part Two", "Vandalism", "Back Bay"),
            incident("2018-02-01", "Part One", "Larceny", "Roxbury"),
            incident("2018-03-01", "Part One", "Robbery", "Back Bay"),
            incident("2018-03-01", "", "Larceny", "Back Bay"),
            incident("2018-03-01", "Part One", "Larceny", ""),
        ]
    }

    #[test]
    fn predicates_are_conjunctive() {
        let incidents = fixture();
        let sel = selection(&["Part One"], &["Back Bay"], "2018-01-01", "2018-12-31");
        let rows = filter_incidents(&incidents, &sel);
        // Row 1 fails the category, row 2 the neighborhood, rows 4 and 5
        // carry missing values.
        assert_eq!(rows, vec![0, 3]);
        for &i in &rows {
            assert!(sel.matches(&incidents[i]));
        }
    }

    #[test]
    fn filtering_is_idempotent() {
        let incidents = fixture();
        let sel = selection(
            &["Part One", "Part Two"],
            &["Back Bay", "Roxbury"],
            "2018-01-01",
            "2018-12-31",
        );
        let first = filter_incidents(&incidents, &sel);
        let second = filter_incidents(&incidents, &sel);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_category_or_neighborhood_set_matches_nothing() {
        let incidents = fixture();
        let sel = selection(&[], &["Back Bay"], "2018-01-01", "2018-12-31");
        assert!(filter_incidents(&incidents, &sel).is_empty());

        let sel = selection(&["Part One"], &[], "2018-01-01", "2018-12-31");
        assert!(filter_incidents(&incidents, &sel).is_empty());
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let incidents = fixture();
        let sel = selection(
            &["Part One", "Part Two"],
            &["Back Bay"],
            "2018-01-01",
            "2018-01-15",
        );
        assert_eq!(filter_incidents(&incidents, &sel), vec![0, 1]);
    }

    #[test]
    fn inverted_date_range_is_empty_not_an_error() {
        let incidents = fixture();
        let sel = selection(&["Part One"], &["Back Bay"], "2018-12-31", "2018-01-01");
        assert!(filter_incidents(&incidents, &sel).is_empty());
    }

    #[test]
    fn offense_type_is_exact_equality() {
        let incidents = fixture();
        let mut sel = selection(&["Part One"], &["Back Bay"], "2018-01-01", "2018-12-31");
        sel.offense_type = Some("Robbery".to_string());
        assert_eq!(filter_incidents(&incidents, &sel), vec![3]);

        sel.offense_type = Some("Rob".to_string());
        assert!(filter_incidents(&incidents, &sel).is_empty());
    }

    #[test]
    fn without_offense_drops_only_that_predicate() {
        let mut sel = selection(&["Part One"], &["Back Bay"], "2018-01-01", "2018-12-31");
        sel.offense_type = Some("Larceny".to_string());
        let base = sel.without_offense();
        assert_eq!(base.offense_type, None);
        assert_eq!(base.categories, sel.categories);
        assert_eq!(base.start, sel.start);
    }
}
