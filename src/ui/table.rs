use eframe::egui::{Align, Layout, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::{Incident, UNKNOWN_REGION};
use crate::state::AppState;

const PAGE_SIZE: usize = 15;

const HEADERS: [&str; 10] = [
    "Date",
    "Time",
    "Day",
    "UCR Class",
    "Offense Code Group",
    "Offense Description",
    "Shooting?",
    "Neighbourhood",
    "GEOID10",
    "Incident Location",
];

// ---------------------------------------------------------------------------
// Paginated data table
// ---------------------------------------------------------------------------

/// The filtered rows, 15 per page.
pub fn data_table(ui: &mut Ui, state: &mut AppState) {
    let total = state.derived().base_rows.len();
    let page_count = total.div_ceil(PAGE_SIZE).max(1);
    if state.table_page >= page_count {
        state.table_page = page_count - 1;
    }

    ui.horizontal(|ui| {
        if ui.button("Prev").clicked() && state.table_page > 0 {
            state.table_page -= 1;
        }
        ui.label(format!("Page {} / {page_count}", state.table_page + 1));
        if ui.button("Next").clicked() && state.table_page + 1 < page_count {
            state.table_page += 1;
        }
        ui.separator();
        ui.label(format!("{total} matching reports"));
    });
    ui.add_space(4.0);

    let page_rows: Vec<usize> = state
        .derived()
        .base_rows
        .iter()
        .skip(state.table_page * PAGE_SIZE)
        .take(PAGE_SIZE)
        .copied()
        .collect();
    let incidents = &state.dataset().incidents;

    TableBuilder::new(ui)
        .striped(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .columns(Column::auto().resizable(true), HEADERS.len() - 1)
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, page_rows.len(), |mut row| {
                let incident = &incidents[page_rows[row.index()]];
                for cell in row_cells(incident) {
                    row.col(|ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}

fn row_cells(incident: &Incident) -> [String; 10] {
    [
        incident.date.to_string(),
        format!("{:02}:00", incident.hour),
        incident.day_of_week.label().to_string(),
        display_opt(incident.ucr.as_deref()),
        display_opt(incident.offense_group.as_deref()),
        incident.offense_description.clone(),
        match incident.shooting {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => "–".to_string(),
        },
        display_opt(incident.neighborhood.as_deref()),
        if incident.region_id == UNKNOWN_REGION {
            "–".to_string()
        } else {
            incident.region_id.to_string()
        },
        incident.street.clone(),
    ]
}

fn display_opt(value: Option<&str>) -> String {
    value.unwrap_or("–").to_string()
}
