use eframe::egui::{self, Color32, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::aggregate::{DailySeriesMode, Dimension, TOP_N_MAX, TOP_N_MIN};
use crate::state::AppState;
use crate::ui::{charts, map};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

pub fn top_bar(ui: &mut Ui, state: &AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong("Crime Atlas");
        ui.separator();
        ui.label(format!(
            "{} reports loaded, {} matching",
            state.dataset().len(),
            state.derived().base_rows.len()
        ));
        ui.separator();
        let (first, last) = state.dataset().date_span;
        ui.label(format!("dataset spans {first} – {last}"));
    });
}

// ---------------------------------------------------------------------------
// Control strip – the global filters
// ---------------------------------------------------------------------------

pub fn control_strip(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        category_dropdown(ui, state);
        neighborhood_dropdown(ui, state);

        ui.separator();
        ui.label("From");
        let mut start = state.selection().start;
        let start_changed = ui
            .add(DatePickerButton::new(&mut start).id_salt("start_date"))
            .changed();
        ui.label("to");
        let mut end = state.selection().end;
        let end_changed = ui
            .add(DatePickerButton::new(&mut end).id_salt("end_date"))
            .changed();
        if start_changed || end_changed {
            state.set_date_range(start, end);
        }
    });
}

fn category_dropdown(ui: &mut Ui, state: &mut AppState) {
    let options = state.dataset().ucr_options.clone();
    let selected = state.selection().categories.len();
    egui::ComboBox::from_id_salt("ucr_category")
        .selected_text(format!("UCR category ({selected}/{})", options.len()))
        .width(190.0)
        .show_ui(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_categories();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_categories();
                }
            });
            for option in &options {
                let mut checked = state.selection().categories.contains(option);
                if ui.checkbox(&mut checked, option).changed() {
                    state.toggle_category(option);
                }
            }
        });
}

fn neighborhood_dropdown(ui: &mut Ui, state: &mut AppState) {
    let options = state.dataset().neighborhood_options.clone();
    let selected = state.selection().neighborhoods.len();
    egui::ComboBox::from_id_salt("neighborhood")
        .selected_text(format!("Neighbourhood ({selected}/{})", options.len()))
        .width(220.0)
        .show_ui(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_neighborhoods();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_neighborhoods();
                }
            });
            ScrollArea::vertical()
                .max_height(260.0)
                .show(ui, |ui: &mut Ui| {
                    for option in &options {
                        let mut checked = state.selection().neighborhoods.contains(option);
                        if ui.checkbox(&mut checked, option).changed() {
                            state.toggle_neighborhood(option);
                        }
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Overview tab
// ---------------------------------------------------------------------------

pub fn overview_tab(ui: &mut Ui, state: &mut AppState) {
    ui.columns(3, |cols: &mut [Ui]| {
        aggregation_column(&mut cols[0], state);
        proportion_column(&mut cols[1], state);
        choropleth_column(&mut cols[2], state);
    });
}

fn aggregation_column(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong("AGGREGATION OF CRIME REPORTS");
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Aggregate by");
        let current = state.dimension();
        egui::ComboBox::from_id_salt("agg_dimension")
            .selected_text(current.label())
            .show_ui(ui, |ui: &mut Ui| {
                for dimension in Dimension::ALL {
                    if ui
                        .selectable_label(current == dimension, dimension.label())
                        .clicked()
                    {
                        state.set_dimension(dimension);
                    }
                }
            });
    });
    charts::count_bar_chart(
        ui,
        "agg_bar",
        &state.derived().overview.dimension_counts,
        Color32::from_rgb(255, 160, 122),
        260.0,
    );

    ui.separator();
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong("TOP CRIME CATEGORIES");
    });
    let mut top_n = state.top_n();
    if ui
        .add(egui::Slider::new(&mut top_n, TOP_N_MIN..=TOP_N_MAX).text("categories"))
        .changed()
    {
        state.set_top_n(top_n);
    }
    charts::ranked_bar_chart(
        ui,
        "top_groups_bar",
        &state.derived().overview.top_offense_groups,
        Color32::from_rgb(205, 92, 92),
        260.0,
    );
}

fn proportion_column(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong("PROPORTION OF CRIME CLASSES");
    });
    charts::donut_chart(ui, &state.derived().overview.crime_class_counts, 200.0);

    ui.separator();
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong("PROPORTION OF SHOOTING INCIDENTS");
    });
    charts::donut_chart(ui, &state.derived().overview.shooting_counts, 200.0);
}

fn choropleth_column(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong("CRIME COUNTS BY GEOGRAPHICAL REGION");
    });
    map::choropleth(
        ui,
        "choropleth",
        &state.dataset().neighborhoods,
        &state.derived().overview.region_counts,
        560.0,
    );
}

// ---------------------------------------------------------------------------
// Analysis-by-offense-type tab
// ---------------------------------------------------------------------------

pub fn offense_tab(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Offense type");
        offense_dropdown(ui, state);
        ui.separator();
        let mut dense = state.series_mode() == DailySeriesMode::Dense;
        if ui
            .checkbox(&mut dense, "Include zero-incident days in the daily series")
            .changed()
        {
            state.set_series_mode(if dense {
                DailySeriesMode::Dense
            } else {
                DailySeriesMode::Sparse
            });
        }
    });
    ui.add_space(4.0);

    ui.columns(2, |cols: &mut [Ui]| {
        {
            let ui = &mut cols[0];
            ui.vertical_centered(|ui: &mut Ui| {
                ui.strong("GEOSPATIAL ANALYSIS");
            });
            map::scatter_map(
                ui,
                "scatter_map",
                &state.dataset().incidents,
                &state.derived().offense.rows,
                &state.dataset().neighborhoods,
                560.0,
            );
        }
        {
            let ui = &mut cols[1];
            ui.vertical_centered(|ui: &mut Ui| {
                ui.strong("TIME-SERIES ANALYSIS");
            });
            charts::time_series(ui, "daily_series", &state.derived().offense.daily, 240.0);

            ui.separator();
            ui.vertical_centered(|ui: &mut Ui| {
                ui.strong("HEATMAP ANALYSIS");
            });
            ui.columns(2, |heatmaps: &mut [Ui]| {
                charts::heatmap(&mut heatmaps[0], &state.derived().offense.day_month, 260.0);
                charts::heatmap(&mut heatmaps[1], &state.derived().offense.day_hour, 260.0);
            });
        }
    });
}

fn offense_dropdown(ui: &mut Ui, state: &mut AppState) {
    let options = state.derived().offense_options.clone();
    let current = state.selection().offense_type.clone();
    let label = current.clone().unwrap_or_else(|| "–".to_string());
    egui::ComboBox::from_id_salt("offense_type")
        .selected_text(label)
        .width(260.0)
        .show_ui(ui, |ui: &mut Ui| {
            for option in &options {
                if ui
                    .selectable_label(current.as_deref() == Some(option.as_str()), option)
                    .clicked()
                {
                    state.set_offense_type(Some(option.clone()));
                }
            }
        });
}
