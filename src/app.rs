use eframe::egui;

use crate::data::model::CrimeDataset;
use crate::state::{AppState, Tab};
use crate::ui::{panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CrimeAtlasApp {
    pub state: AppState,
}

impl CrimeAtlasApp {
    pub fn new(dataset: CrimeDataset) -> Self {
        Self {
            state: AppState::new(dataset),
        }
    }
}

impl eframe::App for CrimeAtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Controls touched last frame marked the derived tables stale;
        // rebuild them before anything renders.
        self.state.recompute_if_dirty();

        // ---- Top panel: title + status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state);
        });

        // ---- Filter controls ----
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            panels::control_strip(ui, &mut self.state);
        });

        // ---- Central panel: tabs ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.state.active_tab, Tab::Overview, "Overview");
                ui.selectable_value(
                    &mut self.state.active_tab,
                    Tab::OffenseAnalysis,
                    "Analysis by Offense Type",
                );
                ui.selectable_value(&mut self.state.active_tab, Tab::Data, "Data");
            });
            ui.separator();

            match self.state.active_tab {
                Tab::Overview => panels::overview_tab(ui, &mut self.state),
                Tab::OffenseAnalysis => panels::offense_tab(ui, &mut self.state),
                Tab::Data => table::data_table(ui, &mut self.state),
            }
        });
    }
}
