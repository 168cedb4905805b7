mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::CrimeAtlasApp;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let incidents_path =
        PathBuf::from(args.next().unwrap_or_else(|| "data/incidents.csv".to_string()));
    let neighborhoods_path = PathBuf::from(
        args.next()
            .unwrap_or_else(|| "data/neighborhoods.geojson".to_string()),
    );

    // One-shot load; any failure aborts before the window opens.
    let dataset = data::loader::load_dataset(&incidents_path, &neighborhoods_path)
        .context("startup data load failed")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Crime Atlas – Incident Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(CrimeAtlasApp::new(dataset)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe: {e}"))
}
