use std::collections::HashMap;

use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Plot, PlotPoints, Points, Polygon};

use crate::color;
use crate::data::aggregate::RegionCount;
use crate::data::model::{Incident, Neighborhood, Ring};

// ---------------------------------------------------------------------------
// Choropleth
// ---------------------------------------------------------------------------

/// Every neighborhood polygon shaded by its incident count. Polygons with a
/// zero count render in the lightest shade rather than disappearing.
pub fn choropleth(
    ui: &mut Ui,
    id: &str,
    neighborhoods: &[Neighborhood],
    counts: &[RegionCount],
    height: f32,
) {
    let by_region: HashMap<i64, &Neighborhood> = neighborhoods
        .iter()
        .map(|n| (n.region_id, n))
        .collect();
    let max = counts.iter().map(|r| r.count).max().unwrap_or(0);

    Plot::new(id.to_string())
        .height(height)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            for region in counts {
                let Some(neighborhood) = by_region.get(&region.region_id) else {
                    continue;
                };
                let t = if max == 0 {
                    0.0
                } else {
                    region.count as f64 / max as f64
                };
                let shade = color::cool_color(t);
                let fill = Color32::from_rgba_unmultiplied(shade.r(), shade.g(), shade.b(), 170);
                for ring in neighborhood.boundary.exteriors() {
                    plot_ui.polygon(
                        Polygon::new(ring_points(ring))
                            .fill_color(fill)
                            .stroke(Stroke::new(0.7, Color32::from_gray(90)))
                            .name(format!("{}: {}", region.name, region.count)),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Scatter map
// ---------------------------------------------------------------------------

/// Incident point locations over the neighborhood outlines. Rows without a
/// location simply don't plot.
pub fn scatter_map(
    ui: &mut Ui,
    id: &str,
    incidents: &[Incident],
    selected: &[usize],
    neighborhoods: &[Neighborhood],
    height: f32,
) {
    let points: PlotPoints = selected
        .iter()
        .filter_map(|&i| incidents[i].location.map(|loc| [loc.lon, loc.lat]))
        .collect();

    Plot::new(id.to_string())
        .height(height)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            for neighborhood in neighborhoods {
                for ring in neighborhood.boundary.exteriors() {
                    plot_ui.polygon(
                        Polygon::new(ring_points(ring))
                            .fill_color(Color32::TRANSPARENT)
                            .stroke(Stroke::new(0.5, Color32::from_gray(120)))
                            .name(neighborhood.name.clone()),
                    );
                }
            }
            plot_ui.points(
                Points::new(points)
                    .radius(2.0)
                    .color(Color32::from_rgb(200, 60, 60)),
            );
        });
}

fn ring_points(ring: &Ring) -> PlotPoints {
    ring.iter().map(|&[lon, lat]| [lon, lat]).collect()
}
