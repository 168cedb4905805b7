use std::f32::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use eframe::egui::{
    pos2, Align2, Color32, FontId, Painter, Pos2, Rect, RichText, Sense, Shape, Stroke, Ui, Vec2,
};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints};

use crate::color;
use crate::data::aggregate::{CountTable, DailyPoint, PivotTable};

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Vertical bar chart over an ordered (label, count) table.
pub fn count_bar_chart(ui: &mut Ui, id: &str, table: &CountTable, fill: Color32, height: f32) {
    if table.is_empty() {
        no_data(ui, height);
        return;
    }
    let labels: Vec<String> = table.iter().map(|(label, _)| label.clone()).collect();
    let bars: Vec<Bar> = table
        .iter()
        .enumerate()
        .map(|(i, (_, count))| Bar::new(i as f64, *count as f64).width(0.7).fill(fill))
        .collect();

    Plot::new(id.to_string())
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            index_label(&labels, mark.value)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

/// Horizontal bar chart, first table row drawn at the top.
pub fn ranked_bar_chart(ui: &mut Ui, id: &str, table: &CountTable, fill: Color32, height: f32) {
    if table.is_empty() {
        no_data(ui, height);
        return;
    }
    let n = table.len();
    let labels: Vec<String> = table.iter().map(|(label, _)| label.clone()).collect();
    let bars: Vec<Bar> = table
        .iter()
        .enumerate()
        .map(|(i, (_, count))| {
            Bar::new((n - 1 - i) as f64, *count as f64).width(0.6).fill(fill)
        })
        .collect();

    Plot::new(id.to_string())
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .y_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let rounded = mark.value.round();
            if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
                return String::new();
            }
            let idx = rounded as usize;
            if idx < n {
                truncate_label(&labels[n - 1 - idx], 18)
            } else {
                String::new()
            }
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

fn index_label(labels: &[String], value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_chars - 1).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Donut charts
// ---------------------------------------------------------------------------

/// Donut (ring) chart with a legend underneath. Proportions come straight
/// from the raw counts.
pub fn donut_chart(ui: &mut Ui, table: &CountTable, size: f32) {
    let total: u64 = table.iter().map(|(_, count)| count).sum();
    if total == 0 {
        no_data(ui, size);
        return;
    }
    let colors = color::categorical_palette(table.len());

    let (response, painter) =
        ui.allocate_painter(Vec2::new(ui.available_width(), size), Sense::hover());
    let center = response.rect.center();
    let outer = size * 0.45;
    let inner = outer * 0.55;

    let mut angle = -FRAC_PI_2;
    for ((_, count), fill) in table.iter().zip(&colors) {
        let sweep = (*count as f64 / total as f64) as f32 * TAU;
        ring_segment(&painter, center, inner, outer, angle, angle + sweep, *fill);
        angle += sweep;
    }

    for ((label, count), fill) in table.iter().zip(&colors) {
        ui.horizontal(|ui| {
            let (swatch, swatch_painter) =
                ui.allocate_painter(Vec2::splat(10.0), Sense::hover());
            swatch_painter.rect_filled(swatch.rect, 2.0, *fill);
            let share = 100.0 * *count as f64 / total as f64;
            ui.label(format!("{label}: {count} ({share:.1}%)"));
        });
    }
}

fn ring_segment(
    painter: &Painter,
    center: Pos2,
    inner: f32,
    outer: f32,
    start: f32,
    end: f32,
    fill: Color32,
) {
    let steps = (((end - start) / 0.05).ceil() as usize).max(1);
    for i in 0..steps {
        let a0 = start + (end - start) * i as f32 / steps as f32;
        let a1 = start + (end - start) * (i + 1) as f32 / steps as f32;
        let quad = vec![
            center + outer * Vec2::angled(a0),
            center + outer * Vec2::angled(a1),
            center + inner * Vec2::angled(a1),
            center + inner * Vec2::angled(a0),
        ];
        painter.add(Shape::convex_polygon(quad, fill, Stroke::NONE));
    }
}

// ---------------------------------------------------------------------------
// Heatmaps
// ---------------------------------------------------------------------------

/// Dense pivot matrix as a colored cell grid, row 0 at the bottom.
pub fn heatmap(ui: &mut Ui, pivot: &PivotTable, height: f32) {
    let n_rows = pivot.row_labels.len();
    let n_cols = pivot.col_labels.len();
    if n_rows == 0 || n_cols == 0 {
        return;
    }
    let max = pivot.max_cell();

    let left_gutter = 34.0;
    let bottom_gutter = 16.0;
    let (response, painter) =
        ui.allocate_painter(Vec2::new(ui.available_width(), height), Sense::hover());
    let rect = response.rect;
    let grid = Rect::from_min_max(
        pos2(rect.min.x + left_gutter, rect.min.y),
        pos2(rect.max.x, rect.max.y - bottom_gutter),
    );
    let cell_w = grid.width() / n_cols as f32;
    let cell_h = grid.height() / n_rows as f32;

    for (r, row) in pivot.cells.iter().enumerate() {
        for (c, &count) in row.iter().enumerate() {
            let t = if max == 0 {
                0.0
            } else {
                count as f64 / max as f64
            };
            let min = pos2(
                grid.min.x + c as f32 * cell_w,
                grid.max.y - (r + 1) as f32 * cell_h,
            );
            painter.rect_filled(
                Rect::from_min_size(min, Vec2::new(cell_w - 1.0, cell_h - 1.0)),
                1.0,
                color::heat_color(t),
            );
        }
    }

    let text_color = ui.visuals().text_color();
    let font = FontId::proportional(10.0);
    let row_stride = (n_rows / 12).max(1);
    for r in (0..n_rows).step_by(row_stride) {
        painter.text(
            pos2(grid.min.x - 4.0, grid.max.y - (r as f32 + 0.5) * cell_h),
            Align2::RIGHT_CENTER,
            &pivot.row_labels[r],
            font.clone(),
            text_color,
        );
    }
    for (c, label) in pivot.col_labels.iter().enumerate() {
        let short: String = label.chars().take(3).collect();
        painter.text(
            pos2(grid.min.x + (c as f32 + 0.5) * cell_w, grid.max.y + 2.0),
            Align2::CENTER_TOP,
            short,
            font.clone(),
            text_color,
        );
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// Daily counts as a thin line with the moving average emphasized on top.
pub fn time_series(ui: &mut Ui, id: &str, series: &[DailyPoint], height: f32) {
    if series.is_empty() {
        no_data(ui, height);
        return;
    }
    let raw: PlotPoints = series
        .iter()
        .map(|p| [epoch_days(p.date), p.count as f64])
        .collect();
    let averaged: PlotPoints = series
        .iter()
        .filter_map(|p| p.moving_avg.map(|avg| [epoch_days(p.date), avg]))
        .collect();

    Plot::new(id.to_string())
        .height(height)
        .y_axis_label("Number of crime reports")
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| date_label(mark.value))
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(raw)
                    .color(Color32::from_rgb(90, 140, 220))
                    .width(0.5),
            );
            plot_ui.line(
                Line::new(averaged)
                    .color(Color32::from_rgb(255, 165, 0))
                    .width(3.0),
            );
        });
}

fn epoch_days(date: NaiveDate) -> f64 {
    date.signed_duration_since(NaiveDate::default()).num_days() as f64
}

fn date_label(value: f64) -> String {
    let date = NaiveDate::default() + chrono::Duration::days(value.round() as i64);
    date.format("%b %d").to_string()
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

pub fn no_data(ui: &mut Ui, height: f32) {
    ui.add_sized(
        [ui.available_width(), height],
        eframe::egui::Label::new(RichText::new("No matching incidents").weak()),
    );
}
