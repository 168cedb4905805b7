use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Used for the donut-chart segments.
pub fn categorical_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_color32(Hsl::new(hue, 0.55, 0.65))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequential ramps
// ---------------------------------------------------------------------------

/// Yellow→red ramp for heatmap cells; `t` in [0, 1].
pub fn heat_color(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    // Hue 55° (warm yellow) down to 5° (deep red), darkening as it goes.
    let hue = 55.0 - 50.0 * t;
    let lightness = 0.88 - 0.50 * t;
    hsl_to_color32(Hsl::new(hue, 0.85, lightness))
}

/// Light→dark blue ramp for choropleth shading; `t` in [0, 1].
pub fn cool_color(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let lightness = 0.92 - 0.58 * t;
    hsl_to_color32(Hsl::new(215.0, 0.65, lightness))
}

fn hsl_to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_entries() {
        assert!(categorical_palette(0).is_empty());
        let palette = categorical_palette(6);
        assert_eq!(palette.len(), 6);
        for pair in palette.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn ramps_darken_with_t() {
        let low = heat_color(0.0);
        let high = heat_color(1.0);
        assert!(low.r() as u32 + low.g() as u32 > high.r() as u32 + high.g() as u32);

        let light = cool_color(0.0);
        let dark = cool_color(1.0);
        assert!(light.b() as u32 + light.g() as u32 > dark.b() as u32 + dark.g() as u32);
    }

    #[test]
    fn ramp_input_is_clamped() {
        assert_eq!(heat_color(-1.0), heat_color(0.0));
        assert_eq!(cool_color(7.5), cool_color(1.0));
    }
}
