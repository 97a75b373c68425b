use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Country → colour
// ---------------------------------------------------------------------------

/// One colour per country label; metrics of the same country share it and
/// are told apart by line style.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    pub fn new<'a>(countries: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: Vec<&str> = countries
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let mapping = unique
            .iter()
            .zip(generate_palette(unique.len()))
            .map(|(c, color)| (c.to_string(), color))
            .collect();
        ColorMap { mapping }
    }

    pub fn color_for(&self, country: &str) -> Color32 {
        self.mapping
            .get(country)
            .copied()
            .unwrap_or(Color32::LIGHT_BLUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_colors_per_country() {
        let map = ColorMap::new(["B", "A", "B", "C"]);
        assert_ne!(map.color_for("A"), map.color_for("B"));
        assert_ne!(map.color_for("B"), map.color_for("C"));
        assert_eq!(map.color_for("zzz"), Color32::LIGHT_BLUE);
        assert!(generate_palette(0).is_empty());
    }
}
