use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, LineStyle, MarkerShape, Plot, PlotPoints, Points};

use guns_butter::data::chart::ChartSeries;
use guns_butter::data::model::{Metric, Provenance};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Guns/butter chart (central panel)
// ---------------------------------------------------------------------------

/// Render every (country, metric) series as one line over Year.
pub fn index_plot(ui: &mut Ui, state: &AppState) {
    if state.chart.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            let msg = if state.is_loading() {
                "Fetching indicator data…"
            } else {
                "No data to display"
            };
            ui.heading(msg);
        });
        return;
    }

    Plot::new("index_plot")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label("Value")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for series in &state.chart {
                let color = state.color_map.color_for(&series.country);
                let name = series.label();

                for run in contiguous_runs(series) {
                    if run.len() == 1 {
                        plot_ui.points(
                            Points::new(PlotPoints::from(run))
                                .name(&name)
                                .color(color)
                                .radius(3.0),
                        );
                    } else {
                        plot_ui.line(
                            Line::new(PlotPoints::from(run))
                                .name(&name)
                                .color(color)
                                .style(line_style(series.metric))
                                .width(2.0),
                        );
                    }
                }

                // Hollow markers on interpolated values.
                let synthesized: Vec<[f64; 2]> = series
                    .points
                    .iter()
                    .filter(|(_, _, p)| *p == Provenance::Synthesized)
                    .map(|&(year, value, _)| [f64::from(year), value])
                    .collect();
                if !synthesized.is_empty() {
                    plot_ui.points(
                        Points::new(PlotPoints::from(synthesized))
                            .name(&name)
                            .shape(MarkerShape::Circle)
                            .filled(false)
                            .color(Color32::from_gray(200))
                            .radius(4.0),
                    );
                }
            }
        });
}

/// Dash style distinguishes metrics; colour distinguishes countries.
fn line_style(metric: Metric) -> LineStyle {
    match metric {
        Metric::Military => LineStyle::Solid,
        Metric::Butter => LineStyle::dashed_loose(),
        Metric::Ratio => LineStyle::dotted_dense(),
    }
}

/// Split a series at missing years so gaps stay visible instead of being
/// bridged by a straight segment.
fn contiguous_runs(series: &ChartSeries) -> Vec<Vec<[f64; 2]>> {
    let mut runs: Vec<Vec<[f64; 2]>> = Vec::new();
    let mut last_year: Option<i32> = None;
    for &(year, value, _) in &series.points {
        let point = [f64::from(year), value];
        match (last_year, runs.last_mut()) {
            (Some(prev), Some(run)) if year == prev + 1 => run.push(point),
            _ => runs.push(vec![point]),
        }
        last_year = Some(year);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_runs() {
        let series = ChartSeries {
            country: "A".into(),
            metric: Metric::Ratio,
            points: [2000, 2001, 2003, 2005, 2006]
                .into_iter()
                .map(|y| (y, 1.0, Provenance::Observed))
                .collect(),
        };
        let lens: Vec<usize> = contiguous_runs(&series).iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 1, 2]);
    }
}
