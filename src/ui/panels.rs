use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use guns_butter::data::model::Metric;

use crate::state::{AppState, Status};

// ---------------------------------------------------------------------------
// Left side panel – country selection
// ---------------------------------------------------------------------------

/// Render the country selector: search, region bulk-add, checkbox list.
pub fn country_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Countries");
    ui.separator();

    if state.directory.is_empty() {
        ui.label("No country list loaded.");
        return;
    }

    let mut changed = false;

    // ---- Region bulk selection ----
    ui.strong("Add region");
    ui.horizontal(|ui: &mut Ui| {
        let selected_text = state.region.clone().unwrap_or_else(|| "Choose…".into());
        egui::ComboBox::from_id_salt("region")
            .selected_text(selected_text)
            .show_ui(ui, |ui: &mut Ui| {
                for region in state.directory.regions() {
                    let is_current = state.region.as_deref() == Some(region);
                    if ui.selectable_label(is_current, region).clicked() {
                        state.region = Some(region.to_string());
                    }
                }
            });
        if ui
            .add_enabled(state.region.is_some(), egui::Button::new("Add"))
            .clicked()
        {
            state.add_region();
            changed = true;
        }
    });
    ui.separator();

    // ---- Search + selected summary ----
    ui.add(egui::TextEdit::singleline(&mut state.search).hint_text("Search name or code…"));
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{} selected", state.selected.len()));
        if ui.small_button("Clear").clicked() {
            state.clear_selection();
            changed = true;
        }
    });
    ui.separator();

    // ---- Checkbox list; selected countries first ----
    let directory = state.directory.clone();
    let matches = directory.search(&state.search);
    let (selected, others): (Vec<_>, Vec<_>) = matches
        .into_iter()
        .partition(|c| state.selected.contains(&c.code));

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for info in selected.iter().chain(others.iter()) {
                let mut checked = state.selected.contains(&info.code);
                let mut text = RichText::new(format!("{} ({})", info.name, info.code));
                let label = directory.display_name(&info.code);
                if checked {
                    text = text.color(state.color_map.color_for(&label)).strong();
                }
                if ui
                    .checkbox(&mut checked, text)
                    .on_hover_text(&info.region)
                    .changed()
                {
                    state.toggle_country(&info.code);
                    changed = true;
                }
            }
        });

    if changed {
        state.selection_changed(ui.ctx());
    }
}

// ---------------------------------------------------------------------------
// Controls – years, metrics, interpolation
// ---------------------------------------------------------------------------

/// Render the row of pipeline controls above the chart.
pub fn controls(ui: &mut Ui, state: &mut AppState) {
    let mut changed = false;
    let (lo, hi) = state.year_bounds;

    ui.horizontal_wrapped(|ui: &mut Ui| {
        ui.strong("Years");
        changed |= ui
            .add(egui::Slider::new(&mut state.window.min, lo..=hi).text("from"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut state.window.max, lo..=hi).text("to"))
            .changed();

        ui.separator();
        ui.strong("Metrics");
        for metric in Metric::ALL {
            let mut on = state.metrics.contains(&metric);
            if ui.checkbox(&mut on, metric.label()).changed() {
                state.toggle_metric(metric);
                changed = true;
            }
        }

        ui.separator();
        changed |= ui
            .checkbox(&mut state.interpolate, "Allow interpolation")
            .on_hover_text("Fill in missing values between real data points")
            .changed();
        changed |= ui
            .checkbox(&mut state.observed_only, "Only observed data")
            .on_hover_text("Exclude years with interpolated values")
            .changed();
    });

    if changed {
        state.selection_changed(ui.ctx());
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open snapshot…").clicked() {
                open_snapshot_dialog(ui.ctx(), state);
                ui.close_menu();
            }
            if ui.button("Export CSV…").clicked() {
                state.export_csv();
                ui.close_menu();
            }
            ui.checkbox(&mut state.export_source_column, "Include Source column");
            ui.separator();
            if ui.button("Reload country list").clicked() {
                state.reload_directory();
                state.selection_changed(ui.ctx());
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(RichText::new(&state.source_label).weak());
        ui.separator();

        ui.label(format!(
            "{} records, {} lines",
            state.output.records.len(),
            state.chart.len()
        ));
        if state.is_loading() {
            ui.spinner();
        }

        ui.separator();
        if ui.selectable_label(state.show_table, "Data table").clicked() {
            state.show_table = !state.show_table;
        }
    });

    if let Some(status) = &state.status {
        let (text, color) = match status {
            Status::Info(msg) => (msg.as_str(), Color32::GRAY),
            Status::Warning(msg) => (msg.as_str(), Color32::YELLOW),
            Status::Error(msg) => (msg.as_str(), Color32::RED),
        };
        ui.label(RichText::new(text).color(color));
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_snapshot_dialog(ctx: &egui::Context, state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open indicator snapshot")
        .add_filter("Supported files", &["csv", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening snapshot {}", path.display());
        state.open_snapshot(ctx, &path);
    }
}
