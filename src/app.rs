use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct GunsButterApp {
    pub state: AppState,
}

impl GunsButterApp {
    pub fn new(ctx: &egui::Context, mut state: AppState) -> Self {
        state.selection_changed(ctx);
        Self { state }
    }
}

impl eframe::App for GunsButterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: country selection ----
        egui::SidePanel::left("country_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::country_panel(ui, &mut self.state);
            });

        // ---- Controls above the chart ----
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            panels::controls(ui, &mut self.state);
        });

        // ---- Optional data table ----
        if self.state.show_table {
            egui::TopBottomPanel::bottom("data_table")
                .resizable(true)
                .default_height(240.0)
                .show(ctx, |ui| {
                    table::records_table(ui, &self.state);
                });
        }

        // ---- Central panel: chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::index_plot(ui, &self.state);
        });
    }
}
