use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use guns_butter::data::model::Provenance;

use crate::state::AppState;

/// Tabular view of the tidy dataset, values rounded to two decimals.
pub fn records_table(ui: &mut Ui, state: &AppState) {
    let records = &state.output.records;
    if records.is_empty() {
        ui.label("No data available for the selected options.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(160.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["Year", "Country", "Metric", "Value", "Source"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, records.len(), |mut row| {
                let rec = &records[row.index()];
                row.col(|ui| {
                    ui.label(rec.year.to_string());
                });
                row.col(|ui| {
                    ui.label(&rec.country);
                });
                row.col(|ui| {
                    ui.label(rec.metric.label());
                });
                row.col(|ui| {
                    ui.label(format!("{:.2}", rec.value));
                });
                row.col(|ui| {
                    let text = RichText::new(rec.source.to_string());
                    ui.label(match rec.source {
                        Provenance::Observed => text,
                        Provenance::Synthesized => text.italics().weak(),
                    });
                });
            });
        });
}
