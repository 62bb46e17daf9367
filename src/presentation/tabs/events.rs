use crate::presentation::app::TrackerApp;
use crate::presentation::components::Components;
use eframe::egui;
use egui_extras::{Column, TableBuilder};

pub fn render(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Connection Events");
    ui.label(format!("{} events logged, newest first", app.events.len()));
    ui.add_space(12.0);

    if app.events.is_empty() {
        Components::card(ui, "Event Log", |ui| {
            ui.label("No events yet. Start monitoring or simulate a connection event.");
        });
        return;
    }

    let mut show = None;
    Components::card(ui, "Event Log", |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(150.0))
            .column(Column::remainder().at_least(120.0))
            .column(Column::auto().at_least(110.0))
            .column(Column::auto().at_least(170.0))
            .column(Column::auto())
            .max_scroll_height(480.0)
            .header(24.0, |mut header| {
                for title in ["Time", "Device", "Status", "Location", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for event in &app.events {
                    body.row(26.0, |mut row| {
                        row.col(|ui| {
                            ui.label(
                                event
                                    .timestamp
                                    .with_timezone(&chrono::Local)
                                    .format("%Y-%m-%d %H:%M:%S")
                                    .to_string(),
                            );
                        });
                        row.col(|ui| {
                            ui.label(&event.device_name);
                        });
                        row.col(|ui| {
                            Components::status_badge(ui, event.connection_status);
                        });
                        row.col(|ui| {
                            ui.monospace(format!(
                                "{:.4}, {:.4}",
                                event.location.latitude, event.location.longitude
                            ));
                        });
                        row.col(|ui| {
                            if ui.small_button("Map").clicked() {
                                show = Some(event.id.clone());
                            }
                        });
                    });
                }
            });
    });

    if let Some(id) = show {
        app.show_on_map(Some(id));
    }
}
