use crate::domain::models::{ConnectionStatus, MessageSeverity, Tab, TrackerCommand};
use crate::presentation::app::TrackerApp;
use crate::presentation::components::Components;
use crate::presentation::theme;
use eframe::egui;

pub fn render(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Beat Buddy Tracker");
    ui.label("Logs when your earbuds connect and disconnect, and where.");
    ui.add_space(16.0);

    ui_device_panel(app, ui);
    ui.add_space(12.0);

    ui_demo_panel(app, ui);
    ui.add_space(12.0);

    ui_status_panel(app, ui);
    ui.add_space(12.0);

    ui_recent_panel(app, ui);
}

fn ui_device_panel(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::card(ui, &app.settings.device_name.clone(), |ui| {
        let status = app
            .snapshot
            .as_ref()
            .map(|s| s.status())
            .unwrap_or(ConnectionStatus::Disconnected);
        Components::status_banner(ui, status.description(), status);

        ui.add_space(6.0);
        egui::Grid::new("device_grid")
            .spacing([40.0, 6.0])
            .show(ui, |ui| {
                ui.label("Left:");
                ui.label(channel_text(status.left_connected()));
                ui.end_row();

                ui.label("Right:");
                ui.label(channel_text(status.right_connected()));
                ui.end_row();

                ui.label("Last seen:");
                match &app.snapshot {
                    Some(snapshot) => ui.label(
                        snapshot
                            .last_seen
                            .with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string(),
                    ),
                    None => ui.label("Never"),
                };
                ui.end_row();

                ui.label("Monitor:");
                ui.label(if app.backend.is_empty() {
                    "starting..."
                } else {
                    app.backend
                });
                ui.end_row();
            });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if app.monitoring {
                if ui.button("Stop Monitoring").clicked() {
                    app.send(TrackerCommand::Stop);
                }
                ui.spinner();
            } else {
                let can_start = app.initialized && !app.settings.device_name.is_empty();
                if ui
                    .add_enabled(can_start, egui::Button::new("Start Monitoring"))
                    .clicked()
                {
                    app.send(TrackerCommand::Start);
                }
            }
        });

        if !app.settings.tracking_enabled {
            ui.label(
                egui::RichText::new("Tracking is disabled; transitions are not logged.")
                    .italics()
                    .color(theme::severity_color(MessageSeverity::Warning)),
            );
        }
    });
}

fn channel_text(connected: bool) -> &'static str {
    if connected {
        "Connected"
    } else {
        "Not connected"
    }
}

fn ui_demo_panel(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::card(ui, "Demo Controls", |ui| {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(app.initialized, egui::Button::new("Simulate Connection Event"))
                .clicked()
            {
                app.send(TrackerCommand::SimulateTransition);
            }
            if ui
                .add_enabled(
                    !app.events.is_empty(),
                    egui::Button::new("View Latest Event Location"),
                )
                .clicked()
            {
                app.show_on_map(None);
            }
        });
    });
}

fn ui_status_panel(app: &mut TrackerApp, ui: &mut egui::Ui) {
    if let Some(msg) = &app.status_message {
        Components::card(ui, "Latest Notification", |ui| {
            ui.label(
                egui::RichText::new(&msg.message)
                    .color(theme::severity_color(msg.severity))
                    .strong(),
            );
        });
    }
}

fn ui_recent_panel(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::card(ui, "Recent Events", |ui| {
        if app.events.is_empty() {
            ui.label("No events yet.");
            return;
        }
        for event in app.events.iter().take(5) {
            ui.horizontal(|ui| {
                Components::status_badge(ui, event.connection_status);
                ui.label(
                    event
                        .timestamp
                        .with_timezone(&chrono::Local)
                        .format("%H:%M:%S")
                        .to_string(),
                );
            });
        }
        if app.events.len() > 5 && ui.link(format!("All {} events", app.events.len())).clicked() {
            app.selected_tab = Tab::Events;
        }
    });
}
