use crate::domain::models::TrackerCommand;
use crate::presentation::app::TrackerApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Settings");
    ui.add_space(16.0);

    let mut apply_name = false;
    let mut toggled = false;

    Components::card(ui, "Device", |ui| {
        ui.horizontal(|ui| {
            ui.label("Device name:");
            ui.text_edit_singleline(&mut app.settings_draft.device_name);
        });
        let renamed = app.settings_draft.device_name.trim() != app.settings.device_name;
        if ui
            .add_enabled(renamed, egui::Button::new("Apply Device Name"))
            .clicked()
        {
            apply_name = true;
        }
        if renamed && app.monitoring {
            ui.label(
                egui::RichText::new("Monitoring restarts briefly after renaming.")
                    .italics()
                    .size(12.0),
            );
        }
    });

    ui.add_space(10.0);

    Components::card(ui, "Tracking", |ui| {
        toggled |= ui
            .checkbox(
                &mut app.settings_draft.tracking_enabled,
                "Log connection events",
            )
            .changed();
        toggled |= ui
            .checkbox(
                &mut app.settings_draft.location_enabled,
                "Attach location to events",
            )
            .changed();
    });

    if apply_name || toggled {
        let mut update = app.settings_draft.clone();
        if apply_name {
            update.device_name = update.device_name.trim().to_string();
            app.settings_draft.device_name = update.device_name.clone();
        } else {
            // an unapplied rename stays a draft
            update.device_name = app.settings.device_name.clone();
        }
        app.send(TrackerCommand::UpdateSettings(update));
    }

    ui.add_space(10.0);

    Components::card(ui, "Data", |ui| {
        ui.label(format!("{} events stored", app.events.len()));
        ui.horizontal(|ui| {
            if ui.button("Export CSV").clicked() {
                app.send(TrackerCommand::Export);
            }

            if app.confirm_clear {
                ui.label("Delete all events?");
                if ui.button("Yes, clear").clicked() {
                    app.send(TrackerCommand::ClearEvents);
                    app.confirm_clear = false;
                }
                if ui.button("Cancel").clicked() {
                    app.confirm_clear = false;
                }
            } else if ui
                .add_enabled(!app.events.is_empty(), egui::Button::new("Clear Events"))
                .clicked()
            {
                app.confirm_clear = true;
            }
        });
    });
}
