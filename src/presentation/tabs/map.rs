//! Simulated map: a grid centred on the focused event with the other events
//! plotted around it by their offset in degrees.

use crate::domain::models::ConnectionEvent;
use crate::presentation::app::TrackerApp;
use crate::presentation::components::Components;
use crate::presentation::theme;
use eframe::egui::{self, Color32, Pos2, Stroke};

/// Pixels per degree at the map's scale.
const PIXELS_PER_DEGREE: f32 = 4000.0;
const GRID_STEP: f32 = 40.0;

pub fn render(app: &mut TrackerApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Event Location");
    ui.add_space(12.0);

    let Some(focused) = app.focused_event().cloned() else {
        Components::card(ui, "Map", |ui| {
            ui.label("No events to show yet.");
        });
        return;
    };

    Components::card(ui, "Map", |ui| {
        draw_map(ui, &focused, &app.events);
    });
    ui.add_space(12.0);

    Components::card(ui, "Details", |ui| {
        egui::Grid::new("map_details")
            .spacing([40.0, 6.0])
            .show(ui, |ui| {
                ui.label("Device:");
                ui.label(&focused.device_name);
                ui.end_row();

                ui.label("Status:");
                Components::status_badge(ui, focused.connection_status);
                ui.end_row();

                ui.label("Time:");
                ui.label(
                    focused
                        .timestamp
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                );
                ui.end_row();

                ui.label("Coordinates:");
                ui.monospace(format!(
                    "{:.6}, {:.6}",
                    focused.location.latitude, focused.location.longitude
                ));
                ui.end_row();

                if let Some(address) = &focused.location.address {
                    ui.label("Address:");
                    ui.label(address);
                    ui.end_row();
                }

                if let Some(position) = app.position {
                    ui.label("Current position:");
                    ui.monospace(format!("{:.6}, {:.6}", position.latitude, position.longitude));
                    ui.end_row();
                }
            });

        if app.selected_event.is_some() && ui.button("Show Latest Event").clicked() {
            app.selected_event = None;
        }
    });
}

fn draw_map(ui: &mut egui::Ui, focused: &ConnectionEvent, events: &[ConnectionEvent]) {
    let size = egui::vec2(ui.available_width(), 320.0);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    let painter = ui.painter_at(rect);
    let visuals = ui.visuals();

    painter.rect_filled(rect, 0.0, visuals.extreme_bg_color);

    let grid = Stroke::new(1.0, visuals.weak_text_color().gamma_multiply(0.3));
    let mut x = rect.left();
    while x <= rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
        x += GRID_STEP;
    }
    let mut y = rect.top();
    while y <= rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], grid);
        y += GRID_STEP;
    }

    let center = rect.center();
    let project = |event: &ConnectionEvent| {
        let dx = (event.location.longitude - focused.location.longitude) as f32;
        let dy = (event.location.latitude - focused.location.latitude) as f32;
        Pos2::new(
            center.x + dx * PIXELS_PER_DEGREE,
            center.y - dy * PIXELS_PER_DEGREE,
        )
    };

    for event in events.iter().filter(|e| e.id != focused.id) {
        let pos = project(event);
        if rect.shrink(4.0).contains(pos) {
            let color = theme::status_color(event.connection_status).gamma_multiply(0.6);
            painter.circle_filled(pos, 5.0, color);
        }
    }

    let marker = theme::status_color(focused.connection_status);
    painter.circle_filled(center, 12.0, marker);
    painter.circle_stroke(center, 12.0, Stroke::new(2.0, visuals.strong_text_color()));
    painter.circle_filled(center, 4.0, Color32::WHITE);

    painter.text(
        rect.left_top() + egui::vec2(10.0, 10.0),
        egui::Align2::LEFT_TOP,
        "Simulated Map View",
        egui::FontId::proportional(14.0),
        visuals.strong_text_color(),
    );
    painter.text(
        rect.left_bottom() + egui::vec2(10.0, -10.0),
        egui::Align2::LEFT_BOTTOM,
        format!(
            "{:.4}, {:.4}",
            focused.location.latitude, focused.location.longitude
        ),
        egui::FontId::monospace(12.0),
        visuals.text_color(),
    );
}
