use crate::domain::models::ConnectionStatus;
use crate::presentation::theme;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(14.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(18.0));
                    ui.add_space(6.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    /// Full-width banner in the colours of `status`.
    pub fn status_banner(ui: &mut egui::Ui, text: &str, status: ConnectionStatus) {
        ui.add_sized(
            [ui.available_width(), 35.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(theme::status_text_color(status))
                    .background_color(theme::status_color(status))
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );
    }

    pub fn status_badge(ui: &mut egui::Ui, status: ConnectionStatus) {
        ui.label(
            egui::RichText::new(format!(" {} ", status.badge()))
                .color(theme::status_text_color(status))
                .background_color(theme::status_color(status))
                .strong(),
        );
    }
}
