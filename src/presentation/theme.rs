use crate::domain::models::{ConnectionStatus, MessageSeverity};
use eframe::egui::{self, Color32};

pub struct Palette {
    pub bg: Color32,
    pub fg: Color32,
    pub stroke: Color32,
    pub surface: Color32,
    pub highlight: Color32,
    pub pressed: Color32,
    pub selection: Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: Color32::from_rgb(24, 24, 28),
                fg: Color32::WHITE,
                stroke: Color32::WHITE,
                surface: Color32::from_gray(34),
                highlight: Color32::from_rgb(255, 200, 0),
                pressed: Color32::from_rgb(0, 230, 120),
                selection: Color32::from_rgb(0, 200, 255),
            }
        } else {
            Self {
                bg: Color32::from_rgb(246, 244, 240),
                fg: Color32::BLACK,
                stroke: Color32::BLACK,
                surface: Color32::WHITE,
                highlight: Color32::from_rgb(255, 220, 0),
                pressed: Color32::from_rgb(0, 220, 110),
                selection: Color32::from_rgb(0, 190, 255),
            }
        }
    }
}

/// Fill colour for a connection status; text on it is drawn in black or white
/// per [`status_text_color`].
pub fn status_color(status: ConnectionStatus) -> Color32 {
    match status {
        ConnectionStatus::Both => Color32::from_rgb(0, 190, 90),
        ConnectionStatus::Left => Color32::from_rgb(60, 130, 255),
        ConnectionStatus::Right => Color32::from_rgb(160, 90, 255),
        ConnectionStatus::Disconnected => Color32::from_rgb(230, 60, 60),
    }
}

pub fn status_text_color(status: ConnectionStatus) -> Color32 {
    match status {
        ConnectionStatus::Both => Color32::BLACK,
        _ => Color32::WHITE,
    }
}

pub fn severity_color(severity: MessageSeverity) -> Color32 {
    match severity {
        MessageSeverity::Info => Color32::from_rgb(40, 90, 220),
        MessageSeverity::Success => Color32::from_rgb(0, 150, 0),
        MessageSeverity::Warning => Color32::from_rgb(200, 150, 0),
        MessageSeverity::Error => Color32::RED,
    }
}

pub fn configure_style(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    for (text_style, font_id) in style.text_styles.iter_mut() {
        font_id.size = match text_style {
            egui::TextStyle::Heading => 26.0,
            egui::TextStyle::Body | egui::TextStyle::Button => 15.0,
            _ => font_id.size,
        };
    }

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(14.0, 8.0);

    let widgets = &mut style.visuals.widgets;
    for (visuals, width) in [
        (&mut widgets.noninteractive, 2.0),
        (&mut widgets.inactive, 2.0),
        (&mut widgets.hovered, 2.5),
        (&mut widgets.active, 3.0),
    ] {
        visuals.rounding = egui::Rounding::ZERO;
        visuals.bg_stroke = egui::Stroke::new(width, palette.stroke);
        visuals.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    }
    widgets.noninteractive.bg_fill = palette.bg;
    widgets.inactive.bg_fill = palette.surface;
    widgets.hovered.bg_fill = palette.highlight;
    widgets.hovered.fg_stroke = egui::Stroke::new(1.0, Color32::BLACK);
    widgets.hovered.expansion = 2.0;
    widgets.active.bg_fill = palette.pressed;
    widgets.active.fg_stroke = egui::Stroke::new(1.0, Color32::BLACK);

    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.selection.bg_fill = palette.selection;

    style.visuals.window_rounding = egui::Rounding::ZERO;
    style.visuals.window_stroke = egui::Stroke::new(2.0, palette.stroke);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(6.0, 6.0),
        blur: 0.0,
        spread: 0.0,
        color: palette.stroke,
    };
    style.visuals.window_fill = palette.bg;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
