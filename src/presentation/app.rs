use crate::domain::models::{
    AppEvent, ConnectionEvent, Coordinates, DeviceSnapshot, MessageSeverity, StatusMessage, Tab,
    TrackerCommand,
};
use crate::domain::settings::{AppConfig, Settings};
use crate::domain::tracker::{TrackerServices, TrackingCoordinator};
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

pub struct TrackerApp {
    // Tracker thread
    pub(crate) command_tx: mpsc::UnboundedSender<TrackerCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Mirrored tracker state
    pub(crate) settings: Settings,
    pub(crate) events: Vec<ConnectionEvent>,
    pub(crate) snapshot: Option<DeviceSnapshot>,
    pub(crate) monitoring: bool,
    pub(crate) backend: &'static str,
    pub(crate) position: Option<Coordinates>,
    pub(crate) status_message: Option<StatusMessage>,
    pub(crate) initialized: bool,

    // UI state
    pub(crate) selected_tab: Tab,
    pub(crate) settings_draft: Settings,
    pub(crate) selected_event: Option<String>,
    pub(crate) confirm_clear: bool,
    pub(crate) is_dark_mode: bool,
}

impl TrackerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        crate::presentation::theme::configure_style(&cc.egui_ctx, false);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let repaint_ctx = cc.egui_ctx.clone();

        let status_message = match spawn_tracker(config, event_tx, command_rx, repaint_ctx) {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to start tracker thread: {}", e);
                Some(StatusMessage::new(
                    MessageSeverity::Error,
                    format!("Failed to start tracker: {}", e),
                ))
            }
        };

        Self {
            command_tx,
            event_rx,
            settings: Settings::default(),
            events: Vec::new(),
            snapshot: None,
            monitoring: false,
            backend: "",
            position: None,
            status_message,
            initialized: false,
            selected_tab: Tab::Home,
            settings_draft: Settings::default(),
            selected_event: None,
            confirm_clear: false,
            is_dark_mode: false,
        }
    }

    pub(crate) fn send(&self, command: TrackerCommand) {
        if self.command_tx.send(command).is_err() {
            error!("Tracker thread is not running");
        }
    }

    /// The event shown on the map: the selected one, else the newest.
    pub(crate) fn focused_event(&self) -> Option<&ConnectionEvent> {
        self.selected_event
            .as_ref()
            .and_then(|id| self.events.iter().find(|e| &e.id == id))
            .or_else(|| self.events.first())
    }

    pub(crate) fn show_on_map(&mut self, event_id: Option<String>) {
        self.selected_event = event_id;
        self.selected_tab = Tab::Map;
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Initialized {
                settings,
                events,
                backend,
            } => {
                self.settings_draft = settings.clone();
                self.settings = settings;
                self.events = events;
                self.backend = backend;
                self.initialized = true;
            }
            AppEvent::EventLogged(event) => {
                self.events.insert(0, event);
            }
            AppEvent::EventsReplaced(events) => {
                self.events = events;
                self.selected_event = None;
            }
            AppEvent::SnapshotUpdated(snapshot) => self.snapshot = Some(snapshot),
            AppEvent::MonitoringChanged(active) => self.monitoring = active,
            AppEvent::SettingsChanged(settings) => self.settings = settings,
            AppEvent::PositionUpdated(coords) => self.position = Some(coords),
            AppEvent::LogMessage(msg) => self.status_message = Some(msg),
        }
    }
}

fn spawn_tracker(
    config: AppConfig,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    command_rx: mpsc::UnboundedReceiver<TrackerCommand>,
    repaint_ctx: egui::Context,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("tracker".to_string())
        .spawn(move || {
            let report = |message: String| {
                error!("{}", message);
                let _ = event_tx.send(AppEvent::LogMessage(StatusMessage::new(
                    MessageSeverity::Error,
                    message,
                )));
                repaint_ctx.request_repaint();
            };

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => return report(format!("Failed to create tracker runtime: {}", e)),
            };

            rt.block_on(async {
                match TrackerServices::from_config(&config) {
                    Ok(services) => {
                        info!("Tracker thread started");
                        TrackingCoordinator::new(services, &config, event_tx.clone())
                            .run(command_rx)
                            .await;
                    }
                    Err(e) => report(e.to_string()),
                }
            });
        })?;
    Ok(())
}

impl eframe::App for TrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply_event(event);
        }
        // pick up tracker events between input frames
        ctx.request_repaint_after(Duration::from_millis(250));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Home, "Home");
                ui.selectable_value(&mut self.selected_tab, Tab::Events, "Events");
                ui.selectable_value(&mut self.selected_tab, Tab::Map, "Map");
                ui.selectable_value(&mut self.selected_tab, Tab::Settings, "Settings");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode { "☀ Light" } else { "🌙 Dark" };
                    if ui.button(switch_icon).clicked() {
                        self.is_dark_mode = !self.is_dark_mode;
                        crate::presentation::theme::configure_style(ctx, self.is_dark_mode);
                    }
                    if self.monitoring {
                        ui.label(egui::RichText::new("● Monitoring").strong());
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(820.0);
                    ui.add_space(16.0);

                    use crate::presentation::tabs;
                    match self.selected_tab {
                        Tab::Home => tabs::home::render(self, ui),
                        Tab::Events => tabs::events::render(self, ui),
                        Tab::Map => tabs::map::render(self, ui),
                        Tab::Settings => tabs::settings::render(self, ui),
                    }

                    ui.add_space(40.0);
                });
            });
        });
    }
}
