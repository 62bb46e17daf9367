use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::settings::Settings;

/// Connection state of a stereo accessory, derived from its two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Both,
    Left,
    Right,
    Disconnected,
}

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 4] = [
        ConnectionStatus::Both,
        ConnectionStatus::Left,
        ConnectionStatus::Right,
        ConnectionStatus::Disconnected,
    ];

    /// Derive the status from the left/right channel flags.
    pub fn from_channels(left_connected: bool, right_connected: bool) -> Self {
        match (left_connected, right_connected) {
            (true, true) => Self::Both,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (false, false) => Self::Disconnected,
        }
    }

    pub fn left_connected(self) -> bool {
        matches!(self, Self::Both | Self::Left)
    }

    pub fn right_connected(self) -> bool {
        matches!(self, Self::Both | Self::Right)
    }

    pub fn is_connected(self) -> bool {
        self != Self::Disconnected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Left => "left",
            Self::Right => "right",
            Self::Disconnected => "disconnected",
        }
    }

    /// Sentence used in notifications.
    pub fn description(self) -> &'static str {
        match self {
            Self::Both => "Both earbuds connected",
            Self::Left => "Left earbud only",
            Self::Right => "Right earbud only",
            Self::Disconnected => "Disconnected",
        }
    }

    /// Short badge text used in lists.
    pub fn badge(self) -> &'static str {
        match self {
            Self::Both => "Both Connected",
            Self::Left => "Left Only",
            Self::Right => "Right Only",
            Self::Disconnected => "Disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<Coordinates> for EventLocation {
    fn from(coords: Coordinates) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
            address: None,
        }
    }
}

/// A status change reported by a monitor, before location enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTransition {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub device_name: String,
    pub status: ConnectionStatus,
}

impl ConnectionTransition {
    pub fn new(device_name: impl Into<String>, status: ConnectionStatus) -> Self {
        let timestamp = Utc::now();
        Self {
            id: new_event_id(timestamp),
            timestamp,
            device_name: device_name.into(),
            status,
        }
    }

    pub fn into_event(self, location: EventLocation) -> ConnectionEvent {
        ConnectionEvent {
            id: self.id,
            timestamp: self.timestamp,
            device_name: self.device_name,
            connection_status: self.status,
            location,
        }
    }
}

/// `event-<unix millis>-<9 alphanumerics>`
fn new_event_id(timestamp: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("event-{}-{}", timestamp.timestamp_millis(), &suffix[..9])
}

/// One logged connection change, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub device_name: String,
    pub connection_status: ConnectionStatus,
    pub location: EventLocation,
}

/// Latest known state of the target device, for live display.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub name: String,
    pub connected: bool,
    pub left_connected: bool,
    pub right_connected: bool,
    pub last_seen: DateTime<Utc>,
}

impl From<&ConnectionEvent> for DeviceSnapshot {
    fn from(event: &ConnectionEvent) -> Self {
        let status = event.connection_status;
        Self {
            name: event.device_name.clone(),
            connected: status.is_connected(),
            left_connected: status.left_connected(),
            right_connected: status.right_connected(),
            last_seen: event.timestamp,
        }
    }
}

impl DeviceSnapshot {
    pub fn status(&self) -> ConnectionStatus {
        if !self.connected {
            return ConnectionStatus::Disconnected;
        }
        ConnectionStatus::from_channels(self.left_connected, self.right_connected)
    }
}

/// Messages from the tracker thread to the UI.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Initialized {
        settings: Settings,
        events: Vec<ConnectionEvent>,
        backend: &'static str,
    },
    EventLogged(ConnectionEvent),
    EventsReplaced(Vec<ConnectionEvent>),
    SnapshotUpdated(DeviceSnapshot),
    MonitoringChanged(bool),
    SettingsChanged(Settings),
    PositionUpdated(Coordinates),
    LogMessage(StatusMessage),
}

/// Commands from the UI to the tracker thread.
#[derive(Debug, Clone)]
pub enum TrackerCommand {
    Start,
    Stop,
    UpdateSettings(Settings),
    Export,
    ClearEvents,
    SimulateTransition,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(severity: MessageSeverity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Events,
    Map,
    Settings,
}
