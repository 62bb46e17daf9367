//! Bluetooth Module
//!
//! Produces connection-status transitions for the target device.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                ConnectionMonitor (trait)                 │
//! │  set_target_device / set_callback / start / stop         │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!             ┌─────────┴──────────┐
//!             │                    │
//!             ▼                    ▼
//! ┌──────────────────┐  ┌────────────────────┐
//! │ SimulatedMonitor │  │    RadioMonitor    │
//! │                  │  │                    │
//! │ - timer driven   │  │ - BLE adverts      │
//! │ - injectable RNG │  │ - connect / status │
//! └──────────────────┘  └────────────────────┘
//! ```
//!
//! The variant is chosen once, at construction, by [`create_monitor`].

pub mod radio;
pub mod simulated;

pub use radio::RadioMonitor;
pub use simulated::{FixedIntervalSimulation, RandomSimulation, SimulatedMonitor};

use crate::domain::errors::MonitorError;
use crate::domain::models::ConnectionTransition;
use crate::domain::settings::{MonitorBackend, MonitorConfig, SimulationMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The single subscriber notified of each transition.
pub type TransitionCallback = Arc<dyn Fn(ConnectionTransition) + Send + Sync>;

/// Source of connection-status transitions for one named device.
///
/// `start` on a running monitor is a no-op and `stop` is idempotent.
pub trait ConnectionMonitor: Send {
    fn set_target_device(&mut self, name: &str);
    fn set_callback(&mut self, callback: TransitionCallback);
    fn start(&mut self) -> Result<(), MonitorError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    /// Short name of the variant, for display.
    fn backend_name(&self) -> &'static str;
}

/// Build the monitor variant selected by configuration.
///
/// `Auto` prefers the radio and falls back to the simulation when the radio
/// cannot be initialized; an explicit `Radio` request propagates the error.
pub fn create_monitor(config: &MonitorConfig) -> Result<Box<dyn ConnectionMonitor>, MonitorError> {
    match config.backend {
        MonitorBackend::Simulated => Ok(Box::new(simulated_monitor(config))),
        MonitorBackend::Radio => Ok(Box::new(RadioMonitor::new()?)),
        MonitorBackend::Auto => match RadioMonitor::new() {
            Ok(radio) => {
                info!("Using Bluetooth radio monitor");
                Ok(Box::new(radio))
            }
            Err(e) => {
                warn!("Radio monitor unavailable ({}), using simulation", e);
                Ok(Box::new(simulated_monitor(config)))
            }
        },
    }
}

fn simulated_monitor(config: &MonitorConfig) -> SimulatedMonitor {
    match config.simulation {
        SimulationMode::Random => SimulatedMonitor::new(Box::new(RandomSimulation::new(
            Duration::from_millis(config.min_interval_ms),
            Duration::from_millis(config.max_interval_ms),
        ))),
        SimulationMode::Fixed => SimulatedMonitor::new(Box::new(FixedIntervalSimulation::new(
            Duration::from_millis(config.fixed_interval_ms),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_backend_is_selected() {
        let config = MonitorConfig {
            backend: MonitorBackend::Simulated,
            ..Default::default()
        };
        let monitor = create_monitor(&config).unwrap();
        assert_eq!(monitor.backend_name(), "simulated");
        assert!(!monitor.is_running());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_auto_falls_back_without_radio() {
        let monitor = create_monitor(&MonitorConfig::default()).unwrap();
        assert_eq!(monitor.backend_name(), "simulated");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_explicit_radio_fails_without_radio() {
        let config = MonitorConfig {
            backend: MonitorBackend::Radio,
            ..Default::default()
        };
        assert!(matches!(
            create_monitor(&config),
            Err(MonitorError::Unsupported)
        ));
    }
}
