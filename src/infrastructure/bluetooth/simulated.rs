//! Simulated Monitor
//!
//! Emits a transition for the target device after each delay drawn from a
//! [`SimulationSource`]. Used on hosts without a usable radio and during
//! development.

use super::{ConnectionMonitor, TransitionCallback};
use crate::domain::errors::MonitorError;
use crate::domain::models::{ConnectionStatus, ConnectionTransition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Delays and channel states driving the simulation.
pub trait SimulationSource: Send {
    fn next_delay(&mut self) -> Duration;
    /// `(left_connected, right_connected)`
    fn next_channels(&mut self) -> (bool, bool);
}

/// Uniformly random delay in `[min, max]` and uniformly random channels.
pub struct RandomSimulation {
    rng: StdRng,
    min: Duration,
    max: Duration,
}

impl RandomSimulation {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), min, max)
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64, min: Duration, max: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), min, max)
    }

    fn with_rng(rng: StdRng, min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { rng, min, max }
    }
}

impl SimulationSource for RandomSimulation {
    fn next_delay(&mut self) -> Duration {
        let millis = self
            .rng
            .random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    fn next_channels(&mut self) -> (bool, bool) {
        (self.rng.random_bool(0.5), self.rng.random_bool(0.5))
    }
}

/// Fixed delay between transitions, random channels.
pub struct FixedIntervalSimulation {
    rng: StdRng,
    interval: Duration,
}

impl FixedIntervalSimulation {
    pub fn new(interval: Duration) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            interval,
        }
    }
}

impl SimulationSource for FixedIntervalSimulation {
    fn next_delay(&mut self) -> Duration {
        self.interval
    }

    fn next_channels(&mut self) -> (bool, bool) {
        (self.rng.random_bool(0.5), self.rng.random_bool(0.5))
    }
}

type SharedSource = Arc<Mutex<Box<dyn SimulationSource>>>;

pub struct SimulatedMonitor {
    source: SharedSource,
    target: Arc<Mutex<String>>,
    callback: Option<TransitionCallback>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedMonitor {
    pub fn new(source: Box<dyn SimulationSource>) -> Self {
        info!("Bluetooth monitor initialized (simulation)");
        Self {
            source: Arc::new(Mutex::new(source)),
            target: Arc::new(Mutex::new(String::new())),
            callback: None,
            task: None,
        }
    }
}

fn sample(source: &SharedSource, target: &Arc<Mutex<String>>) -> Option<ConnectionTransition> {
    let name = target.lock().ok()?.clone();
    if name.is_empty() {
        return None;
    }
    let (left, right) = source.lock().ok()?.next_channels();
    Some(ConnectionTransition::new(
        name,
        ConnectionStatus::from_channels(left, right),
    ))
}

impl ConnectionMonitor for SimulatedMonitor {
    fn set_target_device(&mut self, name: &str) {
        if let Ok(mut target) = self.target.lock() {
            *target = name.to_string();
        }
    }

    fn set_callback(&mut self, callback: TransitionCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self) -> Result<(), MonitorError> {
        if self.task.is_some() {
            return Ok(());
        }
        let has_target = self.target.lock().map(|t| !t.is_empty()).unwrap_or(false);
        if !has_target {
            return Err(MonitorError::NoTargetDevice);
        }

        let source = self.source.clone();
        let target = self.target.clone();
        let callback = self.callback.clone();

        self.task = Some(tokio::spawn(async move {
            loop {
                let delay = match source.lock() {
                    Ok(mut source) => source.next_delay(),
                    Err(_) => return,
                };
                tokio::time::sleep(delay).await;

                let Some(callback) = &callback else {
                    continue;
                };
                if let Some(transition) = sample(&source, &target) {
                    debug!(
                        "Simulated transition for {}: {}",
                        transition.device_name,
                        transition.status.as_str()
                    );
                    callback(transition);
                }
            }
        }));

        info!("Started Bluetooth monitoring (simulation)");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Stopped Bluetooth monitoring");
        }
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}

impl Drop for SimulatedMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
