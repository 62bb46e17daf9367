//! Radio Monitor
//!
//! Watches BLE advertisements for a device whose local name contains the
//! target name, connects to it once per address and follows its connection
//! status afterwards. Transitions carry the advertised name. Only available
//! on Windows.
//!
//! The platform reports a single link state per device, so a successful
//! connection is emitted as `both` and a lost or failed one as
//! `disconnected`.

pub use platform::RadioMonitor;

use crate::domain::models::{ConnectionStatus, ConnectionTransition};
use crate::infrastructure::bluetooth::TransitionCallback;

/// Case-insensitive substring match of an advertised name against the target.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn name_matches(advertised: &str, target: &str) -> bool {
    !target.is_empty() && advertised.to_lowercase().contains(&target.to_lowercase())
}

/// Report `status` for the device advertised as `name`.
#[cfg_attr(not(windows), allow(dead_code))]
fn emit(callback: &Option<TransitionCallback>, name: &str, status: ConnectionStatus) {
    if let Some(callback) = callback {
        callback(ConnectionTransition::new(name, status));
    }
}

#[cfg(windows)]
mod platform {
    use super::{emit, name_matches};
    use crate::domain::errors::MonitorError;
    use crate::domain::models::ConnectionStatus;
    use crate::infrastructure::bluetooth::{ConnectionMonitor, TransitionCallback};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};
    use windows::Devices::Bluetooth::Advertisement::{
        BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
        BluetoothLEScanningMode,
    };
    use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
    use windows::Foundation::TypedEventHandler;

    fn radio_error(e: windows::core::Error) -> MonitorError {
        MonitorError::Radio(e.message())
    }

    /// A connected device and its `ConnectionStatusChanged` registration.
    struct Attached {
        device: BluetoothLEDevice,
        token: Option<i64>,
    }

    type AttachedDevices = Arc<Mutex<Vec<Attached>>>;

    pub struct RadioMonitor {
        target: Arc<Mutex<String>>,
        callback: Option<TransitionCallback>,
        watcher: Option<BluetoothLEAdvertisementWatcher>,
        task: Option<JoinHandle<()>>,
        attached: AttachedDevices,
    }

    impl RadioMonitor {
        pub fn new() -> Result<Self, MonitorError> {
            // Probe the advertisement API once so hosts without it fail here.
            BluetoothLEAdvertisementWatcher::new().map_err(radio_error)?;
            info!("Bluetooth monitor initialized (radio)");
            Ok(Self {
                target: Arc::new(Mutex::new(String::new())),
                callback: None,
                watcher: None,
                task: None,
                attached: Arc::new(Mutex::new(Vec::new())),
            })
        }

        fn current_target(target: &Arc<Mutex<String>>) -> String {
            target.lock().map(|t| t.clone()).unwrap_or_default()
        }
    }

    /// Report later status changes of `device` under its advertised `name`.
    fn follow_status(
        device: &BluetoothLEDevice,
        callback: Option<TransitionCallback>,
        name: String,
    ) -> windows::core::Result<i64> {
        let handler = TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
            if let Some(dev) = dev.as_ref() {
                let status = match dev.ConnectionStatus()? {
                    BluetoothConnectionStatus::Connected => ConnectionStatus::Both,
                    _ => ConnectionStatus::Disconnected,
                };
                emit(&callback, &name, status);
            }
            Ok(())
        });
        device.ConnectionStatusChanged(&handler)
    }

    fn release(attached: &AttachedDevices) {
        let Ok(mut attached) = attached.lock() else {
            return;
        };
        for Attached { device, token } in attached.drain(..) {
            if let Some(token) = token {
                let _ = device.RemoveConnectionStatusChanged(token);
            }
            let _ = device.Close();
        }
    }

    impl ConnectionMonitor for RadioMonitor {
        fn set_target_device(&mut self, name: &str) {
            if let Ok(mut target) = self.target.lock() {
                *target = name.to_string();
            }
        }

        fn set_callback(&mut self, callback: TransitionCallback) {
            self.callback = Some(callback);
        }

        fn start(&mut self) -> Result<(), MonitorError> {
            if self.watcher.is_some() {
                return Ok(());
            }
            let target_name = Self::current_target(&self.target);
            if target_name.is_empty() {
                return Err(MonitorError::NoTargetDevice);
            }
            info!("Starting BLE scan for '{}'", target_name);

            let (address_tx, mut address_rx) = mpsc::unbounded_channel::<(u64, String)>();
            let target = self.target.clone();
            let handler = TypedEventHandler::new(
                move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                      args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                    if let Some(args) = args.as_ref() {
                        let name = args.Advertisement()?.LocalName()?.to_string();
                        let wanted = RadioMonitor::current_target(&target);
                        if name_matches(&name, &wanted) {
                            let _ = address_tx.send((args.BluetoothAddress()?, name));
                        }
                    }
                    Ok(())
                },
            );

            let watcher = BluetoothLEAdvertisementWatcher::new().map_err(radio_error)?;
            watcher
                .SetScanningMode(BluetoothLEScanningMode::Active)
                .map_err(radio_error)?;
            watcher.Received(&handler).map_err(radio_error)?;
            watcher.Start().map_err(radio_error)?;

            let callback = self.callback.clone();
            let attached = self.attached.clone();
            self.task = Some(tokio::spawn(async move {
                let mut seen = HashSet::new();

                while let Some((address, name)) = address_rx.recv().await {
                    if !seen.insert(address) {
                        continue;
                    }
                    debug!("'{}' advertised at {:#X}", name, address);

                    let connected = match BluetoothLEDevice::FromBluetoothAddressAsync(address) {
                        Ok(op) => op.await,
                        Err(e) => Err(e),
                    };
                    match connected {
                        Ok(device) => {
                            info!("Connected to '{}' at {:#X}", name, address);
                            emit(&callback, &name, ConnectionStatus::Both);
                            let token = follow_status(&device, callback.clone(), name)
                                .map_err(|e| {
                                    warn!("Cannot follow connection status: {}", e.message())
                                })
                                .ok();
                            if let Ok(mut attached) = attached.lock() {
                                attached.push(Attached { device, token });
                            }
                        }
                        Err(e) => {
                            warn!("Connection to '{}' failed: {}", name, e.message());
                            emit(&callback, &name, ConnectionStatus::Disconnected);
                        }
                    }
                }
            }));
            self.watcher = Some(watcher);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(watcher) = self.watcher.take() {
                info!("Stopping BLE scan...");
                let _ = watcher.Stop();
            }
            if let Some(task) = self.task.take() {
                task.abort();
            }
            release(&self.attached);
        }

        fn is_running(&self) -> bool {
            self.watcher.is_some()
        }

        fn backend_name(&self) -> &'static str {
            "radio"
        }
    }

    impl Drop for RadioMonitor {
        fn drop(&mut self) {
            self.stop();
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use crate::domain::errors::MonitorError;
    use crate::infrastructure::bluetooth::{ConnectionMonitor, TransitionCallback};

    /// No radio backend exists on this platform; the type cannot be built.
    pub enum RadioMonitor {}

    impl RadioMonitor {
        pub fn new() -> Result<Self, MonitorError> {
            Err(MonitorError::Unsupported)
        }
    }

    impl ConnectionMonitor for RadioMonitor {
        fn set_target_device(&mut self, _name: &str) {
            match *self {}
        }

        fn set_callback(&mut self, _callback: TransitionCallback) {
            match *self {}
        }

        fn start(&mut self) -> Result<(), MonitorError> {
            match *self {}
        }

        fn stop(&mut self) {
            match *self {}
        }

        fn is_running(&self) -> bool {
            match *self {}
        }

        fn backend_name(&self) -> &'static str {
            match *self {}
        }
    }
}
