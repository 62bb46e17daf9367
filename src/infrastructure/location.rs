//! Location Module
//!
//! Resolves a best-effort position for each logged event. Every request is
//! bounded by a timeout and resolves to the configured fallback coordinate
//! when the platform cannot produce a fix.

use crate::domain::errors::LocationError;
use crate::domain::models::Coordinates;
use crate::domain::settings::LocationConfig;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A platform geolocation capability.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>>;
}

#[derive(Debug, Clone, Copy)]
struct CachedFix {
    coords: Coordinates,
    taken_at: Instant,
}

type FixCache = Arc<Mutex<Option<CachedFix>>>;

pub struct LocationService {
    provider: Option<Arc<dyn LocationProvider>>,
    timeout: Duration,
    max_age: Duration,
    watch_interval: Duration,
    fallback: Coordinates,
    cache: FixCache,
    watch_task: Option<JoinHandle<()>>,
}

impl LocationService {
    pub fn new(provider: Option<Arc<dyn LocationProvider>>, config: &LocationConfig) -> Self {
        if provider.is_some() {
            info!("Location service initialized (platform geolocation)");
        } else {
            info!("Location service initialized (fallback mode)");
        }

        let watch_interval_ms = if config.watch_interval_ms == 0 {
            warn!("Location watch interval must be positive, using the default");
            LocationConfig::default().watch_interval_ms
        } else {
            config.watch_interval_ms
        };

        Self {
            provider,
            timeout: Duration::from_millis(config.timeout_ms),
            max_age: Duration::from_millis(config.max_age_ms),
            watch_interval: Duration::from_millis(watch_interval_ms),
            fallback: Coordinates {
                latitude: config.fallback_latitude,
                longitude: config.fallback_longitude,
            },
            cache: Arc::new(Mutex::new(None)),
            watch_task: None,
        }
    }

    pub fn fallback(&self) -> Coordinates {
        self.fallback
    }

    /// One-shot position. Never fails: a fresh cached fix is reused, and
    /// errors, timeouts or a missing capability yield the fallback.
    pub async fn current_position(&self) -> Coordinates {
        if let Some(coords) = fresh_fix(&self.cache, self.max_age) {
            debug!("Reusing cached position fix");
            return coords;
        }

        let Some(provider) = &self.provider else {
            return self.fallback;
        };

        match request_fix(provider.as_ref(), self.timeout).await {
            Ok(coords) => {
                store_fix(&self.cache, coords);
                coords
            }
            Err(e) => {
                warn!("Using fallback location: {}", e);
                self.fallback
            }
        }
    }

    /// Poll the provider periodically, refreshing the cache and reporting
    /// each fix to `callback`. A second call while watching is a no-op.
    pub fn start_watching<F>(&mut self, callback: F)
    where
        F: Fn(Coordinates) + Send + Sync + 'static,
    {
        if self.watch_task.is_some() {
            return;
        }
        let Some(provider) = self.provider.clone() else {
            debug!("No location capability, not watching");
            return;
        };

        let cache = self.cache.clone();
        let timeout = self.timeout;
        let mut ticker = tokio::time::interval(self.watch_interval);

        self.watch_task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                match request_fix(provider.as_ref(), timeout).await {
                    Ok(coords) => {
                        store_fix(&cache, coords);
                        callback(coords);
                    }
                    Err(e) => warn!("Location watching error: {}", e),
                }
            }
        }));
        info!("Started location watching");
    }

    pub fn stop_watching(&mut self) {
        if let Some(task) = self.watch_task.take() {
            task.abort();
            info!("Stopped location watching");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch_task.is_some()
    }
}

impl Drop for LocationService {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

async fn request_fix(
    provider: &dyn LocationProvider,
    timeout: Duration,
) -> Result<Coordinates, LocationError> {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(timeout.as_millis() as u64)),
    }
}

fn fresh_fix(cache: &FixCache, max_age: Duration) -> Option<Coordinates> {
    let guard = cache.lock().ok()?;
    guard
        .filter(|fix| fix.taken_at.elapsed() <= max_age)
        .map(|fix| fix.coords)
}

fn store_fix(cache: &FixCache, coords: Coordinates) {
    if let Ok(mut guard) = cache.lock() {
        *guard = Some(CachedFix {
            coords,
            taken_at: Instant::now(),
        });
    }
}

/// The geolocation capability of the host, if it has one.
pub fn platform_provider() -> Option<Arc<dyn LocationProvider>> {
    #[cfg(windows)]
    {
        Some(Arc::new(windows_geo::WindowsGeolocator))
    }
    #[cfg(not(windows))]
    {
        None
    }
}

#[cfg(windows)]
mod windows_geo {
    use super::LocationProvider;
    use crate::domain::errors::LocationError;
    use crate::domain::models::Coordinates;
    use futures::future::BoxFuture;
    use windows::Devices::Geolocation::{Geolocator, PositionAccuracy};

    pub struct WindowsGeolocator;

    impl LocationProvider for WindowsGeolocator {
        fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
            Box::pin(async move {
                let platform = |e: windows::core::Error| LocationError::Platform(e.message());

                let locator = Geolocator::new().map_err(platform)?;
                locator
                    .SetDesiredAccuracy(PositionAccuracy::Default)
                    .map_err(platform)?;
                let position = locator
                    .GetGeopositionAsync()
                    .map_err(platform)?
                    .await
                    .map_err(platform)?;
                let point = position
                    .Coordinate()
                    .and_then(|c| c.Point())
                    .and_then(|p| p.Position())
                    .map_err(platform)?;

                Ok(Coordinates {
                    latitude: point.Latitude,
                    longitude: point.Longitude,
                })
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test provider with a scripted outcome.
    pub(crate) enum FakeProvider {
        Fixed(Coordinates),
        Failing,
        Hanging,
    }

    impl LocationProvider for FakeProvider {
        fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
            Box::pin(async move {
                match self {
                    FakeProvider::Fixed(coords) => Ok(*coords),
                    FakeProvider::Failing => {
                        Err(LocationError::Unavailable("permission denied".into()))
                    }
                    FakeProvider::Hanging => {
                        std::future::pending::<()>().await;
                        unreachable!()
                    }
                }
            })
        }
    }

    struct CountingProvider(AtomicUsize);

    impl LocationProvider for CountingProvider {
        fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(Coordinates {
                    latitude: n as f64,
                    longitude: 0.0,
                })
            })
        }
    }

    fn service(provider: Option<Arc<dyn LocationProvider>>) -> LocationService {
        LocationService::new(provider, &LocationConfig::default())
    }

    const FALLBACK: Coordinates = Coordinates {
        latitude: 37.7749,
        longitude: -122.4194,
    };

    #[tokio::test]
    async fn test_no_capability_uses_fallback() {
        assert_eq!(service(None).current_position().await, FALLBACK);
    }

    #[tokio::test]
    async fn test_provider_error_uses_fallback() {
        let svc = service(Some(Arc::new(FakeProvider::Failing)));
        assert_eq!(svc.current_position().await, FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_fallback() {
        let svc = service(Some(Arc::new(FakeProvider::Hanging)));
        let started = Instant::now();
        assert_eq!(svc.current_position().await, FALLBACK);
        assert!(started.elapsed() >= Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn test_provider_fix_is_returned() {
        let here = Coordinates {
            latitude: 51.5,
            longitude: -0.12,
        };
        let svc = service(Some(Arc::new(FakeProvider::Fixed(here))));
        assert_eq!(svc.current_position().await, here);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_fix_respects_max_age() {
        let svc = service(Some(Arc::new(CountingProvider(AtomicUsize::new(0)))));

        assert_eq!(svc.current_position().await.latitude, 0.0);
        assert_eq!(svc.current_position().await.latitude, 0.0);

        tokio::time::advance(Duration::from_millis(300_001)).await;
        assert_eq!(svc.current_position().await.latitude, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_reports_fixes_until_stopped() {
        let mut svc = service(Some(Arc::new(CountingProvider(AtomicUsize::new(0)))));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        svc.start_watching(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(svc.is_watching());

        tokio::time::sleep(Duration::from_millis(65_000)).await;
        let reported = seen.load(Ordering::SeqCst);
        assert_eq!(reported, 3);

        svc.stop_watching();
        tokio::time::sleep(Duration::from_millis(65_000)).await;
        assert_eq!(seen.load(Ordering::SeqCst), reported);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_watch_interval_uses_default() {
        let config = LocationConfig {
            watch_interval_ms: 0,
            ..LocationConfig::default()
        };
        let mut svc = LocationService::new(
            Some(Arc::new(CountingProvider(AtomicUsize::new(0)))),
            &config,
        );
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        svc.start_watching(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(35_000)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        svc.stop_watching();
    }
}
