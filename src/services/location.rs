// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location provider abstraction and the device-reported implementation.
//!
//! The server has no GPS of its own: devices push fixes through the API and
//! [`ReportedLocationProvider`] serves them as "current fix" and as a
//! filtered stream for trip sampling.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::geo_utils::haversine_distance;
use crate::models::TripLocation;

const WATCH_BUFFER: usize = 16;
const BROADCAST_CAPACITY: usize = 64;
/// Balanced requests accept fixes this many times older than high-accuracy ones.
const BALANCED_AGE_FACTOR: u32 = 5;

/// Requested fix quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    High,
    Balanced,
}

/// A position reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
        }
    }

    /// Whether the coordinates are on the globe.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Trip sample captured at `timestamp_ms`.
    pub fn sample(&self, timestamp_ms: i64) -> TripLocation {
        TripLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            accuracy: self.accuracy,
            timestamp: timestamp_ms,
        }
    }

    fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// Sampling cadence for a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub interval: Duration,
    /// Meters
    pub min_distance: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            min_distance: 10.0,
        }
    }
}

/// Errors from location operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocationError {
    #[error("Timed out waiting for a location fix")]
    Timeout,

    #[error("Location provider closed")]
    Closed,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Source of position fixes.
pub trait LocationProvider: Send + Sync + 'static {
    /// One fix. May wait; callers bound it with a timeout.
    fn current_fix(
        &self,
        accuracy: Accuracy,
    ) -> impl Future<Output = Result<LocationFix, LocationError>> + Send;

    /// Stream of fixes honoring `options`. Must be called inside a runtime.
    fn watch(&self, options: WatchOptions) -> LocationWatch;
}

/// Subscription handle. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct LocationWatch {
    rx: mpsc::Receiver<LocationFix>,
    task: Option<JoinHandle<()>>,
}

impl LocationWatch {
    /// Wrap a receiver and the task feeding it (if any).
    pub fn new(rx: mpsc::Receiver<LocationFix>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Next fix, or `None` once the subscription ends.
    pub async fn next(&mut self) -> Option<LocationFix> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Admits a fix when either the interval elapsed or the device moved far
/// enough since the last admitted fix.
#[derive(Debug)]
pub struct MovementGate {
    options: WatchOptions,
    last: Option<(LocationFix, Instant)>,
}

impl MovementGate {
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    pub fn admit(&mut self, fix: LocationFix, now: Instant) -> bool {
        let admitted = match self.last {
            None => true,
            Some((prev, at)) => {
                now.duration_since(at) >= self.options.interval
                    || haversine_distance(prev.point(), fix.point()) >= self.options.min_distance
            }
        };
        if admitted {
            self.last = Some((fix, now));
        }
        admitted
    }
}

#[derive(Debug, Clone, Copy)]
struct ReportedFix {
    fix: LocationFix,
    received: Instant,
}

/// Provider fed by fixes that devices report over the API.
#[derive(Debug, Clone)]
pub struct ReportedLocationProvider {
    latest: watch::Sender<Option<ReportedFix>>,
    updates: broadcast::Sender<LocationFix>,
    max_age: Duration,
}

impl ReportedLocationProvider {
    /// `max_age` is how old a fix may be to count as current.
    pub fn new(max_age: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            latest,
            updates,
            max_age,
        }
    }

    /// Record a fix from the device.
    pub fn report(&self, fix: LocationFix) {
        self.latest.send_replace(Some(ReportedFix {
            fix,
            received: Instant::now(),
        }));
        // No subscribers is fine.
        let _ = self.updates.send(fix);
    }

    /// Most recent fix regardless of age.
    pub fn latest(&self) -> Option<LocationFix> {
        self.latest.borrow().map(|r| r.fix)
    }

    fn allowed_age(&self, accuracy: Accuracy) -> Duration {
        match accuracy {
            Accuracy::High => self.max_age,
            Accuracy::Balanced => self.max_age * BALANCED_AGE_FACTOR,
        }
    }
}

impl LocationProvider for ReportedLocationProvider {
    async fn current_fix(&self, accuracy: Accuracy) -> Result<LocationFix, LocationError> {
        let allowed_age = self.allowed_age(accuracy);
        let mut rx = self.latest.subscribe();
        loop {
            let fresh = rx
                .borrow_and_update()
                .filter(|r| r.received.elapsed() <= allowed_age)
                .map(|r| r.fix);
            if let Some(fix) = fresh {
                return Ok(fix);
            }
            rx.changed().await.map_err(|_| LocationError::Closed)?;
        }
    }

    fn watch(&self, options: WatchOptions) -> LocationWatch {
        let mut updates = self.updates.subscribe();
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);

        let task = tokio::spawn(async move {
            let mut gate = MovementGate::new(options);
            loop {
                match updates.recv().await {
                    Ok(fix) => {
                        if gate.admit(fix, Instant::now()) && tx.send(fix).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Location watch lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        LocationWatch::new(rx, Some(task))
    }
}

/// Get a fix: a high-accuracy attempt, then a balanced one, each bounded
/// by `timeout`. A fix that resolves after its timeout is discarded.
pub async fn acquire_fix<L: LocationProvider>(
    provider: &L,
    timeout: Duration,
) -> Result<LocationFix, LocationError> {
    let mut last_error = LocationError::Timeout;

    for accuracy in [Accuracy::High, Accuracy::Balanced] {
        match tokio::time::timeout(timeout, provider.current_fix(accuracy)).await {
            Ok(Ok(fix)) => return Ok(fix),
            Ok(Err(e)) => {
                tracing::warn!(?accuracy, error = %e, "Location fix failed");
                last_error = e;
            }
            Err(_) => {
                tracing::warn!(
                    ?accuracy,
                    timeout_ms = timeout.as_millis() as u64,
                    "Location fix timed out"
                );
                last_error = LocationError::Timeout;
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_current_fix_returns_fresh_report() {
        let provider = ReportedLocationProvider::new(Duration::from_secs(60));
        provider.report(LocationFix::new(37.0, -122.0));

        let fix = provider.current_fix(Accuracy::High).await.unwrap();
        assert_eq!(fix, LocationFix::new(37.0, -122.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fix_waits_then_times_out() {
        let provider = ReportedLocationProvider::new(Duration::from_secs(60));
        provider.report(LocationFix::new(37.0, -122.0));
        tokio::time::advance(Duration::from_secs(120)).await;

        // Too old for High, fine for Balanced.
        let result = acquire_fix(&provider, Duration::from_secs(12)).await;
        assert_eq!(result.unwrap(), LocationFix::new(37.0, -122.0));

        tokio::time::advance(Duration::from_secs(600)).await;
        let result = acquire_fix(&provider, Duration::from_secs(12)).await;
        assert!(matches!(result, Err(LocationError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_fix_wakes_on_report() {
        let provider = ReportedLocationProvider::new(Duration::from_secs(60));
        let waiter = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.current_fix(Accuracy::High).await })
        };
        tokio::task::yield_now().await;
        provider.report(LocationFix::new(1.0, 2.0));

        let fix = waiter.await.unwrap().unwrap();
        assert_eq!(fix, LocationFix::new(1.0, 2.0));
    }

    #[test]
    fn test_movement_gate() {
        let start = Instant::now();
        let mut gate = MovementGate::new(WatchOptions::default());
        let here = LocationFix::new(0.0, 0.0);
        // ~1 m east
        let near = LocationFix::new(0.0, 0.00001);
        // ~111 m east
        let far = LocationFix::new(0.0, 0.001);

        assert!(gate.admit(here, start));
        assert!(!gate.admit(near, start + Duration::from_secs(5)));
        assert!(gate.admit(far, start + Duration::from_secs(6)));
        assert!(!gate.admit(far, start + Duration::from_secs(10)));
        assert!(gate.admit(far, start + Duration::from_secs(36)));
    }

    #[tokio::test]
    async fn test_watch_filters_and_cancels() {
        let provider = ReportedLocationProvider::new(Duration::from_secs(60));
        let mut watch = provider.watch(WatchOptions::default());
        tokio::task::yield_now().await;

        provider.report(LocationFix::new(0.0, 0.0));
        provider.report(LocationFix::new(0.0, 0.00001));
        provider.report(LocationFix::new(0.0, 0.001));

        assert_eq!(watch.next().await, Some(LocationFix::new(0.0, 0.0)));
        assert_eq!(watch.next().await, Some(LocationFix::new(0.0, 0.001)));

        watch.cancel();
        assert_eq!(watch.next().await, None);
    }

    #[test]
    fn test_fix_validation() {
        assert!(LocationFix::new(37.0, -122.0).is_valid());
        assert!(!LocationFix::new(91.0, 0.0).is_valid());
        assert!(!LocationFix::new(0.0, f64::NAN).is_valid());
    }
}
