// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip lifecycle service.
//!
//! Owns the "current trip" state machine:
//! 1. `start` acquires a fix and creates an active trip
//! 2. A background sampler appends fixes while the trip is active
//! 3. `pause`/`resume` stop and restart sampling
//! 4. `stop` takes a final fix and completes the trip
//!
//! Every transition, sample write and action attribution runs under one
//! lifecycle lock, so "read pointer, check, write" is never interleaved.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::db::records::TripMap;
use crate::db::{EcoDb, KeyValueStore};
use crate::error::{AppError, Result};
use crate::models::{EcoAction, Trip, TripLocation, TripStatus};
use crate::services::location::{
    acquire_fix, LocationFix, LocationProvider, LocationWatch, WatchOptions,
};

/// Tracker tuning.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Bound on each location fix attempt
    pub location_timeout: Duration,
    pub sampling: WatchOptions,
    /// Fallback coordinate when no fix can be obtained
    #[cfg(feature = "demo-location")]
    pub demo_location: Option<LocationFix>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            location_timeout: Duration::from_secs(12),
            sampling: WatchOptions::default(),
            #[cfg(feature = "demo-location")]
            demo_location: None,
        }
    }
}

struct Sampler {
    trip_id: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    sampler: Option<Sampler>,
    /// Bumped whenever sampling starts or stops; samples from an older
    /// generation are discarded.
    generation: u64,
}

struct Inner<S, L> {
    db: EcoDb<S>,
    provider: Arc<L>,
    config: TrackerConfig,
    lifecycle: Mutex<Lifecycle>,
}

/// Trip tracker. Cheap to clone; clones share state.
pub struct TripTracker<S, L> {
    inner: Arc<Inner<S, L>>,
}

impl<S, L> Clone for TripTracker<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl<S: KeyValueStore, L: LocationProvider> TripTracker<S, L> {
    pub fn new(db: EcoDb<S>, provider: Arc<L>, config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                provider,
                config,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn provider(&self) -> &L {
        &self.inner.provider
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// The active or paused trip, if any.
    pub async fn current(&self) -> Result<Option<Trip>> {
        let _guard = self.inner.lifecycle.lock().await;
        self.inner.load_current().await.map(|c| c.map(|(_, trip)| trip))
    }

    pub async fn get(&self, trip_id: &str) -> Result<Option<Trip>> {
        self.inner.db.get_trip(trip_id).await
    }

    /// All trips, newest first.
    pub async fn list(&self) -> Result<Vec<Trip>> {
        let mut trips: Vec<Trip> = self.inner.db.load_trips().await?.into_values().collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    /// Whether a background sampler is running.
    pub async fn is_sampling(&self) -> bool {
        self.inner.lifecycle.lock().await.sampler.is_some()
    }

    // ─── Transitions ─────────────────────────────────────────────

    /// Start a new trip. Fails if a trip is already current.
    pub async fn start(&self, name: &str) -> Result<Trip> {
        {
            let _guard = self.inner.lifecycle.lock().await;
            self.inner.ensure_no_current().await?;
        }

        // The fix may take a while; don't hold the lock for it.
        let fix = self.inner.locate().await?;

        let mut lifecycle = self.inner.lifecycle.lock().await;
        // Another start may have won while we waited for the fix.
        self.inner.ensure_no_current().await?;

        let trip = Trip::start(name, fix.sample(now_millis()), Utc::now());
        let before = self.inner.db.load_trips().await?;
        let mut after = before.clone();
        after.insert(trip.id.clone(), trip.clone());

        self.inner.db.save_trips(&after).await?;
        if let Err(e) = self.inner.db.set_current_trip_id(&trip.id).await {
            self.inner.rollback_trips(&before).await;
            return Err(e);
        }

        Inner::start_sampler(&self.inner, &mut lifecycle, &trip.id);
        tracing::info!(trip_id = %trip.id, name = %trip.name, "Trip started");
        Ok(trip)
    }

    pub async fn pause(&self) -> Result<Trip> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let (mut trips, mut trip) = self.inner.require_current().await?;

        trip.pause()?;
        trips.insert(trip.id.clone(), trip.clone());
        self.inner.db.save_trips(&trips).await?;

        Inner::<S, L>::stop_sampler(&mut lifecycle);
        tracing::info!(trip_id = %trip.id, distance_m = trip.distance, "Trip paused");
        Ok(trip)
    }

    pub async fn resume(&self) -> Result<Trip> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let (mut trips, mut trip) = self.inner.require_current().await?;

        trip.resume()?;
        trips.insert(trip.id.clone(), trip.clone());
        self.inner.db.save_trips(&trips).await?;

        Inner::start_sampler(&self.inner, &mut lifecycle, &trip.id);
        tracing::info!(trip_id = %trip.id, "Trip resumed");
        Ok(trip)
    }

    /// Complete the current trip.
    ///
    /// The final fix is best effort: on failure the start location is
    /// reused so a GPS outage never blocks ending a trip.
    pub async fn stop(&self) -> Result<Trip> {
        let trip_id = {
            let _guard = self.inner.lifecycle.lock().await;
            let (_, trip) = self.inner.require_current().await?;
            trip.id
        };

        let final_fix = self.inner.locate().await;

        let mut lifecycle = self.inner.lifecycle.lock().await;
        let (before, mut trip) = self.inner.require_current().await?;
        if trip.id != trip_id {
            return Err(AppError::InvalidTransition(
                "current trip changed while stopping".to_string(),
            ));
        }

        let end = match final_fix {
            Ok(fix) => fix.sample(now_millis()),
            Err(e) => {
                tracing::warn!(trip_id = %trip.id, error = %e, "No final fix, reusing start location");
                let start = trip
                    .start_location
                    .or_else(|| trip.locations.first().copied())
                    .ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!("trip {} has no locations", trip.id))
                    })?;
                TripLocation {
                    timestamp: now_millis(),
                    ..start
                }
            }
        };

        trip.complete(end, Utc::now())?;
        let mut after = before.clone();
        after.insert(trip.id.clone(), trip.clone());

        self.inner.db.save_trips(&after).await?;
        if let Err(e) = self.inner.db.clear_current_trip_id().await {
            self.inner.rollback_trips(&before).await;
            return Err(e);
        }

        Inner::<S, L>::stop_sampler(&mut lifecycle);
        tracing::info!(
            trip_id = %trip.id,
            distance_m = trip.distance,
            duration_ms = trip.duration,
            actions = trip.actions_logged,
            "Trip completed"
        );
        Ok(trip)
    }

    // ─── Side Effects ────────────────────────────────────────────

    /// Attribute a logged action to the current trip if it is active.
    ///
    /// Returns the updated trip, or `None` when nothing was attributed.
    pub async fn record_action(&self, action: &EcoAction) -> Result<Option<Trip>> {
        let _guard = self.inner.lifecycle.lock().await;
        let Some((mut trips, mut trip)) = self.inner.load_current().await? else {
            return Ok(None);
        };
        if trip.status != TripStatus::Active {
            return Ok(None);
        }

        trip.record_action(action);
        trips.insert(trip.id.clone(), trip.clone());
        self.inner.db.save_trips(&trips).await?;

        tracing::debug!(
            trip_id = %trip.id,
            action_id = %action.id,
            actions = trip.actions_logged,
            "Action attributed to trip"
        );
        Ok(Some(trip))
    }

    /// Resume sampling for a persisted active trip (after a restart).
    pub async fn restore(&self) -> Result<Option<Trip>> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let current = self.inner.load_current().await?;
        if let Some((_, trip)) = &current {
            if trip.status == TripStatus::Active {
                Inner::start_sampler(&self.inner, &mut lifecycle, &trip.id);
                tracing::info!(trip_id = %trip.id, "Restored trip sampling");
            }
        }
        Ok(current.map(|(_, trip)| trip))
    }

    /// Stop background sampling without changing any trip.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        Inner::<S, L>::stop_sampler(&mut lifecycle);
    }

    /// Run `f` under the lifecycle lock and stop sampling once it succeeds.
    ///
    /// No sample is written while `f` runs since samples take the same
    /// lock. If `f` fails the sampler keeps running for the current trip.
    pub(crate) async fn then_stop_sampling<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let value = f().await?;
        Inner::<S, L>::stop_sampler(&mut lifecycle);
        Ok(value)
    }
}

impl<S: KeyValueStore, L: LocationProvider> Inner<S, L> {
    /// Current trip with the full trip map, if the pointer resolves.
    async fn load_current(&self) -> Result<Option<(TripMap, Trip)>> {
        let Some(trip_id) = self.db.current_trip_id().await? else {
            return Ok(None);
        };
        let trips = self.db.load_trips().await?;
        match trips.get(&trip_id) {
            Some(trip) if trip.status.is_current() => {
                let trip = trip.clone();
                Ok(Some((trips, trip)))
            }
            _ => {
                tracing::warn!(trip_id = %trip_id, "Current trip pointer is stale");
                Ok(None)
            }
        }
    }

    async fn require_current(&self) -> Result<(TripMap, Trip)> {
        self.load_current().await?.ok_or(AppError::NoActiveTrip)
    }

    async fn ensure_no_current(&self) -> Result<()> {
        match self.load_current().await? {
            Some((_, trip)) => Err(AppError::InvalidTransition(format!(
                "trip {} is already {}",
                trip.id,
                trip.status.as_str()
            ))),
            None => Ok(()),
        }
    }

    async fn locate(&self) -> Result<LocationFix> {
        match acquire_fix(self.provider.as_ref(), self.config.location_timeout).await {
            Ok(fix) => Ok(fix),
            #[cfg(feature = "demo-location")]
            Err(e) if self.config.demo_location.is_some() => {
                tracing::warn!(error = %e, "Using demo location fallback");
                self.config
                    .demo_location
                    .ok_or_else(|| AppError::LocationUnavailable(e.to_string()))
            }
            Err(e) => Err(AppError::LocationUnavailable(e.to_string())),
        }
    }

    /// Put the trips document back after a failed multi-key update.
    async fn rollback_trips(&self, before: &TripMap) {
        if let Err(e) = self.db.save_trips(before).await {
            tracing::error!(error = %e, "Failed to roll back trips after write failure");
        }
    }

    fn start_sampler(this: &Arc<Self>, lifecycle: &mut Lifecycle, trip_id: &str) {
        Self::stop_sampler(lifecycle);

        let generation = lifecycle.generation;
        let watch = this.provider.watch(this.config.sampling);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(Self::run_sampler(
            this.clone(),
            trip_id.to_string(),
            generation,
            watch,
            shutdown_rx,
        ));

        lifecycle.sampler = Some(Sampler {
            trip_id: trip_id.to_string(),
            shutdown,
            task,
        });
    }

    fn stop_sampler(lifecycle: &mut Lifecycle) {
        lifecycle.generation += 1;
        if let Some(sampler) = lifecycle.sampler.take() {
            // The task may be waiting for the lifecycle lock we hold; it
            // will see the new generation and drop its sample.
            let _ = sampler.shutdown.send(());
            tracing::debug!(trip_id = %sampler.trip_id, "Sampler stopped");
            drop(sampler.task);
        }
    }

    async fn run_sampler(
        this: Arc<Self>,
        trip_id: String,
        generation: u64,
        mut watch: LocationWatch,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tracing::debug!(trip_id = %trip_id, generation, "Sampler running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                fix = watch.next() => {
                    let Some(fix) = fix else {
                        tracing::debug!(trip_id = %trip_id, "Location watch ended");
                        break;
                    };
                    if let Err(e) = this.apply_sample(&trip_id, generation, fix).await {
                        tracing::warn!(trip_id = %trip_id, error = %e, "Dropped location sample");
                    }
                }
            }
        }
        watch.cancel();
    }

    async fn apply_sample(&self, trip_id: &str, generation: u64, fix: LocationFix) -> Result<()> {
        if !fix.is_valid() {
            return Err(AppError::Validation("fix out of range".to_string()));
        }

        let lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation {
            return Ok(());
        }

        let Some((mut trips, mut trip)) = self.load_current().await? else {
            return Ok(());
        };
        if trip.id != trip_id || trip.status != TripStatus::Active {
            return Ok(());
        }

        trip.push_location(fix.sample(now_millis()));
        trips.insert(trip.id.clone(), trip.clone());
        self.db.save_trips(&trips).await?;
        drop(lifecycle);

        tracing::debug!(
            trip_id = %trip.id,
            samples = trip.locations.len(),
            distance_m = trip.distance,
            "Location sample recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::location::ReportedLocationProvider;

    fn tracker() -> (
        TripTracker<MemoryStore, ReportedLocationProvider>,
        Arc<ReportedLocationProvider>,
        MemoryStore,
    ) {
        let store = MemoryStore::new();
        let provider = Arc::new(ReportedLocationProvider::new(Duration::from_secs(60)));
        let config = TrackerConfig {
            location_timeout: Duration::from_millis(50),
            ..TrackerConfig::default()
        };
        let tracker = TripTracker::new(EcoDb::new(store.clone()), provider.clone(), config);
        (tracker, provider, store)
    }

    #[tokio::test]
    async fn test_start_requires_fix() {
        let (tracker, _, store) = tracker();
        let result = tracker.start("No GPS").await;
        assert!(matches!(result, Err(AppError::LocationUnavailable(_))));
        assert_eq!(store.raw(crate::db::keys::TRIPS), None);
        assert_eq!(store.raw(crate::db::keys::ACTIVE_TRIP), None);
    }

    #[tokio::test]
    async fn test_lifecycle_and_sampler_state() {
        let (tracker, provider, _) = tracker();
        provider.report(LocationFix::new(37.0, -122.0));

        let trip = tracker.start("Loop").await.unwrap();
        assert!(tracker.is_sampling().await);

        tracker.pause().await.unwrap();
        assert!(!tracker.is_sampling().await);

        tracker.resume().await.unwrap();
        assert!(tracker.is_sampling().await);

        let done = tracker.stop().await.unwrap();
        assert_eq!(done.id, trip.id);
        assert!(!tracker.is_sampling().await);
        assert!(tracker.current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_pointer_is_not_current() {
        let (tracker, _, store) = tracker();
        store.insert_raw(crate::db::keys::ACTIVE_TRIP, "ghost");
        assert!(tracker.current().await.unwrap().is_none());
        assert!(matches!(tracker.pause().await, Err(AppError::NoActiveTrip)));
    }
}
