// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use ecotrack::config::Config;
use ecotrack::db::{AnyStore, EcoDb, MemoryStore};
use ecotrack::models::{ActionType, NewAction, ScoringConfig};
use ecotrack::routes::create_router;
use ecotrack::services::{
    Accuracy, EcoTracker, LocationError, LocationFix, LocationProvider, LocationWatch,
    ReportedLocationProvider, TrackerConfig, WatchOptions,
};
use ecotrack::AppState;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store for inspection.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let config = Config::test_default();
    let store = MemoryStore::new();

    let provider = Arc::new(ReportedLocationProvider::new(config.fix_max_age));
    let tracker = EcoTracker::new(
        EcoDb::new(AnyStore::Memory(store.clone())),
        provider,
        config.tracker_config(),
        config.scoring_config(),
    );

    let state = Arc::new(AppState { config, tracker });
    (create_router(state.clone()), state, store)
}

/// Location provider driven by the test.
///
/// `current_fix` answers with the configured fix, or never resolves when
/// there is none. Watch samples are pushed with [`ScriptedLocation::push`].
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedLocation {
    fix: Mutex<Option<LocationFix>>,
    watcher: Mutex<Option<mpsc::Sender<LocationFix>>>,
}

#[allow(dead_code)]
impl ScriptedLocation {
    pub fn set_fix(&self, fix: Option<LocationFix>) {
        *self.fix.lock().unwrap() = fix;
    }

    /// Deliver a sample to the active watch. Returns false if none.
    pub async fn push(&self, fix: LocationFix) -> bool {
        let tx = self.watcher.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(fix).await.is_ok(),
            None => false,
        }
    }

    /// Whether a watch subscription is open.
    pub fn watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl LocationProvider for ScriptedLocation {
    async fn current_fix(&self, _accuracy: Accuracy) -> Result<LocationFix, LocationError> {
        let fix = *self.fix.lock().unwrap();
        match fix {
            Some(fix) => Ok(fix),
            None => std::future::pending().await,
        }
    }

    fn watch(&self, _options: WatchOptions) -> LocationWatch {
        let (tx, rx) = mpsc::channel(16);
        *self.watcher.lock().unwrap() = Some(tx);
        LocationWatch::new(rx, None)
    }
}

#[allow(dead_code)]
pub type TestTracker = EcoTracker<MemoryStore, ScriptedLocation>;

/// Tracker over a fresh memory store with a scripted location source.
#[allow(dead_code)]
pub fn test_tracker() -> (TestTracker, Arc<ScriptedLocation>, MemoryStore) {
    let store = MemoryStore::new();
    let location = Arc::new(ScriptedLocation::default());
    let config = TrackerConfig {
        location_timeout: Duration::from_millis(50),
        ..TrackerConfig::default()
    };
    let tracker = EcoTracker::new(
        EcoDb::new(store.clone()),
        location.clone(),
        config,
        ScoringConfig::default(),
    );
    (tracker, location, store)
}

#[allow(dead_code)]
pub fn action(action_type: ActionType, impact: f64) -> NewAction {
    NewAction {
        action_type,
        description: format!("{:?} test", action_type),
        impact,
        impact_unit: None,
        location: None,
    }
}

/// Poll `check` until it passes or a second elapses.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
