// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Entry point tying the action log to the trip tracker.
//!
//! Logging an action:
//! 1. Append the action to the log
//! 2. Attribute it to the current trip if that trip is active
//! 3. If step 2 cannot be persisted, put the log back as it was

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::{EcoDb, KeyValueStore};
use crate::error::Result;
use crate::models::{EcoAction, NewAction, ScoringConfig, Trip, UnitPreferences, UserStats};
use crate::services::action_log::ActionLog;
use crate::services::location::LocationProvider;
use crate::services::trip::{TrackerConfig, TripTracker};

/// Result of logging an action.
#[derive(Debug, Clone)]
pub struct LoggedAction {
    pub action: EcoAction,
    /// The current trip after attribution, when it was active
    pub trip: Option<Trip>,
}

/// Action log plus trip tracker over one database.
pub struct EcoTracker<S, L> {
    db: EcoDb<S>,
    actions: ActionLog<S>,
    trips: TripTracker<S, L>,
    scoring: ScoringConfig,
    /// Serializes writers of the action list. Taken before the trip
    /// lifecycle lock, never after it.
    log_lock: Mutex<()>,
}

impl<S: KeyValueStore, L: LocationProvider> EcoTracker<S, L> {
    pub fn new(
        db: EcoDb<S>,
        provider: Arc<L>,
        tracker_config: TrackerConfig,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            actions: ActionLog::new(db.clone()),
            trips: TripTracker::new(db.clone(), provider, tracker_config),
            db,
            scoring,
            log_lock: Mutex::new(()),
        }
    }

    pub fn trips(&self) -> &TripTracker<S, L> {
        &self.trips
    }

    pub fn actions(&self) -> &ActionLog<S> {
        &self.actions
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Record a validated action and attribute it to the active trip.
    pub async fn log_action(&self, input: NewAction) -> Result<LoggedAction> {
        let _guard = self.log_lock.lock().await;
        let prefs = self.db.load_preferences().await?;

        let (action, previous) = self
            .actions
            .append(input, prefs.weight_unit, Utc::now())
            .await?;

        match self.trips.record_action(&action).await {
            Ok(trip) => Ok(LoggedAction { action, trip }),
            Err(e) => {
                if let Err(restore_err) = self.actions.restore(&previous).await {
                    tracing::error!(
                        action_id = %action.id,
                        error = %restore_err,
                        "Failed to roll back action log"
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn stats(&self) -> Result<UserStats> {
        self.actions.stats(&self.scoring).await
    }

    pub async fn preferences(&self) -> Result<UnitPreferences> {
        self.db.load_preferences().await
    }

    pub async fn set_preferences(&self, prefs: UnitPreferences) -> Result<()> {
        self.db.save_preferences(prefs).await?;
        tracing::info!(
            weight_unit = prefs.weight_unit.label(),
            carbon_unit = prefs.carbon_unit.label(),
            "Unit preferences updated"
        );
        Ok(())
    }

    /// Delete all actions and trips. Unit preferences are kept.
    pub async fn clear_all_data(&self) -> Result<()> {
        let _guard = self.log_lock.lock().await;
        self.trips
            .then_stop_sampling(|| self.db.clear_all())
            .await?;
        tracing::warn!("All actions and trips cleared");
        Ok(())
    }
}
