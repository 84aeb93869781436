// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed JSON records on top of a key-value store.
//!
//! Provides high-level operations for:
//! - Actions (JSON array)
//! - Trips (JSON object keyed by trip id)
//! - Current trip pointer
//! - Unit preferences

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::{keys, KeyValueStore, StoreError};
use crate::error::{AppError, Result};
use crate::models::{CarbonUnit, EcoAction, Trip, UnitPreferences, WeightUnit};

/// Trips keyed by id.
pub type TripMap = BTreeMap<String, Trip>;

/// Typed database handle. Cheap to clone.
pub struct EcoDb<S> {
    store: Arc<S>,
}

impl<S> Clone for EcoDb<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> EcoDb<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.store.get(key).await? {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                StoreError::Malformed {
                    key: key.to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::PersistenceFailure(format!("serialize {}: {}", key, e)))?;
        self.store.set(key, raw).await?;
        Ok(())
    }

    // ─── Action Operations ───────────────────────────────────────

    /// All stored actions, in storage order.
    pub async fn load_actions(&self) -> Result<Vec<EcoAction>> {
        self.read_json(keys::ACTIONS).await
    }

    pub async fn save_actions(&self, actions: &[EcoAction]) -> Result<()> {
        self.write_json(keys::ACTIONS, actions).await
    }

    // ─── Trip Operations ─────────────────────────────────────────

    pub async fn load_trips(&self) -> Result<TripMap> {
        self.read_json(keys::TRIPS).await
    }

    pub async fn save_trips(&self, trips: &TripMap) -> Result<()> {
        self.write_json(keys::TRIPS, trips).await
    }

    pub async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        Ok(self.load_trips().await?.remove(trip_id))
    }

    // ─── Current Trip Pointer ────────────────────────────────────

    pub async fn current_trip_id(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(keys::ACTIVE_TRIP)
            .await?
            .filter(|id| !id.is_empty()))
    }

    pub async fn set_current_trip_id(&self, trip_id: &str) -> Result<()> {
        self.store
            .set(keys::ACTIVE_TRIP, trip_id.to_string())
            .await?;
        Ok(())
    }

    pub async fn clear_current_trip_id(&self) -> Result<()> {
        self.store.remove(keys::ACTIVE_TRIP).await?;
        Ok(())
    }

    // ─── Preferences ─────────────────────────────────────────────

    /// Unit preferences. Unknown stored values fall back to defaults.
    pub async fn load_preferences(&self) -> Result<UnitPreferences> {
        let weight_unit = self
            .store
            .get(keys::WEIGHT_UNIT)
            .await?
            .and_then(|raw| WeightUnit::parse(&raw))
            .unwrap_or_default();
        let carbon_unit = self
            .store
            .get(keys::CARBON_UNIT)
            .await?
            .and_then(|raw| CarbonUnit::parse(&raw))
            .unwrap_or_default();

        Ok(UnitPreferences {
            weight_unit,
            carbon_unit,
        })
    }

    /// Save both units. If the second write fails the weight unit is put
    /// back, so preferences never end up half-applied.
    pub async fn save_preferences(&self, prefs: UnitPreferences) -> Result<()> {
        let previous_weight = self.store.get(keys::WEIGHT_UNIT).await?;

        self.store
            .set(keys::WEIGHT_UNIT, prefs.weight_unit.label().to_string())
            .await?;
        if let Err(e) = self
            .store
            .set(keys::CARBON_UNIT, prefs.carbon_unit.label().to_string())
            .await
        {
            let restored = match previous_weight {
                Some(raw) => self.store.set(keys::WEIGHT_UNIT, raw).await,
                None => self.store.remove(keys::WEIGHT_UNIT).await,
            };
            if let Err(restore_err) = restored {
                tracing::error!(error = %restore_err, "Failed to roll back weight unit");
            }
            return Err(e.into());
        }
        Ok(())
    }

    // ─── Bulk ────────────────────────────────────────────────────

    /// Remove all actions, trips and the current trip pointer.
    ///
    /// The pointer goes first and the action log last: a failure part way
    /// leaves no current trip, or no trips, but never trips without the
    /// actions attributed to them.
    pub async fn clear_all(&self) -> Result<()> {
        self.store
            .multi_remove(&[keys::ACTIVE_TRIP, keys::TRIPS, keys::ACTIONS])
            .await?;
        Ok(())
    }
}
