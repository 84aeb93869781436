// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only log of environmental actions.

use chrono::{DateTime, Utc};

use crate::db::{EcoDb, KeyValueStore};
use crate::error::Result;
use crate::models::stats::recent_actions;
use crate::models::{EcoAction, NewAction, ScoringConfig, UserStats, WeightUnit};

/// Action storage over the typed database.
///
/// Callers serialize writes; see `EcoTracker::log_action`.
pub struct ActionLog<S> {
    db: EcoDb<S>,
}

impl<S> Clone for ActionLog<S> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<S: KeyValueStore> ActionLog<S> {
    pub fn new(db: EcoDb<S>) -> Self {
        Self { db }
    }

    /// Create and persist a new action.
    ///
    /// Returns the record and the list as it was before, for rollback.
    pub async fn append(
        &self,
        input: NewAction,
        weight_unit: WeightUnit,
        now: DateTime<Utc>,
    ) -> Result<(EcoAction, Vec<EcoAction>)> {
        let previous = self.db.load_actions().await?;
        let action = EcoAction::create(input, weight_unit, now);

        let mut updated = Vec::with_capacity(previous.len() + 1);
        updated.push(action.clone());
        updated.extend(previous.iter().cloned());
        self.db.save_actions(&updated).await?;

        tracing::info!(
            action_id = %action.id,
            action_type = ?action.action_type,
            impact = action.impact,
            co2_offset = action.co2_offset,
            "Action logged"
        );
        Ok((action, previous))
    }

    /// Replace the stored list wholesale.
    pub async fn restore(&self, actions: &[EcoAction]) -> Result<()> {
        self.db.save_actions(actions).await
    }

    pub async fn all(&self) -> Result<Vec<EcoAction>> {
        self.db.load_actions().await
    }

    /// The `limit` most recent actions, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<EcoAction>> {
        let actions = self.db.load_actions().await?;
        Ok(recent_actions(&actions, limit))
    }

    /// Aggregate stats recomputed from the full history.
    pub async fn stats(&self, scoring: &ScoringConfig) -> Result<UserStats> {
        let actions = self.db.load_actions().await?;
        Ok(UserStats::compute(&actions, scoring))
    }
}
