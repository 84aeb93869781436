// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Logged environmental actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::units::WeightUnit;

/// Kind of environmental action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActionType {
    TrashPickup,
    Recycling,
    ZeroWasteCamping,
    Education,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::TrashPickup,
        ActionType::Recycling,
        ActionType::ZeroWasteCamping,
        ActionType::Education,
    ];

    /// CO₂ offset (kg) per unit of impact.
    pub fn co2_factor(self) -> f64 {
        match self {
            ActionType::TrashPickup => 2.1,
            ActionType::Recycling => 3.2,
            ActionType::ZeroWasteCamping => 1.5,
            ActionType::Education => 0.5,
        }
    }

    /// Whether `impact` is a weight. Camping counts days and education
    /// counts people, so neither contributes to waste totals.
    pub fn is_weight_bearing(self) -> bool {
        match self {
            ActionType::TrashPickup | ActionType::Recycling => true,
            ActionType::ZeroWasteCamping | ActionType::Education => false,
        }
    }

    /// Unit label for `impact`.
    pub fn default_unit(self, weight_unit: WeightUnit) -> &'static str {
        match self {
            ActionType::TrashPickup | ActionType::Recycling => weight_unit.label(),
            ActionType::ZeroWasteCamping => "days",
            ActionType::Education => "people",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ActionType::TrashPickup => "Trash Pickup",
            ActionType::Recycling => "Recycling",
            ActionType::ZeroWasteCamping => "Zero Waste Camping",
            ActionType::Education => "Education & Awareness",
        }
    }

    pub fn blurb(self) -> &'static str {
        match self {
            ActionType::TrashPickup => "Remove litter from trails and campsites",
            ActionType::Recycling => "Properly sort and recycle materials",
            ActionType::ZeroWasteCamping => "Leave no trace camping practices",
            ActionType::Education => "Share eco-knowledge with others",
        }
    }

    /// CO₂ offset for a given impact.
    pub fn co2_offset(self, impact: f64) -> f64 {
        impact * self.co2_factor()
    }
}

/// Stored action record. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EcoAction {
    /// UUIDv4 assigned at creation
    pub id: String,
    pub action_type: ActionType,
    pub description: String,
    /// Weight, day count or person count depending on `action_type`
    pub impact: f64,
    pub impact_unit: String,
    pub location: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    /// `impact * co2_factor`, fixed at creation
    pub co2_offset: f64,
}

/// Validated input for logging an action.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub action_type: ActionType,
    pub description: String,
    pub impact: f64,
    /// Defaults to the action type's unit when absent
    pub impact_unit: Option<String>,
    pub location: Option<String>,
}

impl EcoAction {
    /// Build a new record stamped with `now`.
    pub fn create(input: NewAction, weight_unit: WeightUnit, now: DateTime<Utc>) -> Self {
        let impact_unit = input
            .impact_unit
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| input.action_type.default_unit(weight_unit).to_string());

        let location = input
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_type: input.action_type,
            description: input.description.trim().to_string(),
            impact: input.impact,
            impact_unit,
            location,
            timestamp: now,
            co2_offset: input.action_type.co2_offset(input.impact),
        }
    }

    /// Contribution to the waste total (zero for non-weight actions).
    pub fn waste_weight(&self) -> f64 {
        if self.action_type.is_weight_bearing() {
            self.impact
        } else {
            0.0
        }
    }
}
