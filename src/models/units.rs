// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Display unit preferences and linear conversions.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const LB_TO_KG: f64 = 0.453592;
const KG_TO_LB: f64 = 2.20462;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum WeightUnit {
    #[default]
    Lb,
    Kg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CarbonUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Lb => "lb",
            WeightUnit::Kg => "kg",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "lb" => Some(WeightUnit::Lb),
            "kg" => Some(WeightUnit::Kg),
            _ => None,
        }
    }

    /// Convert `value` expressed in `self` into `to`.
    pub fn convert(self, value: f64, to: WeightUnit) -> f64 {
        match (self, to) {
            (WeightUnit::Lb, WeightUnit::Kg) => value * LB_TO_KG,
            (WeightUnit::Kg, WeightUnit::Lb) => value * KG_TO_LB,
            _ => value,
        }
    }

    pub fn format(self, value: f64) -> String {
        format!("{:.1} {}", value, self.label())
    }
}

impl CarbonUnit {
    pub fn label(self) -> &'static str {
        match self {
            CarbonUnit::Kg => "kg",
            CarbonUnit::Lb => "lb",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "kg" => Some(CarbonUnit::Kg),
            "lb" => Some(CarbonUnit::Lb),
            _ => None,
        }
    }

    pub fn convert(self, value: f64, to: CarbonUnit) -> f64 {
        match (self, to) {
            (CarbonUnit::Kg, CarbonUnit::Lb) => value * KG_TO_LB,
            (CarbonUnit::Lb, CarbonUnit::Kg) => value * LB_TO_KG,
            _ => value,
        }
    }

    pub fn format(self, value: f64) -> String {
        format!("{:.1} {} CO₂", value, self.label())
    }
}

/// Persisted unit preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UnitPreferences {
    pub weight_unit: WeightUnit,
    pub carbon_unit: CarbonUnit,
}
