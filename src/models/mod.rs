// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod action;
pub mod stats;
pub mod trip;
pub mod units;

pub use action::{ActionType, EcoAction, NewAction};
pub use stats::{Badge, BadgeThreshold, NextBadge, ScoringConfig, UserStats};
pub use trip::{Trip, TripLocation, TripStatus};
pub use units::{CarbonUnit, UnitPreferences, WeightUnit};
