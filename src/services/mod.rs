// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod action_log;
pub mod location;
pub mod tracker;
pub mod trip;

pub use action_log::ActionLog;
pub use location::{
    acquire_fix, Accuracy, LocationError, LocationFix, LocationProvider, LocationWatch,
    ReportedLocationProvider, WatchOptions,
};
pub use tracker::{EcoTracker, LoggedAction};
pub use trip::{TrackerConfig, TripTracker};
