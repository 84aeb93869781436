// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EcoTrack: log outdoor environmental actions and track GPS trips
//!
//! This crate provides the backend for the EcoTrack app: an action log,
//! a GPS trip tracker and impact statistics derived from the log.

pub mod config;
pub mod db;
pub mod error;
pub mod geo_utils;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::AnyStore;
use services::{EcoTracker, ReportedLocationProvider};

/// Tracker over the store and location provider used by the server.
pub type Tracker = EcoTracker<AnyStore, ReportedLocationProvider>;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tracker: Tracker,
}
