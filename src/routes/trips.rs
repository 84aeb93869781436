// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip tracking routes and device location reports.

use crate::error::{AppError, Result};
use crate::models::trip::{format_distance, format_duration};
use crate::models::Trip;
use crate::routes::api::validate_not_blank;
use crate::services::LocationFix;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/location", post(report_location))
        .route("/api/trips", get(list_trips).post(start_trip))
        .route("/api/trips/current", get(get_current_trip))
        .route("/api/trips/current/pause", post(pause_trip))
        .route("/api/trips/current/resume", post(resume_trip))
        .route("/api/trips/current/stop", post(stop_trip))
        .route("/api/trips/{id}", get(get_trip))
        .route("/api/trips/{id}/geojson", get(get_trip_geojson))
}

/// Trip plus display strings.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripResponse {
    #[serde(flatten)]
    pub trip: Trip,
    pub distance_label: String,
    pub duration_label: String,
    /// Encoded track (precision 5), absent if it can't be encoded
    pub polyline: Option<String>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        let polyline = match trip.encoded_polyline() {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(trip_id = %trip.id, error = %e, "Failed to encode trip polyline");
                None
            }
        };
        Self {
            distance_label: format_distance(trip.distance),
            duration_label: format_duration(trip.duration),
            polyline,
            trip,
        }
    }
}

// ─── Location ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ReportLocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub altitude: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReportLocationResponse {
    pub accepted: bool,
}

/// Device reports its position; feeds trip starts, stops and sampling.
async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReportLocationRequest>,
) -> Result<Json<ReportLocationResponse>> {
    body.validate()?;

    state.tracker.trips().provider().report(LocationFix {
        latitude: body.latitude,
        longitude: body.longitude,
        altitude: body.altitude,
        accuracy: body.accuracy,
    });

    Ok(Json(ReportLocationResponse { accepted: true }))
}

// ─── Trips ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct StartTripRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 100))]
    pub name: String,
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartTripRequest>,
) -> Result<Json<TripResponse>> {
    body.validate()?;
    let trip = state.tracker.trips().start(body.name.trim()).await?;
    Ok(Json(trip.into()))
}

async fn list_trips(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TripResponse>>> {
    let trips = state.tracker.trips().list().await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

/// The active or paused trip, or `null`.
async fn get_current_trip(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<TripResponse>>> {
    let current = state.tracker.trips().current().await?;
    Ok(Json(current.map(TripResponse::from)))
}

async fn pause_trip(State(state): State<Arc<AppState>>) -> Result<Json<TripResponse>> {
    Ok(Json(state.tracker.trips().pause().await?.into()))
}

async fn resume_trip(State(state): State<Arc<AppState>>) -> Result<Json<TripResponse>> {
    Ok(Json(state.tracker.trips().resume().await?.into()))
}

async fn stop_trip(State(state): State<Arc<AppState>>) -> Result<Json<TripResponse>> {
    Ok(Json(state.tracker.trips().stop().await?.into()))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TripResponse>> {
    let trip = state
        .tracker
        .trips()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip {}", id)))?;
    Ok(Json(trip.into()))
}

async fn get_trip_geojson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<geojson::Feature>> {
    let trip = state
        .tracker
        .trips()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trip {}", id)))?;
    Ok(Json(trip.to_geojson()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripLocation;
    use chrono::Utc;

    #[test]
    fn test_report_location_validation() {
        let ok = ReportLocationRequest {
            latitude: 37.4,
            longitude: -122.1,
            altitude: None,
            accuracy: Some(8.0),
        };
        assert!(ok.validate().is_ok());

        let bad = ReportLocationRequest {
            latitude: 91.0,
            ..ok
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_start_trip_name_required() {
        let blank = StartTripRequest {
            name: "  ".to_string(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_trip_response_labels() {
        let start = TripLocation {
            latitude: 38.5,
            longitude: -120.2,
            altitude: None,
            accuracy: None,
            timestamp: 0,
        };
        let trip = Trip::start("Morning Walk", start, Utc::now());
        let response = TripResponse::from(trip);
        assert_eq!(response.distance_label, "0m");
        assert_eq!(response.duration_label, "0s");
        assert_eq!(response.polyline.as_deref(), Some("_p~iF~ps|U"));
    }
}
