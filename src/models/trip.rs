// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS-tracked trip model and its lifecycle transitions.

use chrono::{DateTime, Utc};
use geo::{Coord, LineString, Point};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::geo_utils::path_distance;
use crate::models::EcoAction;

/// Trip lifecycle state. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TripStatus {
    Active,
    Paused,
    Completed,
}

impl TripStatus {
    /// Active and paused trips are "current".
    pub fn is_current(self) -> bool {
        matches!(self, TripStatus::Active | TripStatus::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Paused => "paused",
            TripStatus::Completed => "completed",
        }
    }
}

/// One location sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    /// Capture time (Unix epoch milliseconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp: i64,
}

impl TripLocation {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Stored trip record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub status: TripStatus,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end_time: Option<DateTime<Utc>>,
    /// Samples in capture order
    pub locations: Vec<TripLocation>,
    /// Meters
    pub distance: f64,
    /// Milliseconds, set on completion
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration: i64,
    pub actions_logged: u32,
    pub waste_collected: f64,
    pub co2_offset: f64,
    pub start_location: Option<TripLocation>,
    pub end_location: Option<TripLocation>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// New active trip anchored at `start`.
    pub fn start(name: &str, start: TripLocation, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            status: TripStatus::Active,
            start_time: now,
            end_time: None,
            locations: vec![start],
            distance: 0.0,
            duration: 0,
            actions_logged: 0,
            waste_collected: 0.0,
            co2_offset: 0.0,
            start_location: Some(start),
            end_location: None,
            created_at: now,
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.status {
            TripStatus::Active => {
                self.status = TripStatus::Paused;
                Ok(())
            }
            other => Err(AppError::InvalidTransition(format!(
                "cannot pause a {} trip",
                other.as_str()
            ))),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.status {
            TripStatus::Paused => {
                self.status = TripStatus::Active;
                Ok(())
            }
            other => Err(AppError::InvalidTransition(format!(
                "cannot resume a {} trip",
                other.as_str()
            ))),
        }
    }

    /// Complete the trip with a final sample.
    pub fn complete(&mut self, end: TripLocation, now: DateTime<Utc>) -> Result<()> {
        if !self.status.is_current() {
            return Err(AppError::InvalidTransition(
                "trip is already completed".to_string(),
            ));
        }

        self.push_location(end);
        self.end_location = Some(end);
        self.end_time = Some(now);
        self.duration = (now - self.start_time).num_milliseconds();
        self.status = TripStatus::Completed;
        Ok(())
    }

    /// Append a sample and recompute the total distance.
    pub fn push_location(&mut self, location: TripLocation) {
        self.locations.push(location);
        self.distance = path_distance(&self.path());
    }

    /// Attribute a logged action to this trip's counters.
    pub fn record_action(&mut self, action: &EcoAction) {
        self.actions_logged += 1;
        self.waste_collected += action.impact;
        self.co2_offset += action.co2_offset;
    }

    /// Track as a line string (x = longitude, y = latitude).
    pub fn path(&self) -> LineString<f64> {
        self.locations
            .iter()
            .map(|l| Coord {
                x: l.longitude,
                y: l.latitude,
            })
            .collect()
    }

    /// Track encoded as a Google polyline (precision 5).
    pub fn encoded_polyline(&self) -> std::result::Result<String, String> {
        polyline::encode_coordinates(self.path(), 5).map_err(|e| e.to_string())
    }

    /// Track as a GeoJSON feature with summary properties.
    pub fn to_geojson(&self) -> geojson::Feature {
        let coordinates: Vec<Vec<f64>> = self
            .locations
            .iter()
            .map(|l| vec![l.longitude, l.latitude])
            .collect();

        let mut properties = geojson::JsonObject::new();
        properties.insert("name".to_string(), self.name.clone().into());
        properties.insert("status".to_string(), self.status.as_str().into());
        properties.insert("distance_m".to_string(), self.distance.into());
        properties.insert("duration_ms".to_string(), self.duration.into());
        properties.insert("actions_logged".to_string(), self.actions_logged.into());
        properties.insert(
            "start_time".to_string(),
            crate::time_utils::format_utc_rfc3339(self.start_time).into(),
        );

        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::LineString(
                coordinates,
            ))),
            id: Some(geojson::feature::Id::String(self.id.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Human-readable distance: meters below 1 km, otherwise km with one decimal.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round())
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// Human-readable duration from milliseconds.
pub fn format_duration(milliseconds: i64) -> String {
    let seconds = milliseconds.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, NewAction, WeightUnit};

    fn loc(lat: f64, lon: f64, ts: i64) -> TripLocation {
        TripLocation {
            latitude: lat,
            longitude: lon,
            altitude: None,
            accuracy: Some(5.0),
            timestamp: ts,
        }
    }

    #[test]
    fn test_start_trip() {
        let trip = Trip::start(" Skyline ", loc(37.0, -122.0, 0), Utc::now());
        assert_eq!(trip.name, "Skyline");
        assert_eq!(trip.status, TripStatus::Active);
        assert_eq!(trip.locations.len(), 1);
        assert_eq!(trip.distance, 0.0);
        assert_eq!(trip.start_location, Some(loc(37.0, -122.0, 0)));
    }

    #[test]
    fn test_pause_resume_transitions() {
        let mut trip = Trip::start("t", loc(0.0, 0.0, 0), Utc::now());
        assert!(matches!(trip.resume(), Err(AppError::InvalidTransition(_))));
        trip.pause().unwrap();
        assert_eq!(trip.status, TripStatus::Paused);
        assert!(matches!(trip.pause(), Err(AppError::InvalidTransition(_))));
        trip.resume().unwrap();
        assert_eq!(trip.status, TripStatus::Active);
    }

    #[test]
    fn test_complete_sets_duration_and_distance() {
        let start = Utc::now();
        let mut trip = Trip::start("t", loc(0.0, 0.0, 0), start);
        trip.push_location(loc(0.0, 0.5, 1));
        let end = start + chrono::Duration::minutes(90);
        trip.complete(loc(0.0, 1.0, 2), end).unwrap();

        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.duration, 90 * 60 * 1000);
        assert_eq!(trip.end_time, Some(end));
        assert!((trip.distance - 111_195.0).abs() < 5.0);
        assert!(matches!(
            trip.complete(loc(0.0, 1.0, 3), end),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_record_action_counters() {
        let mut trip = Trip::start("t", loc(0.0, 0.0, 0), Utc::now());
        for impact in [1.0, 2.0, 3.0] {
            let action = EcoAction::create(
                NewAction {
                    action_type: ActionType::Recycling,
                    description: "cans".to_string(),
                    impact,
                    impact_unit: None,
                    location: None,
                },
                WeightUnit::Lb,
                Utc::now(),
            );
            trip.record_action(&action);
        }
        assert_eq!(trip.actions_logged, 3);
        assert_eq!(trip.waste_collected, 6.0);
        assert!((trip.co2_offset - 19.2).abs() < 1e-9);
    }

    #[test]
    fn test_geojson_export() {
        let mut trip = Trip::start("Loop", loc(37.0, -122.0, 0), Utc::now());
        trip.push_location(loc(37.001, -122.001, 1));
        let feature = trip.to_geojson();
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["geometry"]["type"], "LineString");
        assert_eq!(json["geometry"]["coordinates"][0][0], -122.0);
        assert_eq!(json["properties"]["name"], "Loop");
    }

    #[test]
    fn test_encoded_polyline() {
        let mut trip = Trip::start("t", loc(38.5, -120.2, 0), Utc::now());
        trip.push_location(loc(40.7, -120.95, 1));
        trip.push_location(loc(43.252, -126.453, 2));
        assert_eq!(trip.encoded_polyline().unwrap(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(999.4), "999m");
        assert_eq!(format_distance(1500.0), "1.5km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45_000), "45s");
        assert_eq!(format_duration(125_000), "2m 5s");
        assert_eq!(format_duration(3_725_000), "1h 2m");
    }
}
