//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::ScoringConfig;
#[cfg(feature = "demo-location")]
use crate::services::LocationFix;
use crate::services::{TrackerConfig, WatchOptions};

/// Backing store for persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// One JSON file per key under `data_dir`
    File,
    /// Process-local; lost on restart
    Memory,
}

impl FromStr for StorageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(StorageKind::File),
            "memory" => Ok(StorageKind::Memory),
            _ => Err(()),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    pub storage: StorageKind,
    /// Directory for the file store
    pub data_dir: PathBuf,

    // --- Trip tracking ---
    /// Bound on each location fix attempt
    pub location_timeout: Duration,
    pub sample_interval: Duration,
    /// Meters
    pub sample_min_distance: f64,
    /// Reported fixes older than this are not "current"
    pub fix_max_age: Duration,

    // --- Scoring ---
    pub eco_score_co2_weight: f64,
    pub eco_score_waste_weight: f64,

    #[cfg(feature = "demo-location")]
    pub demo_location: Option<LocationFix>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            storage: StorageKind::Memory,
            data_dir: PathBuf::from("data"),
            location_timeout: Duration::from_millis(100),
            sample_interval: Duration::from_secs(30),
            sample_min_distance: 10.0,
            fix_max_age: Duration::from_secs(60),
            eco_score_co2_weight: 2.0,
            eco_score_waste_weight: 3.0,
            #[cfg(feature = "demo-location")]
            demo_location: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage = match env::var("STORAGE") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("STORAGE", raw.clone()))?,
            Err(_) => StorageKind::File,
        };

        let sample_min_distance: f64 = parse_var("SAMPLE_MIN_DISTANCE_M", 10.0)?;
        if !sample_min_distance.is_finite() || sample_min_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "SAMPLE_MIN_DISTANCE_M",
                sample_min_distance.to_string(),
            ));
        }

        let config = Self {
            port: parse_var("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            storage,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            location_timeout: Duration::from_secs(parse_var("LOCATION_TIMEOUT_SECS", 12)?),
            sample_interval: Duration::from_secs(parse_var("SAMPLE_INTERVAL_SECS", 30)?),
            sample_min_distance,
            fix_max_age: Duration::from_secs(parse_var("FIX_MAX_AGE_SECS", 60)?),
            eco_score_co2_weight: parse_weight("ECO_SCORE_CO2_WEIGHT", 2.0)?,
            eco_score_waste_weight: parse_weight("ECO_SCORE_WASTE_WEIGHT", 3.0)?,
            #[cfg(feature = "demo-location")]
            demo_location: parse_demo_location()?,
        };

        if config.location_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "LOCATION_TIMEOUT_SECS",
                "0".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            location_timeout: self.location_timeout,
            sampling: WatchOptions {
                interval: self.sample_interval,
                min_distance: self.sample_min_distance,
            },
            #[cfg(feature = "demo-location")]
            demo_location: self.demo_location,
        }
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            co2_weight: self.eco_score_co2_weight,
            waste_weight: self.eco_score_waste_weight,
            ..ScoringConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Score coefficients must be finite and non-negative to keep the score
/// monotonic.
fn parse_weight(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value: f64 = parse_var(name, default)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name, value.to_string()))
    }
}

/// `DEMO_LOCATION="lat,lon"`.
#[cfg(feature = "demo-location")]
fn parse_demo_location() -> Result<Option<LocationFix>, ConfigError> {
    let Ok(raw) = env::var("DEMO_LOCATION") else {
        return Ok(None);
    };
    let invalid = || ConfigError::Invalid("DEMO_LOCATION", raw.clone());

    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let fix = LocationFix {
        latitude: lat.trim().parse().map_err(|_| invalid())?,
        longitude: lon.trim().parse().map_err(|_| invalid())?,
        altitude: Some(100.0),
        accuracy: Some(10.0),
    };
    if !fix.is_valid() {
        return Err(invalid());
    }
    tracing::warn!(
        latitude = fix.latitude,
        longitude = fix.longitude,
        "Demo location fallback enabled"
    );
    Ok(Some(fix))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // One test touches the environment to avoid races between tests.
        env::set_var("PORT", "9090");
        env::set_var("STORAGE", "memory");
        env::set_var("ECO_SCORE_WASTE_WEIGHT", "4.5");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.port, 9090);
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.location_timeout, Duration::from_secs(12));
        assert_eq!(config.scoring_config().waste_weight, 4.5);
        assert_eq!(config.scoring_config().co2_weight, 2.0);

        env::set_var("ECO_SCORE_WASTE_WEIGHT", "-1");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("ECO_SCORE_WASTE_WEIGHT", _))
        ));

        env::set_var("ECO_SCORE_WASTE_WEIGHT", "3");
        env::set_var("STORAGE", "postgres");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("STORAGE", _))
        ));

        for name in ["PORT", "STORAGE", "ECO_SCORE_WASTE_WEIGHT"] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_tracker_config_mapping() {
        let config = Config::test_default();
        let tracker = config.tracker_config();
        assert_eq!(tracker.sampling.interval, Duration::from_secs(30));
        assert_eq!(tracker.sampling.min_distance, 10.0);
        assert_eq!(tracker.location_timeout, Duration::from_millis(100));
    }
}
