// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for actions, stats and preferences.

use crate::error::{AppError, Result};
use crate::models::{ActionType, EcoAction, NewAction, Trip, UnitPreferences, UserStats};
use crate::time_utils::format_last_action;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/action-types", get(get_action_types))
        .route("/api/actions", get(get_actions).post(log_action))
        .route("/api/stats", get(get_stats))
        .route("/api/preferences", get(get_preferences).put(put_preferences))
        .route("/api/data", delete(clear_data))
}

pub(crate) fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// ─── Action Catalogue ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActionTypeInfo {
    pub id: ActionType,
    pub title: String,
    pub description: String,
    pub impact_unit: String,
    pub co2_factor: f64,
    pub counts_as_waste: bool,
}

/// Action types with their units in the user's preferred weight unit.
async fn get_action_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActionTypeInfo>>> {
    let prefs = state.tracker.preferences().await?;

    let types = ActionType::ALL
        .iter()
        .map(|&t| ActionTypeInfo {
            id: t,
            title: t.title().to_string(),
            description: t.blurb().to_string(),
            impact_unit: t.default_unit(prefs.weight_unit).to_string(),
            co2_factor: t.co2_factor(),
            counts_as_waste: t.is_weight_bearing(),
        })
        .collect();

    Ok(Json(types))
}

// ─── Actions ─────────────────────────────────────────────────

/// Body for logging an action.
#[derive(Debug, Deserialize, Validate)]
pub struct LogActionRequest {
    pub action_type: ActionType,
    #[validate(custom(function = "validate_not_blank"), length(max = 500))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0))]
    pub impact: f64,
    #[validate(length(max = 20))]
    pub impact_unit: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogActionResponse {
    pub action: EcoAction,
    /// Current trip after attribution, if it was active
    pub trip: Option<Trip>,
}

async fn log_action(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogActionRequest>,
) -> Result<Json<LogActionResponse>> {
    body.validate()?;

    let logged = state
        .tracker
        .log_action(NewAction {
            action_type: body.action_type,
            description: body.description,
            impact: body.impact,
            impact_unit: body.impact_unit,
            location: body.location,
        })
        .await?;

    Ok(Json(LogActionResponse {
        action: logged.action,
        trip: logged.trip,
    }))
}

#[derive(Deserialize)]
struct ActionsQuery {
    /// Number of most recent actions
    limit: Option<usize>,
}

async fn get_actions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActionsQuery>,
) -> Result<Json<Vec<EcoAction>>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if limit == 0 {
        return Err(AppError::Validation("limit must be greater than 0".to_string()));
    }

    let actions = state
        .tracker
        .actions()
        .recent(limit.min(MAX_RECENT_LIMIT))
        .await?;
    Ok(Json(actions))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClearDataResponse {
    pub success: bool,
    pub message: String,
}

/// Permanently delete all actions and trips.
async fn clear_data(State(state): State<Arc<AppState>>) -> Result<Json<ClearDataResponse>> {
    state.tracker.clear_all_data().await?;
    Ok(Json(ClearDataResponse {
        success: true,
        message: "All actions and trips have been deleted.".to_string(),
    }))
}

// ─── Stats ───────────────────────────────────────────────────

/// Display strings in the user's preferred units.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FormattedStats {
    pub waste: String,
    pub co2: String,
    pub last_action: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: UserStats,
    pub badges: Vec<String>,
    pub formatted: FormattedStats,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let stats = state.tracker.stats().await?;
    let prefs = state.tracker.preferences().await?;

    let badges = stats
        .earned_badges(state.tracker.scoring())
        .into_iter()
        .map(String::from)
        .collect();

    // CO₂ offsets are computed in kilograms.
    let co2 = crate::models::CarbonUnit::Kg.convert(stats.total_co2_offset, prefs.carbon_unit);
    let formatted = FormattedStats {
        waste: prefs.weight_unit.format(stats.total_waste_collected),
        co2: prefs.carbon_unit.format(co2),
        last_action: format_last_action(stats.last_action_date, chrono::Utc::now()),
    };

    tracing::debug!(
        total_actions = stats.total_actions,
        eco_score = stats.eco_score,
        "Computed stats"
    );

    Ok(Json(StatsResponse {
        stats,
        badges,
        formatted,
    }))
}

// ─── Preferences ─────────────────────────────────────────────

async fn get_preferences(State(state): State<Arc<AppState>>) -> Result<Json<UnitPreferences>> {
    Ok(Json(state.tracker.preferences().await?))
}

async fn put_preferences(
    State(state): State<Arc<AppState>>,
    Json(prefs): Json<UnitPreferences>,
) -> Result<Json<UnitPreferences>> {
    state.tracker.set_preferences(prefs).await?;
    Ok(Json(prefs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(description: &str, impact: f64) -> LogActionRequest {
        LogActionRequest {
            action_type: ActionType::TrashPickup,
            description: description.to_string(),
            impact,
            impact_unit: None,
            location: None,
        }
    }

    #[test]
    fn test_log_action_validation() {
        assert!(request("Beach cleanup", 2.5).validate().is_ok());
        assert!(request("   ", 2.5).validate().is_err());
        assert!(request("Beach cleanup", 0.0).validate().is_err());
        assert!(request("Beach cleanup", -1.0).validate().is_err());
        assert!(request(&"x".repeat(501), 1.0).validate().is_err());
    }

    #[test]
    fn test_location_length_limit() {
        let mut req = request("Beach cleanup", 1.0);
        req.location = Some("y".repeat(201));
        assert!(req.validate().is_err());
    }
}
