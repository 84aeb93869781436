//! User statistics derived from the action history.
//!
//! Stats are never stored: they are recomputed from the full action list on
//! every read, so the same history always yields the same numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::EcoAction;

/// Milestone cutoff for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BadgeThreshold {
    ActionCount(u32),
    EcoScore(u64),
}

/// A named milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub threshold: BadgeThreshold,
}

impl Badge {
    fn new(name: &str, threshold: BadgeThreshold) -> Self {
        Self {
            name: name.to_string(),
            threshold,
        }
    }

    pub fn is_earned(&self, total_actions: u32, eco_score: u64) -> bool {
        match self.threshold {
            BadgeThreshold::ActionCount(n) => total_actions >= n,
            BadgeThreshold::EcoScore(n) => eco_score >= n,
        }
    }
}

/// Gamification tuning: eco-score coefficients and badge ladder.
///
/// Coefficients must be non-negative so the score stays monotonic; see
/// `Config::from_env`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub co2_weight: f64,
    pub waste_weight: f64,
    /// Evaluated in order; the first unearned badge is the "next" one
    pub badges: Vec<Badge>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use BadgeThreshold::{ActionCount, EcoScore};

        Self {
            co2_weight: 2.0,
            waste_weight: 3.0,
            badges: vec![
                Badge::new("First Step", ActionCount(1)),
                Badge::new("Getting Started", ActionCount(5)),
                Badge::new("Action Hero", ActionCount(10)),
                Badge::new("Eco Warrior", ActionCount(25)),
                Badge::new("Environmental Champion", ActionCount(50)),
                Badge::new("Rising Impact", EcoScore(50)),
                Badge::new("High Impact", EcoScore(100)),
                Badge::new("Eco Legend", EcoScore(250)),
                Badge::new("Planet Guardian", EcoScore(500)),
            ],
        }
    }
}

impl ScoringConfig {
    /// Composite score, non-decreasing in both inputs.
    pub fn eco_score(&self, total_co2: f64, total_waste: f64) -> u64 {
        let raw = total_co2 * self.co2_weight + total_waste * self.waste_weight;
        if raw.is_finite() && raw > 0.0 {
            raw.round() as u64
        } else {
            0
        }
    }
}

/// Progress toward the next unearned badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NextBadge {
    pub name: String,
    /// Actions or points still needed
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub remaining: u64,
    pub progress_percent: f64,
}

/// Aggregate statistics over all logged actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    pub total_actions: u32,
    /// Sum of weight-bearing impacts only
    pub total_waste_collected: f64,
    pub total_co2_offset: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub eco_score: u64,
    pub badges_earned: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_action_date: Option<DateTime<Utc>>,
    pub next_badge: Option<NextBadge>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_actions: 0,
            total_waste_collected: 0.0,
            total_co2_offset: 0.0,
            eco_score: 0,
            badges_earned: 0,
            last_action_date: None,
            next_badge: None,
        }
    }
}

impl UserStats {
    /// Compute stats from the full action history (any order).
    pub fn compute(actions: &[EcoAction], scoring: &ScoringConfig) -> Self {
        let total_actions = actions.len() as u32;
        let total_waste_collected: f64 = actions.iter().map(EcoAction::waste_weight).sum();
        let total_co2_offset: f64 = actions.iter().map(|a| a.co2_offset).sum();
        let eco_score = scoring.eco_score(total_co2_offset, total_waste_collected);

        let badges_earned = scoring
            .badges
            .iter()
            .filter(|b| b.is_earned(total_actions, eco_score))
            .count() as u32;

        let last_action_date = actions.iter().map(|a| a.timestamp).max();

        let next_badge = scoring
            .badges
            .iter()
            .find(|b| !b.is_earned(total_actions, eco_score))
            .map(|b| next_badge_progress(b, total_actions, eco_score));

        Self {
            total_actions,
            total_waste_collected,
            total_co2_offset,
            eco_score,
            badges_earned,
            last_action_date,
            next_badge,
        }
    }

    /// Names of the badges these stats have earned, in ladder order.
    pub fn earned_badges<'a>(&self, scoring: &'a ScoringConfig) -> Vec<&'a str> {
        scoring
            .badges
            .iter()
            .filter(|b| b.is_earned(self.total_actions, self.eco_score))
            .map(|b| b.name.as_str())
            .collect()
    }
}

fn next_badge_progress(badge: &Badge, total_actions: u32, eco_score: u64) -> NextBadge {
    let (current, target) = match badge.threshold {
        BadgeThreshold::ActionCount(n) => (u64::from(total_actions), u64::from(n)),
        BadgeThreshold::EcoScore(n) => (eco_score, n),
    };
    let progress_percent = if target == 0 {
        100.0
    } else {
        (current as f64 / target as f64 * 100.0).min(100.0)
    };

    NextBadge {
        name: badge.name.clone(),
        remaining: target.saturating_sub(current),
        progress_percent,
    }
}

/// The `limit` most recent actions, newest first.
///
/// Sorts by timestamp rather than trusting storage order.
pub fn recent_actions(actions: &[EcoAction], limit: usize) -> Vec<EcoAction> {
    let mut sorted = actions.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;
    use chrono::TimeZone;

    fn make_action(id: &str, action_type: ActionType, impact: f64, minute: u32) -> EcoAction {
        EcoAction {
            id: id.to_string(),
            action_type,
            description: format!("Test action {}", id),
            impact,
            impact_unit: "lb".to_string(),
            location: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap(),
            co2_offset: action_type.co2_offset(impact),
        }
    }

    #[test]
    fn test_empty_history() {
        let stats = UserStats::compute(&[], &ScoringConfig::default());
        assert_eq!(stats.total_actions, 0);
        assert_eq!(stats.eco_score, 0);
        assert_eq!(stats.badges_earned, 0);
        assert_eq!(stats.last_action_date, None);
        assert_eq!(stats.next_badge.unwrap().name, "First Step");
    }

    #[test]
    fn test_single_trash_pickup() {
        let actions = vec![make_action("a", ActionType::TrashPickup, 10.0, 0)];
        let stats = UserStats::compute(&actions, &ScoringConfig::default());

        assert_eq!(stats.total_actions, 1);
        assert_eq!(stats.total_waste_collected, 10.0);
        assert!((stats.total_co2_offset - 21.0).abs() < 1e-9);
        // 21 * 2 + 10 * 3
        assert_eq!(stats.eco_score, 72);
        // First Step + Rising Impact
        assert_eq!(stats.badges_earned, 2);
    }

    #[test]
    fn test_non_weight_impacts_excluded_from_waste() {
        let actions = vec![
            make_action("a", ActionType::ZeroWasteCamping, 3.0, 0),
            make_action("b", ActionType::Education, 12.0, 1),
            make_action("c", ActionType::Recycling, 2.0, 2),
        ];
        let stats = UserStats::compute(&actions, &ScoringConfig::default());

        assert_eq!(stats.total_waste_collected, 2.0);
        assert!((stats.total_co2_offset - (4.5 + 6.0 + 6.4)).abs() < 1e-9);
    }

    #[test]
    fn test_last_action_date_ignores_storage_order() {
        let actions = vec![
            make_action("old", ActionType::Recycling, 1.0, 5),
            make_action("new", ActionType::Recycling, 1.0, 30),
            make_action("mid", ActionType::Recycling, 1.0, 10),
        ];
        let stats = UserStats::compute(&actions, &ScoringConfig::default());
        assert_eq!(
            stats.last_action_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );

        let recent = recent_actions(&actions, 2);
        let ids: Vec<&str> = recent.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let actions = vec![
            make_action("a", ActionType::TrashPickup, 4.0, 0),
            make_action("b", ActionType::Education, 2.0, 1),
        ];
        let scoring = ScoringConfig::default();
        assert_eq!(
            UserStats::compute(&actions, &scoring),
            UserStats::compute(&actions, &scoring)
        );
    }

    #[test]
    fn test_score_and_badges_monotonic() {
        let scoring = ScoringConfig::default();
        let types = [
            ActionType::Education,
            ActionType::TrashPickup,
            ActionType::ZeroWasteCamping,
            ActionType::Recycling,
        ];
        let pool: Vec<EcoAction> = (0..60u32)
            .map(|i| {
                let action_type = types[(i % 4) as usize];
                make_action(&i.to_string(), action_type, 0.5 + f64::from(i % 7), i)
            })
            .collect();

        let forward: Vec<usize> = (0..pool.len()).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        let evens_then_odds: Vec<usize> = forward
            .iter()
            .filter(|i| *i % 2 == 0)
            .chain(forward.iter().filter(|i| *i % 2 == 1))
            .copied()
            .collect();
        let stride: Vec<usize> = (0..7)
            .flat_map(|start| (start..pool.len()).step_by(7))
            .collect();

        let mut finals = Vec::new();
        for order in [forward, reversed, evens_then_odds, stride] {
            assert_eq!(order.len(), pool.len());
            let mut actions = Vec::new();
            let mut previous = UserStats::compute(&actions, &scoring);
            for &i in &order {
                actions.push(pool[i].clone());
                let stats = UserStats::compute(&actions, &scoring);
                assert!(stats.eco_score >= previous.eco_score, "order {:?}", order);
                assert!(stats.badges_earned >= previous.badges_earned, "order {:?}", order);
                previous = stats;
            }
            assert_eq!(previous.badges_earned as usize, scoring.badges.len());
            assert!(previous.next_badge.is_none());
            finals.push(previous);
        }

        // Final totals do not depend on insertion order
        for stats in &finals[1..] {
            assert_eq!(stats.total_actions, finals[0].total_actions);
            assert_eq!(stats.eco_score, finals[0].eco_score);
            assert_eq!(stats.badges_earned, finals[0].badges_earned);
            assert_eq!(stats.last_action_date, finals[0].last_action_date);
            assert!((stats.total_co2_offset - finals[0].total_co2_offset).abs() < 1e-9);
        }
    }

    #[test]
    fn test_next_badge_progress() {
        let actions: Vec<EcoAction> = (0..3)
            .map(|i| make_action(&i.to_string(), ActionType::Education, 1.0, i))
            .collect();
        let stats = UserStats::compute(&actions, &ScoringConfig::default());
        let next = stats.next_badge.unwrap();
        assert_eq!(next.name, "Getting Started");
        assert_eq!(next.remaining, 2);
        assert!((next.progress_percent - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_earned_badge_names() {
        let actions = vec![make_action("a", ActionType::TrashPickup, 10.0, 0)];
        let scoring = ScoringConfig::default();
        let stats = UserStats::compute(&actions, &scoring);
        assert_eq!(
            stats.earned_badges(&scoring),
            vec!["First Step", "Rising Impact"]
        );
    }
}
