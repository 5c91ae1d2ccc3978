use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use super::{
    progress::compute_goal_progress,
    range::{partition_today_in, trend_series_in},
    totals::{local_date, compute_daily_totals_in},
};
use crate::models::{
    DateRange, FoodEntry, Goal, GoalProgress, HealthSummary, NutritionTotals, TrendPoint,
};

/// Entries the profile's recent list and health summary cover.
pub const RECENT_WINDOW: usize = 5;

/// The `limit` newest entries by timestamp, newest first. Entries with equal
/// timestamps keep their relative order.
pub fn recent_entries(entries: &[FoodEntry], limit: usize) -> Vec<FoodEntry> {
    let mut recent = entries.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(limit);
    recent
}

/// Total calories and per-entry macro averages rounded to one decimal.
pub fn health_summary(entries: &[FoodEntry]) -> HealthSummary {
    if entries.is_empty() {
        return HealthSummary::default();
    }

    let totals: NutritionTotals = entries.iter().sum();
    let count = entries.len() as f64;
    HealthSummary {
        total_calories: totals.calories,
        avg_protein: round_tenth(totals.protein / count),
        avg_carbs: round_tenth(totals.carbs / count),
        avg_fat: round_tenth(totals.fat / count),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Every derived view the tracking screens render, recomputed from one entry set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionDashboard {
    pub today: NutritionTotals,
    pub progress: GoalProgress,
    pub today_entries: Vec<FoodEntry>,
    pub history: Vec<FoodEntry>,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<FoodEntry>,
    /// Computed over `recent`, not the whole history.
    pub summary: HealthSummary,
}

impl NutritionDashboard {
    pub fn build(entries: &[FoodEntry], goal: &Goal, range: DateRange, now: DateTime<Utc>) -> Self {
        Self::build_in(entries, goal, range, now, &Local)
    }

    pub fn build_in<Tz: TimeZone>(
        entries: &[FoodEntry],
        goal: &Goal,
        range: DateRange,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        let today = compute_daily_totals_in(entries, local_date(&now, tz), tz);
        let (today_entries, history) = partition_today_in(entries, now, tz);
        let recent = recent_entries(entries, RECENT_WINDOW);
        Self {
            progress: compute_goal_progress(&today, goal),
            today,
            today_entries,
            history,
            trend: trend_series_in(entries, range, now, tz),
            summary: health_summary(&recent),
            recent,
        }
    }
}
