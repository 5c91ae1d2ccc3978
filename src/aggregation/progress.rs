use crate::models::{Goal, GoalProgress, NutritionTotals};

/// Percent of each goal reached, clamped to `0..=100`. A zero goal reports 0.
pub fn compute_goal_progress(totals: &NutritionTotals, goal: &Goal) -> GoalProgress {
    GoalProgress {
        calories: percent(totals.calories, goal.calories),
        protein: percent(totals.protein, goal.protein),
        carbs: percent(totals.carbs, goal.carbs),
        fat: percent(totals.fat, goal.fat),
    }
}

fn percent(total: f64, goal: f64) -> f64 {
    if goal > 0.0 {
        (total * 100.0 / goal).min(100.0).max(0.0)
    } else {
        0.0
    }
}
