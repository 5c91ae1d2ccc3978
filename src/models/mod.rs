pub mod detection;
pub mod entry;
pub mod nutrition;

pub use detection::{DetectionCandidate, ImagePayload};
pub use entry::{FoodEntry, NewFoodEntry};
pub use nutrition::{DateRange, Goal, GoalProgress, HealthSummary, NutritionTotals, TrendPoint};
