//! Pure computations over a food entry set: day totals, goal progress,
//! range-filtered trend series and the today/history split.
//!
//! Calendar-day functions come in two flavors: the plain one uses the
//! machine's local time zone, the `_in` one takes an explicit zone.

pub mod progress;
pub mod range;
pub mod summary;
pub mod totals;

pub use progress::compute_goal_progress;
pub use range::{
    daily_totals_series, daily_totals_series_in, filter_by_range, partition_today,
    partition_today_in, trend_series, trend_series_in,
};
pub use summary::{health_summary, recent_entries, NutritionDashboard, RECENT_WINDOW};
pub use totals::{compute_daily_totals, compute_daily_totals_in, local_date, sum_totals};

#[cfg(test)]
mod properties;
