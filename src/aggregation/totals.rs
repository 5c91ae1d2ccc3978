use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::models::{FoodEntry, NutritionTotals};

/// Calendar date of `timestamp` as seen in `tz`.
pub fn local_date<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

pub fn sum_totals<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> NutritionTotals {
    entries.into_iter().sum()
}

/// Sum of the entries logged on `day` in local time. Matches by calendar
/// date, not by a rolling 24 hour window.
pub fn compute_daily_totals(entries: &[FoodEntry], day: NaiveDate) -> NutritionTotals {
    compute_daily_totals_in(entries, day, &Local)
}

pub fn compute_daily_totals_in<Tz: TimeZone>(
    entries: &[FoodEntry],
    day: NaiveDate,
    tz: &Tz,
) -> NutritionTotals {
    sum_totals(
        entries
            .iter()
            .filter(|entry| local_date(&entry.timestamp, tz) == day),
    )
}
