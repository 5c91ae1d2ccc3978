use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use super::totals::local_date;
use crate::models::{DateRange, FoodEntry, NutritionTotals, TrendPoint};

const LABEL_FORMAT: &str = "%Y-%m-%d";

/// Entries inside `range` ending at `now`, ascending by timestamp. Entries
/// with equal timestamps keep their relative order.
pub fn filter_by_range(entries: &[FoodEntry], range: DateRange, now: DateTime<Utc>) -> Vec<FoodEntry> {
    let cutoff = range.cutoff(now);
    let mut selected: Vec<FoodEntry> = entries
        .iter()
        .filter(|entry| cutoff.map_or(true, |cutoff| entry.timestamp >= cutoff))
        .cloned()
        .collect();
    selected.sort_by_key(|entry| entry.timestamp);
    selected
}

/// Split into `(today, history)` by local calendar date of `now`.
pub fn partition_today(entries: &[FoodEntry], now: DateTime<Utc>) -> (Vec<FoodEntry>, Vec<FoodEntry>) {
    partition_today_in(entries, now, &Local)
}

pub fn partition_today_in<Tz: TimeZone>(
    entries: &[FoodEntry],
    now: DateTime<Utc>,
    tz: &Tz,
) -> (Vec<FoodEntry>, Vec<FoodEntry>) {
    let today = local_date(&now, tz);
    entries
        .iter()
        .cloned()
        .partition(|entry| local_date(&entry.timestamp, tz) == today)
}

/// One chart point per entry in `range`, oldest first.
pub fn trend_series(entries: &[FoodEntry], range: DateRange, now: DateTime<Utc>) -> Vec<TrendPoint> {
    trend_series_in(entries, range, now, &Local)
}

pub fn trend_series_in<Tz: TimeZone>(
    entries: &[FoodEntry],
    range: DateRange,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<TrendPoint> {
    filter_by_range(entries, range, now)
        .iter()
        .map(|entry| {
            let date = local_date(&entry.timestamp, tz);
            TrendPoint {
                label: date.format(LABEL_FORMAT).to_string(),
                date,
                timestamp: Some(entry.timestamp),
                totals: NutritionTotals::of_entry(entry),
            }
        })
        .collect()
}

/// One chart point per calendar day in `range` holding that day's totals,
/// oldest day first. Days without entries are omitted.
pub fn daily_totals_series(entries: &[FoodEntry], range: DateRange, now: DateTime<Utc>) -> Vec<TrendPoint> {
    daily_totals_series_in(entries, range, now, &Local)
}

pub fn daily_totals_series_in<Tz: TimeZone>(
    entries: &[FoodEntry],
    range: DateRange,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, NutritionTotals> = BTreeMap::new();
    for entry in filter_by_range(entries, range, now) {
        *days.entry(local_date(&entry.timestamp, tz)).or_default() +=
            NutritionTotals::of_entry(&entry);
    }

    days.into_iter()
        .map(|(date, totals)| TrendPoint {
            label: date.format(LABEL_FORMAT).to_string(),
            date,
            timestamp: None,
            totals,
        })
        .collect()
}
