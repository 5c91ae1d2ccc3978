use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use super::*;
use crate::models::{DateRange, FoodEntry, Goal, NutritionTotals};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

prop_compose! {
    fn arb_entry()(
        id in 0u32..10_000,
        // Whole numbers keep float sums exact regardless of order.
        calories in 0u32..2_000,
        protein in 0u32..200,
        carbs in 0u32..300,
        fat in 0u32..150,
        // Sixty days back to two days ahead.
        offset_minutes in -86_400i64..2_880i64,
    ) -> FoodEntry {
        FoodEntry {
            id: format!("e{id}"),
            owner_id: "owner".into(),
            food_name: format!("food {id}"),
            calories: calories as f64,
            protein: protein as f64,
            carbs: carbs as f64,
            fat: fat as f64,
            timestamp: base() + Duration::minutes(offset_minutes),
        }
    }
}

fn arb_range() -> impl Strategy<Value = DateRange> {
    prop_oneof![Just(DateRange::All), Just(DateRange::Week), Just(DateRange::Month)]
}

fn contains(haystack: &[FoodEntry], needle: &FoodEntry) -> bool {
    haystack.iter().any(|entry| entry == needle)
}

proptest! {
    #[test]
    fn daily_totals_equal_sum_over_that_day(
        entries in prop::collection::vec(arb_entry(), 0..40),
        day_offset in -60i64..2,
    ) {
        let day = (base() + Duration::days(day_offset)).date_naive();
        let mut expected = NutritionTotals::default();
        for entry in entries.iter().filter(|e| e.timestamp.date_naive() == day) {
            expected += NutritionTotals::of_entry(entry);
        }

        prop_assert_eq!(compute_daily_totals_in(&entries, day, &Utc), expected);
    }

    #[test]
    fn daily_totals_ignore_order(entries in prop::collection::vec(arb_entry(), 0..40)) {
        let day = base().date_naive();
        let mut reversed = entries.clone();
        reversed.reverse();

        prop_assert_eq!(
            compute_daily_totals_in(&entries, day, &Utc),
            compute_daily_totals_in(&reversed, day, &Utc)
        );
    }

    #[test]
    fn narrower_ranges_are_subsets(
        entries in prop::collection::vec(arb_entry(), 0..40),
        now_offset in -10i64..10,
    ) {
        let now = base() + Duration::days(now_offset);
        let all = filter_by_range(&entries, DateRange::All, now);
        let month = filter_by_range(&entries, DateRange::Month, now);
        let week = filter_by_range(&entries, DateRange::Week, now);

        prop_assert_eq!(all.len(), entries.len());
        for entry in &week {
            prop_assert!(contains(&month, entry));
            prop_assert!(contains(&all, entry));
        }
        for entry in &month {
            prop_assert!(contains(&all, entry));
        }
    }

    #[test]
    fn filtered_output_is_ascending(
        entries in prop::collection::vec(arb_entry(), 0..40),
        range in arb_range(),
    ) {
        let filtered = filter_by_range(&entries, range, base());
        prop_assert!(filtered.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn goal_progress_stays_within_bounds(
        calories in 0.0f64..1e6, protein in 0.0f64..1e4, carbs in 0.0f64..1e4, fat in 0.0f64..1e4,
        goal_calories in 0.001f64..1e5, goal_protein in 0.001f64..1e3,
        goal_carbs in 0.001f64..1e3, goal_fat in 0.001f64..1e3,
    ) {
        let totals = NutritionTotals::new(calories, protein, carbs, fat);
        let goal = Goal { calories: goal_calories, protein: goal_protein, carbs: goal_carbs, fat: goal_fat };
        let progress = compute_goal_progress(&totals, &goal);

        for value in [progress.calories, progress.protein, progress.carbs, progress.fat] {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn partition_covers_every_entry_once(entries in prop::collection::vec(arb_entry(), 0..40)) {
        let (today, history) = partition_today_in(&entries, base(), &Utc);
        prop_assert_eq!(today.len() + history.len(), entries.len());
        prop_assert!(today.iter().all(|e| e.timestamp.date_naive() == base().date_naive()));
        prop_assert!(history.iter().all(|e| e.timestamp.date_naive() != base().date_naive()));
    }
}
