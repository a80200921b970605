use std::{cmp::Reverse, collections::BTreeMap};

use serde::Serialize;
use time::{macros::format_description, Date, Duration, OffsetDateTime, UtcOffset};

use super::repo_types::FoodEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl NutritionTotals {
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut acc, e| {
            acc.calories += e.calories;
            acc.protein += e.protein;
            acc.carbs += e.carbs;
            acc.fats += e.fats;
            acc
        })
    }
}

/// Calendar date of `at` as seen by a viewer at `offset`.
pub fn local_date(at: OffsetDateTime, offset: UtcOffset) -> Date {
    at.to_offset(offset).date()
}

/// Sums entries created during `date` (local midnight to midnight).
pub fn daily_totals(entries: &[FoodEntry], date: Date, offset: UtcOffset) -> NutritionTotals {
    NutritionTotals::of(
        entries
            .iter()
            .filter(|e| local_date(e.created_at, offset) == date),
    )
}

/// Entries no older than `days` before `reference`, in their original order.
pub fn recent_window(entries: &[FoodEntry], days: i64, reference: OffsetDateTime) -> Vec<FoodEntry> {
    let cutoff = reference - Duration::days(days);
    entries
        .iter()
        .filter(|e| e.created_at >= cutoff)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub label: String,
    pub date: Date,
    pub entries: Vec<FoodEntry>,
}

pub fn day_label(date: Date, today: Date) -> String {
    if date == today {
        return "Today".into();
    }
    if today.previous_day() == Some(date) {
        return "Yesterday".into();
    }
    date.format(format_description!("[month repr:long] [day padding:none], [year]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Buckets entries per local day: Today, then Yesterday, then remaining dates
/// newest first. Entry order inside a bucket is preserved.
pub fn group_by_day(entries: &[FoodEntry], today: Date, offset: UtcOffset) -> Vec<DayGroup> {
    let mut buckets: BTreeMap<Date, Vec<FoodEntry>> = BTreeMap::new();
    for e in entries {
        buckets
            .entry(local_date(e.created_at, offset))
            .or_default()
            .push(e.clone());
    }

    let yesterday = today.previous_day();
    let rank = |d: Date| {
        if d == today {
            0
        } else if Some(d) == yesterday {
            1
        } else {
            2
        }
    };

    let mut groups: Vec<DayGroup> = buckets
        .into_iter()
        .map(|(date, entries)| DayGroup {
            label: day_label(date, today),
            date,
            entries,
        })
        .collect();
    groups.sort_by_key(|g| (rank(g.date), Reverse(g.date)));
    groups
}
