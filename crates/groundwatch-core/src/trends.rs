//! Time-bucketed and grouped aggregation for the analytics endpoints.
//!
//! All bucketing is by UTC calendar day. A trend window of `days` covers
//! today and the `days - 1` days before it, and every day in the window
//! gets a bucket even when nothing happened on it, so charts render a
//! contiguous axis without client-side gap filling.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Utc};
use groundwatch_types::TrendPoint;

/// Count `created` timestamps into daily buckets over the trailing window.
///
/// The window is the `days` UTC dates ending at `now`'s date, inclusive.
/// Timestamps outside the window are ignored. Buckets come back oldest
/// first, one per day, zero-filled.
pub fn daily_trend<I>(created: I, days: u32, now: DateTime<Utc>) -> Vec<TrendPoint>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let today = now.date_naive();
    let mut buckets = BTreeMap::new();
    for offset in 0..days {
        if let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) {
            buckets.insert(date, 0_u64);
        }
    }

    for timestamp in created {
        if let Some(count) = buckets.get_mut(&timestamp.date_naive()) {
            *count = count.saturating_add(1);
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| TrendPoint { date, count })
        .collect()
}

/// Mean age in minutes of the given `created` timestamps, rounded to the
/// nearest whole minute. Returns 0 when the input is empty.
///
/// Ages are measured against `now`; a timestamp from the future (clock
/// skew between writers) contributes zero rather than a negative age.
pub fn average_pending_minutes<I>(created: I, now: DateTime<Utc>) -> u64
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut count: u64 = 0;
    let mut total_secs: u64 = 0;
    for timestamp in created {
        let age_secs = now.signed_duration_since(timestamp).num_seconds().max(0);
        total_secs = total_secs.saturating_add(u64::try_from(age_secs).unwrap_or(0));
        count = count.saturating_add(1);
    }

    if count == 0 {
        return 0;
    }

    // Round half up: add half a minute per sample before dividing.
    let half = count.saturating_mul(30);
    let denom = count.saturating_mul(60);
    total_secs.saturating_add(half).checked_div(denom).unwrap_or(0)
}

/// Count occurrences of each key, ordered by count descending.
///
/// Keys tied on count keep the order in which they first appeared in the
/// input, which makes the output stable across runs for chart legends.
pub fn group_counts<K, I>(keys: I) -> Vec<(K, u64)>
where
    K: PartialEq,
    I: IntoIterator<Item = K>,
{
    let mut counts: Vec<(K, u64)> = Vec::new();
    for key in keys {
        if let Some(entry) = counts.iter_mut().find(|(seen, _)| *seen == key) {
            entry.1 = entry.1.saturating_add(1);
        } else {
            counts.push((key, 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
