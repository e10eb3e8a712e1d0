//! Trend and anomaly observations over the monthly revenue series.
//!
//! Only completed months are considered. Months that have not ended yet
//! hold zero or partial revenue and would read as a slump.

use crate::models::{Insights, MonthlyBucket, MonthlyPoint, RevenueAnomaly, Trend};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::prelude::ToPrimitive;

/// Deviations beyond this many standard deviations are anomalies.
const ANOMALY_THRESHOLD: f64 = 2.5;

/// Number of months of `year` that have fully ended at `now`.
pub fn completed_months(year: i32, now: DateTime<Utc>) -> usize {
    match year.cmp(&now.year()) {
        std::cmp::Ordering::Less => 12,
        std::cmp::Ordering::Equal => now.month0() as usize,
        std::cmp::Ordering::Greater => 0,
    }
}

/// Derive insights from the first `observed_months` monthly buckets.
pub fn monthly_insights(buckets: &[MonthlyBucket], observed_months: usize) -> Insights {
    let observed = &buckets[..observed_months.min(buckets.len())];
    let values: Vec<f64> = observed
        .iter()
        .map(|b| b.revenue.to_f64().unwrap_or(0.0))
        .collect();
    let average = mean(&values);

    let anomalies = detect_anomalies(&values)
        .into_iter()
        .map(|i| RevenueAnomaly {
            month: observed[i].month.clone(),
            revenue: values[i],
            deviation: round2((values[i] - average).abs()),
        })
        .collect();

    let point = |i: usize| MonthlyPoint {
        month: observed[i].month.clone(),
        revenue: values[i],
    };
    // First occurrence wins on ties
    let peak = (0..values.len())
        .reduce(|best, i| if values[i] > values[best] { i } else { best })
        .map(point);
    let trough = (0..values.len())
        .reduce(|best, i| if values[i] < values[best] { i } else { best })
        .map(point);

    Insights {
        months_observed: values.len(),
        revenue_trend: calculate_trend(&values),
        average: round2(average),
        growth_rate: round2(growth_rate(&values)),
        last_value: values.last().copied().unwrap_or(0.0),
        peak,
        trough,
        anomalies,
    }
}

/// Percent change from the first value to the last.
pub fn growth_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() >= 2 && first != 0.0 => {
            (last - first) / first * 100.0
        }
        _ => 0.0,
    }
}

/// Compare the last three values against everything before them.
pub fn calculate_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }

    let split = values.len().saturating_sub(3);
    let (older, recent) = values.split_at(split);

    let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
    let older_avg = older.iter().sum::<f64>() / older.len().max(1) as f64;

    if recent_avg > older_avg * 1.1 {
        Trend::Increasing
    } else if recent_avg < older_avg * 0.9 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Indices of values further than 2.5 population standard deviations from the mean.
pub fn detect_anomalies(values: &[f64]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }

    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std_dev = variance.sqrt();

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| (*v - mean).abs() > ANOMALY_THRESHOLD * std_dev)
        .map(|(i, _)| i)
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
