//! Trend chart series
//!
//! Turns the newest-first history into the oldest-first series a bar chart
//! plots, with the category thresholds as reference lines.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use serde::Serialize;

use crate::types::{BmiCategory, BmiEntry};

/// Number of most recent entries plotted by default
pub const DEFAULT_CHART_WINDOW: usize = 10;

/// Horizontal reference lines at the category boundaries
pub const REFERENCE_LINES: [f64; 3] = [18.5, 25.0, 30.0];

/// Fixed y-axis domain; values outside it are clipped when drawn
pub const Y_DOMAIN: (f64, f64) = (15.0, 35.0);

/// A single bar in the trend chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Short date label, e.g. "Mar 4"
    pub label: String,
    pub bmi: f64,
    pub category: BmiCategory,
}

/// Build the chart series from the `window` most recent entries, oldest first.
///
/// `entries` must be newest first, as returned by the history store. Labels
/// use the local time zone.
pub fn trend_series(entries: &[BmiEntry], window: usize) -> Vec<TrendPoint> {
    trend_series_in(entries, window, &Local)
}

/// [`trend_series`] with labels rendered in `tz`
pub fn trend_series_in<Tz>(entries: &[BmiEntry], window: usize, tz: &Tz) -> Vec<TrendPoint>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    entries
        .iter()
        .take(window)
        .rev()
        .map(|entry| TrendPoint {
            label: short_date(entry.timestamp, tz),
            bmi: entry.bmi,
            category: entry.category,
        })
        .collect()
}

/// Change in BMI from the oldest to the newest plotted point
pub fn trend_delta(series: &[TrendPoint]) -> Option<f64> {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() > 1 => Some(last.bmi - first.bmi),
        _ => None,
    }
}

/// Fraction of the y domain covered by `bmi`, clipped to `0.0..=1.0`
pub fn domain_fraction(bmi: f64) -> f64 {
    let (low, high) = Y_DOMAIN;
    ((bmi - low) / (high - low)).clamp(0.0, 1.0)
}

fn short_date<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(tz).format("%b %-d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitSystem;
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    const DAY_MS: i64 = 86_400_000;
    // 2024-03-01T12:00:00Z
    const MARCH_1: i64 = 1_709_294_400_000;

    fn make_entry(day: i64, bmi: f64) -> BmiEntry {
        BmiEntry {
            id: format!("entry-{}", day),
            timestamp: MARCH_1 + day * DAY_MS,
            unit_system: UnitSystem::Metric,
            height_cm: 170.0,
            weight_kg: 70.0,
            waist_cm: None,
            bmi,
            category: BmiCategory::from_bmi(bmi),
            waist_to_height_ratio: None,
        }
    }

    #[test]
    fn test_series_is_oldest_first() {
        // Newest first, as the store holds them
        let entries = vec![make_entry(2, 26.0), make_entry(1, 25.0), make_entry(0, 24.0)];
        let series = trend_series_in(&entries, DEFAULT_CHART_WINDOW, &Utc);

        let labels: Vec<&str> = series.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Mar 1", "Mar 2", "Mar 3"]);
        assert_eq!(series[0].category, BmiCategory::Normal);
        assert_eq!(series[2].category, BmiCategory::Overweight);
    }

    #[test]
    fn test_series_window() {
        let entries: Vec<BmiEntry> = (0..15).rev().map(|d| make_entry(d, 22.0)).collect();
        let series = trend_series_in(&entries, DEFAULT_CHART_WINDOW, &Utc);

        assert_eq!(series.len(), 10);
        // Days 5..=14 survive
        assert_eq!(series[0].label, "Mar 6");
        assert_eq!(series[9].label, "Mar 15");
    }

    #[test]
    fn test_labels_follow_zone() {
        // 2024-03-02T03:00:00Z
        let mut entry = make_entry(0, 22.0);
        entry.timestamp = 1_709_348_400_000;
        let entries = [entry];

        let utc = trend_series_in(&entries, DEFAULT_CHART_WINDOW, &Utc);
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        let local = trend_series_in(&entries, DEFAULT_CHART_WINDOW, &pacific);

        assert_eq!(utc[0].label, "Mar 2");
        assert_eq!(local[0].label, "Mar 1");
    }

    #[test]
    fn test_domain_fraction() {
        assert_eq!(domain_fraction(25.0), 0.5);
        assert_eq!(domain_fraction(12.0), 0.0);
        assert_eq!(domain_fraction(41.0), 1.0);
    }

    #[test]
    fn test_empty_series() {
        assert!(trend_series(&[], DEFAULT_CHART_WINDOW).is_empty());
        assert_eq!(trend_delta(&[]), None);
    }

    #[test]
    fn test_trend_delta() {
        let entries = vec![make_entry(1, 23.5), make_entry(0, 24.0)];
        let series = trend_series_in(&entries, DEFAULT_CHART_WINDOW, &Utc);
        let delta = trend_delta(&series).unwrap();
        assert!((delta + 0.5).abs() < 1e-9);
    }
}
