//! Display formatting
//!
//! Stored values are metric; these helpers render them in the user's
//! preferred unit system for result cards and history rows.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

use crate::calculator::{split_height, CM_PER_INCH, LB_PER_KG};
use crate::types::{BmiCategory, HealthyWeightRange, UnitSystem};

pub fn format_weight(weight_kg: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.1} kg", weight_kg),
        UnitSystem::Imperial => format!("{:.1} lb", weight_kg * LB_PER_KG),
    }
}

pub fn format_height(height_cm: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.0} cm", height_cm),
        UnitSystem::Imperial => {
            let (feet, inches) = split_height(height_cm);
            format!("{}' {}\"", feet, inches)
        }
    }
}

pub fn format_waist(waist_cm: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.0} cm", waist_cm),
        UnitSystem::Imperial => format!("{:.0} in", waist_cm / CM_PER_INCH),
    }
}

/// "53.5 kg - 72.0 kg"
pub fn format_weight_range(range: &HealthyWeightRange, units: UnitSystem) -> String {
    format!(
        "{} - {}",
        format_weight(range.min, units),
        format_weight(range.max, units)
    )
}

/// Capitalized category name, e.g. "Overweight"
pub fn category_label(category: BmiCategory) -> String {
    let name = category.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Timestamp as shown in the history list, e.g. "Jan 5, 2025 at 3:04 PM".
///
/// Rendered in the local time zone. Returns `None` for timestamps chrono
/// cannot represent.
pub fn format_entry_time(timestamp_ms: i64) -> Option<String> {
    format_entry_time_in(timestamp_ms, &Local)
}

/// [`format_entry_time`] rendered in `tz`
pub fn format_entry_time_in<Tz>(timestamp_ms: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let time = DateTime::from_timestamp_millis(timestamp_ms)?.with_timezone(tz);
    Some(time.format("%b %-d, %Y at %-I:%M %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_weight_formatting() {
        assert_eq!(format_weight(70.0, UnitSystem::Metric), "70.0 kg");
        assert_eq!(format_weight(70.0, UnitSystem::Imperial), "154.3 lb");
    }

    #[test]
    fn test_height_formatting() {
        assert_eq!(format_height(170.0, UnitSystem::Metric), "170 cm");
        assert_eq!(format_height(170.0, UnitSystem::Imperial), "5' 7\"");
    }

    #[test]
    fn test_waist_formatting() {
        assert_eq!(format_waist(85.0, UnitSystem::Metric), "85 cm");
        assert_eq!(format_waist(91.44, UnitSystem::Imperial), "36 in");
    }

    #[test]
    fn test_range_formatting() {
        let range = HealthyWeightRange {
            min: 53.5,
            max: 72.0,
        };
        assert_eq!(
            format_weight_range(&range, UnitSystem::Metric),
            "53.5 kg - 72.0 kg"
        );
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label(BmiCategory::Normal), "Normal");
        assert_eq!(category_label(BmiCategory::Underweight), "Underweight");
    }

    #[test]
    fn test_entry_time() {
        // 2025-01-05T15:04:00Z
        let formatted = format_entry_time_in(1_736_089_440_000, &Utc).unwrap();
        assert_eq!(formatted, "Jan 5, 2025 at 3:04 PM");
    }

    #[test]
    fn test_entry_time_uses_zone() {
        // 2024-03-02T03:00:00Z is the previous evening in UTC-8
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        let formatted = format_entry_time_in(1_709_348_400_000, &pacific).unwrap();
        assert_eq!(formatted, "Mar 1, 2024 at 7:00 PM");
    }

    #[test]
    fn test_entry_time_local_matches_local_zone() {
        let ts = 1_709_348_400_000;
        assert_eq!(format_entry_time(ts), format_entry_time_in(ts, &Local));
    }
}
