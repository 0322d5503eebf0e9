//! Core types for the BMI tracker
//!
//! This module defines the data structures that flow between the calculator,
//! the history store and the presentation layer: measurements, derived
//! calculations and persisted history entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit system used for input and display. Stored values are always metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    /// The other unit system
    pub fn toggled(&self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of measurement being converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Height,
    Weight,
    Waist,
}

/// BMI health category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Classify a BMI value. Lower bounds are inclusive.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "underweight",
            BmiCategory::Normal => "normal",
            BmiCategory::Overweight => "overweight",
            BmiCategory::Obese => "obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health risk bucket for a waist-to-height ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaistRisk {
    Low,
    Increased,
    High,
}

impl WaistRisk {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.5 {
            WaistRisk::Low
        } else if ratio < 0.6 {
            WaistRisk::Increased
        } else {
            WaistRisk::High
        }
    }

    /// Human-readable interpretation shown next to the ratio
    pub fn interpretation(&self) -> &'static str {
        match self {
            WaistRisk::Low => "Healthy – low health risk",
            WaistRisk::Increased => "Increased health risk",
            WaistRisk::High => "High health risk",
        }
    }
}

/// Raw user measurements, always in metric units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub height_cm: f64,
    pub weight_kg: f64,
    /// Waist circumference; `None` when not supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_cm: Option<f64>,
    /// Display preference at the time of measurement
    pub unit_system: UnitSystem,
}

/// Healthy weight range for a given height (kg)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthyWeightRange {
    pub min: f64,
    pub max: f64,
}

/// Result of a BMI calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmiCalculation {
    /// BMI rounded to one decimal
    pub bmi: f64,
    pub category: BmiCategory,
    pub healthy_weight_range: HealthyWeightRange,
    /// Waist-to-height ratio rounded to two decimals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_to_height_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_to_height_interpretation: Option<String>,
}

/// A persisted, immutable record of a past calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmiEntry {
    pub id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub unit_system: UnitSystem,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist_cm: Option<f64>,
    pub bmi: f64,
    pub category: BmiCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist_to_height_ratio: Option<f64>,
}

impl BmiEntry {
    /// Check the value constraints serde cannot express.
    ///
    /// Returns the name of the first offending field.
    pub fn validate(&self) -> Result<(), &'static str> {
        fn positive(v: f64) -> bool {
            v.is_finite() && v > 0.0
        }

        if self.id.is_empty() {
            return Err("id");
        }
        if self.timestamp < 0 {
            return Err("timestamp");
        }
        if !positive(self.height_cm) {
            return Err("heightCm");
        }
        if !positive(self.weight_kg) {
            return Err("weightKg");
        }
        if !positive(self.bmi) {
            return Err("bmi");
        }
        if self.waist_cm.is_some_and(|w| !positive(w)) {
            return Err("waistCm");
        }
        if self.waist_to_height_ratio.is_some_and(|r| !positive(r)) {
            return Err("waistToHeightRatio");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> BmiEntry {
        BmiEntry {
            id: "1700000000000-abc123def".to_string(),
            timestamp: 1_700_000_000_000,
            unit_system: UnitSystem::Metric,
            height_cm: 170.0,
            weight_kg: 70.0,
            waist_cm: None,
            bmi: 24.2,
            category: BmiCategory::Normal,
            waist_to_height_ratio: None,
        }
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_value(sample_entry()).unwrap();

        assert_eq!(json["unitSystem"], "metric");
        assert_eq!(json["heightCm"], 170.0);
        assert_eq!(json["category"], "normal");
        // Absent optionals are omitted, not null
        assert!(json.get("waistCm").is_none());
        assert!(json.get("waistToHeightRatio").is_none());
    }

    #[test]
    fn test_entry_parses_original_shape() {
        let json = r#"{
            "id": "1700000000000-k3j4h5g6f",
            "timestamp": 1700000000000,
            "unitSystem": "imperial",
            "heightCm": 170,
            "weightKg": 70,
            "waistCm": 90,
            "bmi": 24.2,
            "category": "normal",
            "waistToHeightRatio": 0.53
        }"#;

        let entry: BmiEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.unit_system, UnitSystem::Imperial);
        assert_eq!(entry.waist_cm, Some(90.0));
        assert_eq!(entry.waist_to_height_ratio, Some(0.53));
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_entry_validation() {
        let mut entry = sample_entry();
        entry.height_cm = 0.0;
        assert_eq!(entry.validate(), Err("heightCm"));

        let mut entry = sample_entry();
        entry.id.clear();
        assert_eq!(entry.validate(), Err("id"));

        let mut entry = sample_entry();
        entry.waist_cm = Some(-3.0);
        assert_eq!(entry.validate(), Err("waistCm"));
    }

    #[test]
    fn test_unit_system_toggle() {
        assert_eq!(UnitSystem::Metric.toggled(), UnitSystem::Imperial);
        assert_eq!(UnitSystem::Imperial.toggled().to_string(), "metric");
    }

    #[test]
    fn test_category_thresholds() {
        assert_eq!(BmiCategory::from_bmi(18.4), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.999), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(29.999), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
    }

    #[test]
    fn test_waist_risk_buckets() {
        assert_eq!(WaistRisk::from_ratio(0.49), WaistRisk::Low);
        assert_eq!(WaistRisk::from_ratio(0.5), WaistRisk::Increased);
        assert_eq!(WaistRisk::from_ratio(0.6), WaistRisk::High);
    }
}
