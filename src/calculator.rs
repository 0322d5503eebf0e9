//! BMI calculation and unit conversion
//!
//! Everything here is a pure function of its inputs. Rounding uses
//! `f64::round` (half away from zero), which for the positive values this
//! domain produces is round-half-up.

use crate::error::BmiError;
use crate::types::{
    BmiCalculation, BmiCategory, HealthyWeightRange, MeasurementType, UnitSystem, WaistRisk,
};

/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// Pounds per kilogram
pub const LB_PER_KG: f64 = 2.20462;

/// Centimeters per foot
pub const CM_PER_FOOT: f64 = 30.48;

/// Lower bound of the healthy BMI band
pub const HEALTHY_BMI_MIN: f64 = 18.5;

/// Upper bound used for the healthy weight range
pub const HEALTHY_BMI_MAX: f64 = 24.9;

/// Convert a measurement from `from` into the other unit system.
///
/// No rounding is applied; callers round for display.
pub fn convert_units(
    value: f64,
    from: UnitSystem,
    measurement: MeasurementType,
) -> Result<f64, BmiError> {
    if !value.is_finite() {
        return Err(BmiError::InvalidInput(format!(
            "cannot convert non-finite {:?} value {}",
            measurement, value
        )));
    }

    let converted = match (measurement, from) {
        (MeasurementType::Height | MeasurementType::Waist, UnitSystem::Metric) => {
            value / CM_PER_INCH
        }
        (MeasurementType::Height | MeasurementType::Waist, UnitSystem::Imperial) => {
            value * CM_PER_INCH
        }
        (MeasurementType::Weight, UnitSystem::Metric) => value * LB_PER_KG,
        (MeasurementType::Weight, UnitSystem::Imperial) => value / LB_PER_KG,
    };

    Ok(converted)
}

/// Calculate BMI, category, healthy weight range and waist-to-height ratio.
///
/// Height and weight must be finite and positive. A waist that is zero,
/// negative or not finite is treated the same as `None`.
///
/// # Example
/// ```
/// use bmi_tracker::calculator::calculate_bmi;
///
/// let result = calculate_bmi(170.0, 70.0, Some(90.0)).unwrap();
/// assert_eq!(result.bmi, 24.2);
/// assert_eq!(result.waist_to_height_ratio, Some(0.53));
/// ```
pub fn calculate_bmi(
    height_cm: f64,
    weight_kg: f64,
    waist_cm: Option<f64>,
) -> Result<BmiCalculation, BmiError> {
    require_positive("height", height_cm)?;
    require_positive("weight", weight_kg)?;

    let waist_cm = waist_cm.filter(|w| is_present_waist(*w));

    let height_m = height_cm / 100.0;
    let height_sq = height_m * height_m;
    let raw_bmi = weight_kg / height_sq;

    let healthy_weight_range = HealthyWeightRange {
        min: round_to(HEALTHY_BMI_MIN * height_sq, 1),
        max: round_to(HEALTHY_BMI_MAX * height_sq, 1),
    };

    // Buckets are decided on the unrounded values
    let (waist_to_height_ratio, waist_to_height_interpretation) = match waist_cm {
        Some(waist) => {
            let ratio = waist / height_cm;
            let risk = WaistRisk::from_ratio(ratio);
            (
                Some(round_to(ratio, 2)),
                Some(risk.interpretation().to_string()),
            )
        }
        None => (None, None),
    };

    Ok(BmiCalculation {
        bmi: round_to(raw_bmi, 1),
        category: BmiCategory::from_bmi(raw_bmi),
        healthy_weight_range,
        waist_to_height_ratio,
        waist_to_height_interpretation,
    })
}

/// Split a height into whole feet and rounded remaining inches.
///
/// Inches are taken modulo 12 before rounding, so the result can read
/// `(5, 12)` for heights just under a whole foot, matching what the input
/// fields show.
pub fn split_height(height_cm: f64) -> (u32, u32) {
    let feet = (height_cm / CM_PER_FOOT).floor().max(0.0);
    let inches = ((height_cm / CM_PER_INCH) % 12.0).round().max(0.0);
    (feet as u32, inches as u32)
}

/// Whether a waist value counts as a measurement
pub fn is_present_waist(waist_cm: f64) -> bool {
    waist_cm.is_finite() && waist_cm > 0.0
}

/// Combine feet and inches into centimeters
pub fn compose_height(feet: u32, inches: f64) -> f64 {
    (f64::from(feet) * 12.0 + inches) * CM_PER_INCH
}

/// Round to a fixed number of decimals via multiply-round-divide
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn require_positive(name: &str, value: f64) -> Result<(), BmiError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BmiError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}
