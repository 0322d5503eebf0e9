//! Tracker orchestration
//!
//! This module provides the stateful API a presentation layer owns: the
//! current measurement and unit preference, the derived calculation, and
//! the save/delete/clear intents that feed the history store.

use chrono::Utc;
use uuid::Uuid;

use crate::calculator::{calculate_bmi, convert_units, is_present_waist};
use crate::error::BmiError;
use crate::history::{HistoryStore, LoadReport};
use crate::storage::KeyValueStorage;
use crate::types::{BmiCalculation, BmiEntry, Measurement, MeasurementType, UnitSystem};

/// Initial height shown before the user enters anything (cm)
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;

/// Initial weight (kg)
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// Initial waist circumference (cm)
pub const DEFAULT_WAIST_CM: f64 = 85.0;

/// Generate an entry id: epoch milliseconds plus a 9 character random suffix
pub fn generate_entry_id(timestamp_ms: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp_ms, &suffix[..9])
}

/// Snapshot a calculation into a history entry.
///
/// A waist that is zero or otherwise unusable is recorded as absent.
pub fn build_entry(
    measurement: &Measurement,
    calculation: &BmiCalculation,
    timestamp_ms: i64,
) -> BmiEntry {
    BmiEntry {
        id: generate_entry_id(timestamp_ms),
        timestamp: timestamp_ms,
        unit_system: measurement.unit_system,
        height_cm: measurement.height_cm,
        weight_kg: measurement.weight_kg,
        waist_cm: measurement.waist_cm.filter(|w| is_present_waist(*w)),
        bmi: calculation.bmi,
        category: calculation.category,
        waist_to_height_ratio: calculation.waist_to_height_ratio,
    }
}

/// Stateful calculator session with persistent history.
///
/// Measurements are held in metric units. A waist of `0.0` means "not
/// supplied"; negative waists are treated the same way.
pub struct BmiTracker<S: KeyValueStorage> {
    history: HistoryStore<S>,
    unit_system: UnitSystem,
    height_cm: f64,
    weight_kg: f64,
    waist_cm: f64,
}

impl<S: KeyValueStorage> BmiTracker<S> {
    /// Create a tracker over `history` and load it.
    ///
    /// Loading never fails; the report says whether anything was dropped.
    pub fn new(history: HistoryStore<S>) -> (Self, LoadReport) {
        let mut tracker = Self {
            history,
            unit_system: UnitSystem::default(),
            height_cm: DEFAULT_HEIGHT_CM,
            weight_kg: DEFAULT_WEIGHT_KG,
            waist_cm: DEFAULT_WAIST_CM,
        };
        let report = tracker.history.load();
        (tracker, report)
    }

    /// Create a tracker with a non-default display unit system
    pub fn with_unit_system(
        history: HistoryStore<S>,
        unit_system: UnitSystem,
    ) -> (Self, LoadReport) {
        let (mut tracker, report) = Self::new(history);
        tracker.unit_system = unit_system;
        (tracker, report)
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    pub fn set_unit_system(&mut self, unit_system: UnitSystem) {
        self.unit_system = unit_system;
    }

    pub fn set_height_cm(&mut self, height_cm: f64) {
        self.height_cm = height_cm;
    }

    pub fn set_weight_kg(&mut self, weight_kg: f64) {
        self.weight_kg = weight_kg;
    }

    pub fn set_waist_cm(&mut self, waist_cm: f64) {
        self.waist_cm = waist_cm;
    }

    /// Set height from a value in `units` (inches when imperial)
    pub fn set_height_in(&mut self, value: f64, units: UnitSystem) -> Result<(), BmiError> {
        self.height_cm = to_metric(value, units, MeasurementType::Height)?;
        Ok(())
    }

    /// Set weight from a value in `units` (pounds when imperial)
    pub fn set_weight_in(&mut self, value: f64, units: UnitSystem) -> Result<(), BmiError> {
        self.weight_kg = to_metric(value, units, MeasurementType::Weight)?;
        Ok(())
    }

    /// Set waist from a value in `units` (inches when imperial)
    pub fn set_waist_in(&mut self, value: f64, units: UnitSystem) -> Result<(), BmiError> {
        self.waist_cm = to_metric(value, units, MeasurementType::Waist)?;
        Ok(())
    }

    /// Current measurement in metric units
    pub fn measurement(&self) -> Measurement {
        Measurement {
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            waist_cm: is_present_waist(self.waist_cm).then_some(self.waist_cm),
            unit_system: self.unit_system,
        }
    }

    /// The calculation for the current measurement, or `None` when the
    /// input cannot produce a meaningful result
    pub fn current(&self) -> Option<BmiCalculation> {
        let m = self.measurement();
        calculate_bmi(m.height_cm, m.weight_kg, m.waist_cm).ok()
    }

    /// Save the current calculation to history and return the new entry.
    ///
    /// A [`BmiError::PersistenceWrite`] means the entry is in the in-memory
    /// history but was not written to storage.
    pub fn save(&mut self) -> Result<BmiEntry, BmiError> {
        let measurement = self.measurement();
        let calculation = calculate_bmi(
            measurement.height_cm,
            measurement.weight_kg,
            measurement.waist_cm,
        )?;
        let entry = build_entry(&measurement, &calculation, Utc::now().timestamp_millis());
        self.history.append(entry.clone())?;
        Ok(entry)
    }

    /// Delete a saved entry by id
    pub fn delete(&mut self, id: &str) -> Result<bool, BmiError> {
        self.history.delete_by_id(id)
    }

    /// Remove all saved entries
    pub fn clear(&mut self) -> Result<(), BmiError> {
        self.history.clear()
    }

    /// Saved entries, newest first
    pub fn entries(&self) -> &[BmiEntry] {
        self.history.entries()
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Give back the history store
    pub fn into_history(self) -> HistoryStore<S> {
        self.history
    }
}

fn to_metric(
    value: f64,
    units: UnitSystem,
    measurement: MeasurementType,
) -> Result<f64, BmiError> {
    match units {
        UnitSystem::Metric if value.is_finite() => Ok(value),
        UnitSystem::Metric => Err(BmiError::InvalidInput(format!(
            "non-finite {:?} value {}",
            measurement, value
        ))),
        UnitSystem::Imperial => convert_units(value, UnitSystem::Imperial, measurement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::BmiCategory;
    use pretty_assertions::assert_eq;

    fn new_tracker() -> BmiTracker<MemoryStorage> {
        let (tracker, report) = BmiTracker::new(HistoryStore::new(MemoryStorage::new()));
        assert!(report.is_clean());
        tracker
    }

    #[test]
    fn test_defaults_produce_result() {
        let tracker = new_tracker();
        let current = tracker.current().unwrap();

        assert_eq!(current.bmi, 24.2);
        assert_eq!(current.category, BmiCategory::Normal);
        // 85 / 170
        assert_eq!(current.waist_to_height_ratio, Some(0.5));
    }

    #[test]
    fn test_invalid_input_suppresses_result() {
        let mut tracker = new_tracker();
        tracker.set_height_cm(0.0);
        assert!(tracker.current().is_none());
        assert!(matches!(tracker.save(), Err(BmiError::InvalidInput(_))));
        assert!(tracker.entries().is_empty());

        tracker.set_height_cm(170.0);
        tracker.set_weight_kg(-2.0);
        assert!(tracker.current().is_none());
    }

    #[test]
    fn test_negative_waist_keeps_result() {
        let mut tracker = new_tracker();
        tracker.set_waist_cm(-10.0);

        let current = tracker.current().unwrap();
        assert_eq!(current.bmi, 24.2);
        assert_eq!(current.waist_to_height_ratio, None);

        let entry = tracker.save().unwrap();
        assert_eq!(entry.waist_cm, None);
        assert_eq!(tracker.entries().len(), 1);
    }

    #[test]
    fn test_save_snapshots_calculation() {
        let mut tracker = new_tracker();
        tracker.set_unit_system(UnitSystem::Imperial);
        tracker.set_waist_cm(0.0);

        let entry = tracker.save().unwrap();

        assert_eq!(entry.unit_system, UnitSystem::Imperial);
        assert_eq!(entry.height_cm, 170.0);
        assert_eq!(entry.weight_kg, 70.0);
        assert_eq!(entry.waist_cm, None);
        assert_eq!(entry.waist_to_height_ratio, None);
        assert_eq!(entry.bmi, 24.2);
        assert_eq!(tracker.entries()[0], entry);
    }

    #[test]
    fn test_imperial_setters_store_metric() {
        let mut tracker = new_tracker();
        tracker.set_weight_in(154.0, UnitSystem::Imperial).unwrap();
        tracker.set_height_in(67.0, UnitSystem::Imperial).unwrap();

        let m = tracker.measurement();
        assert!((m.weight_kg - 154.0 / 2.20462).abs() < 1e-9);
        assert!((m.height_cm - 170.18).abs() < 1e-9);

        assert!(tracker.set_waist_in(f64::NAN, UnitSystem::Metric).is_err());
    }

    #[test]
    fn test_delete_and_clear() {
        let mut tracker = new_tracker();
        let first = tracker.save().unwrap();
        tracker.set_weight_kg(80.0);
        let second = tracker.save().unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(tracker.entries()[0].id, second.id);

        assert!(tracker.delete(&second.id).unwrap());
        assert_eq!(tracker.entries().len(), 1);

        tracker.clear().unwrap();
        assert!(tracker.entries().is_empty());
    }

    #[test]
    fn test_history_survives_new_tracker() {
        let mut tracker = new_tracker();
        let saved = tracker.save().unwrap();

        let storage = tracker.into_history().storage().clone();
        let (reopened, _) = BmiTracker::new(HistoryStore::new(storage));
        assert_eq!(reopened.entries(), &[saved]);
    }

    #[test]
    fn test_entry_id_format() {
        let id = generate_entry_id(1_700_000_000_000);
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, "1700000000000");
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
