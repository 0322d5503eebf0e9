//! BMI Tracker - On-device BMI calculator core with locally persisted history
//!
//! The tracker turns raw measurements into a BMI result through pure
//! calculation functions, and keeps saved results in a newest-first history
//! mirrored to durable key-value storage.
//!
//! ## Modules
//!
//! - **Calculator**: unit conversion, BMI, category, healthy weight range and
//!   waist-to-height ratio
//! - **History**: load/append/delete/clear of saved entries over a pluggable
//!   [`storage::KeyValueStorage`]
//! - **Tracker**: the stateful session a UI owns
//! - **Display / Chart**: formatted strings and trend series for presentation

pub mod calculator;
pub mod chart;
pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod storage;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use calculator::{calculate_bmi, convert_units};
pub use error::BmiError;
pub use history::{HistoryStore, LoadReport, DEFAULT_STORAGE_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use tracker::BmiTracker;
pub use types::{
    BmiCalculation, BmiCategory, BmiEntry, HealthyWeightRange, Measurement, MeasurementType,
    UnitSystem,
};

/// Library version
pub const TRACKER_VERSION: &str = env!("CARGO_PKG_VERSION");
