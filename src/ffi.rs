//! FFI bindings for the BMI tracker
//!
//! This module provides C-compatible functions for embedding the tracker in
//! a native client shell. Structured results are returned as JSON C strings
//! that must be freed by the caller using `bmi_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::calculator::{calculate_bmi, convert_units};
use crate::history::HistoryStore;
use crate::storage::FileStorage;
use crate::tracker::build_entry;
use crate::types::{Measurement, MeasurementType, UnitSystem};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn unit_system_from_code(code: i32) -> Option<UnitSystem> {
    match code {
        0 => Some(UnitSystem::Metric),
        1 => Some(UnitSystem::Imperial),
        _ => None,
    }
}

fn measurement_from_code(code: i32) -> Option<MeasurementType> {
    match code {
        0 => Some(MeasurementType::Height),
        1 => Some(MeasurementType::Weight),
        2 => Some(MeasurementType::Waist),
        _ => None,
    }
}

// ============================================================================
// Calculator API
// ============================================================================

/// Calculate BMI and return the calculation as JSON.
///
/// Pass `waist_cm <= 0` when no waist measurement is available.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `bmi_free_string`.
/// - Returns NULL on invalid input; call `bmi_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bmi_calculate(
    height_cm: f64,
    weight_kg: f64,
    waist_cm: f64,
) -> *mut c_char {
    clear_last_error();

    let waist = (waist_cm > 0.0).then_some(waist_cm);

    let result = calculate_bmi(height_cm, weight_kg, waist)
        .and_then(|calc| serde_json::to_string(&calc).map_err(Into::into));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Convert a measurement out of `from_system` (0 = metric, 1 = imperial).
///
/// `measurement` is 0 = height, 1 = weight, 2 = waist.
///
/// # Safety
/// - `out` must be a valid pointer to an f64.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn bmi_convert_units(
    value: f64,
    from_system: i32,
    measurement: i32,
    out: *mut f64,
) -> i32 {
    clear_last_error();

    if out.is_null() {
        set_last_error("Null output pointer");
        return -1;
    }

    let from = unit_system_from_code(from_system);
    let kind = measurement_from_code(measurement);
    let (from, kind) = match (from, kind) {
        (Some(from), Some(kind)) => (from, kind),
        _ => {
            set_last_error("Unknown unit system or measurement code");
            return -1;
        }
    };

    match convert_units(value, from, kind) {
        Ok(converted) => {
            *out = converted;
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// History API
// ============================================================================

/// Opaque handle to a loaded history store
pub struct BmiHistoryHandle {
    store: HistoryStore<FileStorage>,
}

/// Open (and load) the history stored in `data_dir`.
///
/// Malformed persisted history is discarded, not reported as a failure.
///
/// # Safety
/// - `data_dir` must be a valid null-terminated C string.
/// - Must be freed with `bmi_history_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_open(data_dir: *const c_char) -> *mut BmiHistoryHandle {
    clear_last_error();

    let dir = match cstr_to_string(data_dir) {
        Some(s) => s,
        None => {
            set_last_error("Invalid data_dir string pointer");
            return ptr::null_mut();
        }
    };

    let storage = match FileStorage::open(dir) {
        Ok(storage) => storage,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let mut store = HistoryStore::new(storage);
    let report = store.load();
    if let Some(e) = report.error {
        tracing::warn!(error = %e, "opened history with unreadable state");
    }

    Box::into_raw(Box::new(BmiHistoryHandle { store }))
}

/// Free a history handle.
///
/// # Safety
/// - `history` must be a valid pointer returned by `bmi_history_open`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_free(history: *mut BmiHistoryHandle) {
    if !history.is_null() {
        drop(Box::from_raw(history));
    }
}

/// Return all entries, newest first, as a JSON array.
///
/// # Safety
/// - `history` must be a valid pointer returned by `bmi_history_open`.
/// - Returns a newly allocated string that must be freed with `bmi_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_entries(history: *const BmiHistoryHandle) -> *mut c_char {
    clear_last_error();

    if history.is_null() {
        set_last_error("Null history pointer");
        return ptr::null_mut();
    }

    let handle = &*history;

    match handle.store.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Calculate and save an entry, returning the new entry as JSON.
///
/// Pass `waist_cm <= 0` when no waist measurement is available. If the
/// entry was kept in memory but could not be written to disk, the entry is
/// still returned and `bmi_last_error` describes the write failure.
///
/// # Safety
/// - `history` must be a valid pointer returned by `bmi_history_open`.
/// - Returns a newly allocated string that must be freed with `bmi_free_string`.
/// - Returns NULL on invalid input.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_save(
    history: *mut BmiHistoryHandle,
    height_cm: f64,
    weight_kg: f64,
    waist_cm: f64,
    unit_system: i32,
) -> *mut c_char {
    clear_last_error();

    if history.is_null() {
        set_last_error("Null history pointer");
        return ptr::null_mut();
    }

    let handle = &mut *history;

    let Some(unit_system) = unit_system_from_code(unit_system) else {
        set_last_error("Unknown unit system code");
        return ptr::null_mut();
    };

    let measurement = Measurement {
        height_cm,
        weight_kg,
        waist_cm: (waist_cm > 0.0).then_some(waist_cm),
        unit_system,
    };

    let calculation = match calculate_bmi(height_cm, weight_kg, measurement.waist_cm) {
        Ok(calc) => calc,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let entry = build_entry(&measurement, &calculation, chrono::Utc::now().timestamp_millis());

    let json = match serde_json::to_string(&entry) {
        Ok(json) => json,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    if let Err(e) = handle.store.append(entry) {
        set_last_error(&e.to_string());
    }

    string_to_cstr(&json)
}

/// Delete an entry by id.
///
/// # Safety
/// - `history` must be a valid pointer returned by `bmi_history_open`.
/// - `id` must be a valid null-terminated C string.
/// - Returns 1 if an entry was removed, 0 if none matched, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_delete(
    history: *mut BmiHistoryHandle,
    id: *const c_char,
) -> i32 {
    clear_last_error();

    if history.is_null() {
        set_last_error("Null history pointer");
        return -1;
    }

    let handle = &mut *history;

    let id = match cstr_to_string(id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid id string pointer");
            return -1;
        }
    };

    match handle.store.delete_by_id(&id) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Remove all entries and the history file.
///
/// # Safety
/// - `history` must be a valid pointer returned by `bmi_history_open`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn bmi_history_clear(history: *mut BmiHistoryHandle) -> i32 {
    clear_last_error();

    if history.is_null() {
        set_last_error("Null history pointer");
        return -1;
    }

    let handle = &mut *history;

    match handle.store.clear() {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by tracker functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a tracker function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bmi_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next tracker call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bmi_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn bmi_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        bmi_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_calculate() {
        unsafe {
            let json = take_string(bmi_calculate(170.0, 70.0, 90.0));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();

            assert_eq!(value["bmi"], 24.2);
            assert_eq!(value["category"], "normal");
            assert_eq!(value["waistToHeightRatio"], 0.53);
        }
    }

    #[test]
    fn test_ffi_calculate_invalid() {
        unsafe {
            let result = bmi_calculate(0.0, 70.0, 0.0);
            assert!(result.is_null());

            let error = bmi_last_error();
            assert!(!error.is_null());
            let message = CStr::from_ptr(error).to_str().unwrap();
            assert!(message.contains("height"));
        }
    }

    #[test]
    fn test_ffi_convert_units() {
        unsafe {
            let mut out = 0.0;
            assert_eq!(bmi_convert_units(70.0, 0, 1, &mut out), 0);
            assert!((out - 154.3234).abs() < 1e-9);

            assert_eq!(bmi_convert_units(70.0, 5, 1, &mut out), -1);
            assert_eq!(bmi_convert_units(f64::NAN, 0, 0, &mut out), -1);
            assert_eq!(bmi_convert_units(1.0, 0, 0, ptr::null_mut()), -1);
        }
    }

    #[test]
    fn test_ffi_history_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(dir.path().to_str().unwrap()).unwrap();

        unsafe {
            let history = bmi_history_open(path.as_ptr());
            assert!(!history.is_null());

            let saved = take_string(bmi_history_save(history, 170.0, 70.0, 0.0, 1));
            let entry: serde_json::Value = serde_json::from_str(&saved).unwrap();
            assert_eq!(entry["unitSystem"], "imperial");
            assert!(entry.get("waistCm").is_none());
            bmi_history_free(history);

            // Reopen and confirm the entry was persisted
            let history = bmi_history_open(path.as_ptr());
            let entries = take_string(bmi_history_entries(history));
            let list: Vec<serde_json::Value> = serde_json::from_str(&entries).unwrap();
            assert_eq!(list.len(), 1);

            let id = CString::new(entry["id"].as_str().unwrap()).unwrap();
            assert_eq!(bmi_history_delete(history, id.as_ptr()), 1);
            assert_eq!(bmi_history_delete(history, id.as_ptr()), 0);

            assert_eq!(bmi_history_clear(history), 0);
            bmi_history_free(history);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = bmi_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
