//! FFI bindings for Pulse Motion
//!
//! This module provides C-compatible functions for hosts that own the camera
//! and pose detector and only need the engine's computations. All functions
//! use C strings (null-terminated) and return allocated memory that must be
//! freed by the caller using `pm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::exercise::tracker::ExerciseTracker;
use crate::exercise::types::{ExerciseKind, FrameReport, LandmarkFrame};
use crate::pipeline::analyze_ppg_signal;
use crate::session::SessionId;
use crate::types::{HistoryRecord, Indicator, Locale, VitalsEstimate};

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

/// Serialize `value`, or record the error and return NULL
fn to_json_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Parse an optional config; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<EngineConfig, ComputeError> {
    if config_json.is_null() {
        return Ok(EngineConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| ComputeError::ParseError("config is not valid UTF-8".to_string()))?;
    EngineConfig::from_json_str(&json)
}

/// Parse an optional locale; NULL means English
unsafe fn locale_from_ptr(locale: *const c_char) -> Result<Locale, ComputeError> {
    match cstr_to_string(locale) {
        Some(s) => s.parse().map_err(ComputeError::ParseError),
        None => Ok(Locale::default()),
    }
}

/// Estimate together with its rendered band text
#[derive(Serialize)]
struct AnalysisResponse<'a> {
    #[serde(flatten)]
    estimate: &'a VitalsEstimate,
    label: &'static str,
    rationale: &'static str,
    indicator: Indicator,
}

/// Frame report together with its rendered feedback
#[derive(Serialize)]
struct FrameResponse<'a> {
    #[serde(flatten)]
    report: &'a FrameReport,
    message: &'static str,
}

// ============================================================================
// Stateless API
// ============================================================================

unsafe fn analyze_ppg(
    signal_json: *const c_char,
    history_json: *const c_char,
    config_json: *const c_char,
    locale: *const c_char,
) -> Result<*mut c_char, ComputeError> {
    let signal = cstr_to_string(signal_json)
        .ok_or_else(|| ComputeError::ParseError("Invalid signal string pointer".to_string()))?;
    let raw: Vec<f64> = serde_json::from_str(&signal)?;

    let history: Vec<HistoryRecord> = match cstr_to_string(history_json) {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    let config = config_from_ptr(config_json)?;
    let locale = locale_from_ptr(locale)?;

    let estimate = analyze_ppg_signal(&raw, &history, &config)?;
    let classification = estimate.classification;
    Ok(to_json_cstr(&AnalysisResponse {
        estimate: &estimate,
        label: classification.label(locale),
        rationale: classification.rationale(locale),
        indicator: classification.indicator(),
    }))
}

/// Estimate from a captured red-channel signal.
///
/// `signal_json` is a JSON array of numbers. `history_json` is an optional
/// JSON array of `{value, recorded_at}` records, most recent first.
///
/// # Safety
/// - `signal_json` must be a valid null-terminated C string.
/// - `history_json`, `config_json` and `locale` may be NULL.
/// - Returns a newly allocated string that must be freed with `pm_free_string`.
/// - Returns NULL on error; call `pm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pm_analyze_ppg(
    signal_json: *const c_char,
    history_json: *const c_char,
    config_json: *const c_char,
    locale: *const c_char,
) -> *mut c_char {
    clear_last_error();

    match analyze_ppg(signal_json, history_json, config_json, locale) {
        Ok(result) => result,
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Exercise Counter API
// ============================================================================

/// Opaque handle to one exercise session
pub struct ExerciseCounterHandle {
    tracker: ExerciseTracker,
    session_id: Option<SessionId>,
    locale: Locale,
}

impl ExerciseCounterHandle {
    fn session_id(&self) -> Result<SessionId, ComputeError> {
        self.session_id.ok_or_else(|| {
            ComputeError::InvalidState("exercise session already finished".to_string())
        })
    }
}

unsafe fn counter_new(
    user_id: *const c_char,
    kind: *const c_char,
    config_json: *const c_char,
    locale: *const c_char,
) -> Result<ExerciseCounterHandle, ComputeError> {
    let user_id = cstr_to_string(user_id)
        .ok_or_else(|| ComputeError::ParseError("Invalid user_id string pointer".to_string()))?;
    let kind: ExerciseKind = cstr_to_string(kind)
        .ok_or_else(|| ComputeError::ParseError("Invalid exercise string pointer".to_string()))?
        .parse()?;
    let config = config_from_ptr(config_json)?;
    let locale = locale_from_ptr(locale)?;

    let mut tracker = ExerciseTracker::new(config.exercise);
    let session_id = tracker.start(&user_id, kind);
    Ok(ExerciseCounterHandle {
        tracker,
        session_id: Some(session_id),
        locale,
    })
}

/// Create a repetition counter for one exercise session.
///
/// `kind` is one of `marching`, `knee-lifts`, `arm-circles`, `sit-to-stand`.
///
/// # Safety
/// - `user_id` and `kind` must be valid null-terminated C strings.
/// - `config_json` and `locale` may be NULL.
/// - Must be freed with `pm_exercise_counter_free`.
/// - Returns NULL on error; call `pm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pm_exercise_counter_new(
    user_id: *const c_char,
    kind: *const c_char,
    config_json: *const c_char,
    locale: *const c_char,
) -> *mut ExerciseCounterHandle {
    clear_last_error();

    match counter_new(user_id, kind, config_json, locale) {
        Ok(handle) => Box::into_raw(Box::new(handle)),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an exercise counter.
///
/// # Safety
/// - `counter` must be a valid pointer returned by `pm_exercise_counter_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pm_exercise_counter_free(counter: *mut ExerciseCounterHandle) {
    if !counter.is_null() {
        drop(Box::from_raw(counter));
    }
}

/// Feed one landmark frame (`{timestamp_ms, landmarks: [{x, y, visibility}]}`).
///
/// # Safety
/// - `counter` must be a valid pointer returned by `pm_exercise_counter_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pm_free_string`.
/// - Returns NULL on error; call `pm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pm_exercise_counter_process(
    counter: *mut ExerciseCounterHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if counter.is_null() {
        set_last_error("Null counter pointer");
        return ptr::null_mut();
    }

    let handle = &mut *counter;

    let frame_str = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };

    let result = handle.session_id().and_then(|id| {
        let frame: LandmarkFrame = serde_json::from_str(&frame_str)?;
        handle.tracker.process(id, &frame)
    });

    match result {
        Ok(report) => to_json_cstr(&FrameResponse {
            message: report.feedback.message(handle.locale),
            report: &report,
        }),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Reset the count and phase of the current session.
///
/// # Safety
/// - `counter` must be a valid pointer returned by `pm_exercise_counter_new`.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `pm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pm_exercise_counter_restart(counter: *mut ExerciseCounterHandle) -> i32 {
    clear_last_error();

    if counter.is_null() {
        set_last_error("Null counter pointer");
        return -1;
    }

    let handle = &mut *counter;

    match handle
        .session_id()
        .and_then(|id| handle.tracker.restart(id))
    {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// End the session and return its summary as JSON.
///
/// The counter accepts no more frames afterwards but must still be freed.
///
/// # Safety
/// - `counter` must be a valid pointer returned by `pm_exercise_counter_new`.
/// - Returns a newly allocated string that must be freed with `pm_free_string`.
/// - Returns NULL on error; call `pm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pm_exercise_counter_finish(
    counter: *mut ExerciseCounterHandle,
) -> *mut c_char {
    clear_last_error();

    if counter.is_null() {
        set_last_error("Null counter pointer");
        return ptr::null_mut();
    }

    let handle = &mut *counter;

    let result = handle.session_id().and_then(|id| handle.tracker.finish(id));
    match result {
        Ok(summary) => {
            handle.session_id = None;
            to_json_cstr(&summary)
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pulse Motion functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pulse Motion function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pm_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Pulse Motion call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Pulse Motion library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
