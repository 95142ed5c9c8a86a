//! FFI layer for native hosts
//!
//! Exposes the comparison as C-compatible functions that take UTF-8 C strings
//! and return JSON. Every returned string is owned by the caller and must be
//! released with [`dictation_free_string`].

// FFI functions necessarily work with raw pointers - this is expected behavior
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::compare::Comparator;
use crate::config::CompareConfig;
use crate::error::{Error, Result};
use crate::layout::{reference_line, user_line};

static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

fn set_last_error(message: impl Into<String>) {
    *LAST_ERROR.lock() = Some(message.into());
}

fn clear_last_error() {
    *LAST_ERROR.lock() = None;
}

fn read_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::InvalidInput(format!("{name} is null")));
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    text.to_str()
        .map_err(|_| Error::InvalidInput(format!("{name} is not valid UTF-8")))
}

fn into_c_string(text: String) -> *mut c_char {
    match CString::new(text) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Run `f` and hand its JSON back to C, recording any failure
fn respond(f: impl FnOnce() -> Result<String>) -> *mut c_char {
    clear_last_error();
    match f() {
        Ok(json) => into_c_string(json),
        Err(e) => {
            error!("Comparison failed: {}", e);
            set_last_error(e.to_string());
            ptr::null_mut()
        }
    }
}

fn comparator_from(config_json: *const c_char) -> Result<Comparator> {
    if config_json.is_null() {
        return Ok(Comparator::default());
    }
    let config = CompareConfig::from_json(read_str(config_json, "config")?)?;
    Comparator::new(config)
}

// ============ Comparison ============

/// Compare an answer with the reference using the default configuration.
///
/// Returns the comparison result as JSON, or null on failure (see
/// [`dictation_last_error`]).
#[unsafe(no_mangle)]
pub extern "C" fn dictation_compare_json(
    user_input: *const c_char,
    reference_text: *const c_char,
) -> *mut c_char {
    dictation_compare_with_config_json(user_input, reference_text, ptr::null())
}

/// Compare with a JSON configuration; a null config uses the defaults
#[unsafe(no_mangle)]
pub extern "C" fn dictation_compare_with_config_json(
    user_input: *const c_char,
    reference_text: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    respond(|| {
        let user = read_str(user_input, "user input")?;
        let reference = read_str(reference_text, "reference text")?;
        let comparator = comparator_from(config_json)?;
        debug!("FFI compare: {} / {} bytes", user.len(), reference.len());
        comparator.compare_json(user, reference)
    })
}

/// Compare and return the renderer-neutral layout as
/// `{"errorCount", "isCorrect", "userLine", "referenceLine"}` JSON
#[unsafe(no_mangle)]
pub extern "C" fn dictation_layout_json(
    user_input: *const c_char,
    reference_text: *const c_char,
) -> *mut c_char {
    respond(|| {
        let user = read_str(user_input, "user input")?;
        let reference = read_str(reference_text, "reference text")?;
        let result = Comparator::default().compare(user, reference)?;
        let layout = serde_json::json!({
            "isCorrect": result.is_correct,
            "errorCount": result.error_count,
            "userLine": user_line(&result),
            "referenceLine": reference_line(&result),
        });
        Ok(layout.to_string())
    })
}

// ============ Utilities ============

/// Message of the last failed call on any thread, or null if it succeeded
#[unsafe(no_mangle)]
pub extern "C" fn dictation_last_error() -> *mut c_char {
    match LAST_ERROR.lock().clone() {
        Some(message) => into_c_string(message),
        None => ptr::null_mut(),
    }
}

/// Free a string returned by dictation functions
#[unsafe(no_mangle)]
pub extern "C" fn dictation_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}
