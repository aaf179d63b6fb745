//! C-callable EWMA accumulators addressed by integer handle.
//!
//! Every exported function follows the same contract: look up the handle in
//! the process-wide registry, forward to the accumulator, and report failure
//! with a sentinel (NaN, `false`, null or an error payload). Panics never
//! unwind into the host; they are caught and turned into the same sentinel.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_longlong};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use tracing::Level;

pub mod algo;
pub mod config;
pub mod error;
pub mod registry;
pub mod snapshot;

pub use algo::Ewma;
pub use config::{DEFAULT_ALPHA, RegistryConfig};
pub use error::EwmaError;
pub use registry::{BridgeContext, EwmaRegistry, GLOBAL_BRIDGE, Handle};

use snapshot::{INSTANCE_NOT_FOUND_PAYLOAD, SERIALIZATION_FAILED_PAYLOAD};

fn guard<R>(fallback: R, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

/// Negative handles were never issued; map them onto the reserved 0.
fn to_handle(handle: c_longlong) -> Handle {
    Handle::try_from(handle).unwrap_or(0)
}

fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

// --- Lifecycle ---

/// Returns a handle >= 1, or 0 if no handle could be issued.
#[unsafe(export_name = "CreateEWMA")]
pub extern "C" fn ewma_create(alpha: c_double) -> c_longlong {
    guard(0, || {
        GLOBAL_BRIDGE
            .with(|r| r.create(alpha))
            .map(|h| h as c_longlong)
            .unwrap_or(0)
    })
}

#[unsafe(export_name = "DestroyEWMA")]
pub extern "C" fn ewma_destroy(handle: c_longlong) -> bool {
    guard(false, || {
        GLOBAL_BRIDGE.with(|r| r.destroy(to_handle(handle))).is_ok()
    })
}

// --- Accumulator operations ---

#[unsafe(export_name = "UpdateEWMA")]
pub extern "C" fn ewma_update(handle: c_longlong, value: c_double) -> c_double {
    guard(f64::NAN, || {
        GLOBAL_BRIDGE
            .with(|r| r.update(to_handle(handle), value))
            .unwrap_or(f64::NAN)
    })
}

#[unsafe(export_name = "GetEWMAValue")]
pub extern "C" fn ewma_get_value(handle: c_longlong) -> c_double {
    guard(f64::NAN, || {
        GLOBAL_BRIDGE
            .with(|r| r.value(to_handle(handle)))
            .unwrap_or(f64::NAN)
    })
}

#[unsafe(export_name = "ResetEWMA")]
pub extern "C" fn ewma_reset(handle: c_longlong) -> bool {
    guard(false, || {
        GLOBAL_BRIDGE.with(|r| r.reset(to_handle(handle))).is_ok()
    })
}

/// `false` for an unknown handle or an alpha outside [0, 1].
#[unsafe(export_name = "SetEWMAAlpha")]
pub extern "C" fn ewma_set_alpha(handle: c_longlong, alpha: c_double) -> bool {
    guard(false, || {
        GLOBAL_BRIDGE
            .with(|r| r.set_alpha(to_handle(handle), alpha))
            .is_ok()
    })
}

/// Feed `length` samples through the accumulator and return the running
/// trace as a newly allocated array of `length` doubles.
///
/// Returns null (and touches nothing) for an unknown handle, a null input or
/// an empty input. A non-null result must be released with `FreeEWMABatch`.
///
/// # Safety
///
/// `values` must be null or point to `length` readable doubles.
#[unsafe(export_name = "CalculateEWMABatch")]
pub unsafe extern "C" fn ewma_calculate_batch(
    handle: c_longlong,
    values: *const c_double,
    length: usize,
) -> *mut c_double {
    if values.is_null() || length == 0 {
        return ptr::null_mut();
    }
    let samples = unsafe { std::slice::from_raw_parts(values, length) };

    guard(ptr::null_mut(), || {
        match GLOBAL_BRIDGE.with(|r| r.calculate_batch(to_handle(handle), samples)) {
            Ok(trace) => Box::into_raw(trace.into_boxed_slice()) as *mut c_double,
            Err(_) => ptr::null_mut(),
        }
    })
}

/// # Safety
///
/// `ptr` must be null or a pointer returned by `CalculateEWMABatch` with the
/// same `length`, not yet freed.
#[unsafe(export_name = "FreeEWMABatch")]
pub unsafe extern "C" fn ewma_free_batch(ptr: *mut c_double, length: usize) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, length));
    }
}

// --- Snapshots ---

/// JSON snapshot of the accumulator, or an `{"error":...}` payload.
/// Never null under normal operation; release with `FreeString`.
#[unsafe(export_name = "GetEWMAStateJSON")]
pub extern "C" fn ewma_get_state_json(handle: c_longlong) -> *mut c_char {
    guard(ptr::null_mut(), || {
        match GLOBAL_BRIDGE.with(|r| r.state_json(to_handle(handle))) {
            Ok(json) => into_c_string(&json),
            Err(EwmaError::HandleNotFound(_)) => into_c_string(INSTANCE_NOT_FOUND_PAYLOAD),
            Err(_) => into_c_string(SERIALIZATION_FAILED_PAYLOAD),
        }
    })
}

/// # Safety
///
/// `json` must be null or a NUL-terminated string valid for the duration of
/// the call.
#[unsafe(export_name = "SetEWMAStateJSON")]
pub unsafe extern "C" fn ewma_set_state_json(handle: c_longlong, json: *const c_char) -> bool {
    if json.is_null() {
        return false;
    }
    let c_str = unsafe { CStr::from_ptr(json) };
    let json_str = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return false,
    };

    guard(false, || {
        GLOBAL_BRIDGE
            .with(|r| r.restore_json(to_handle(handle), json_str))
            .is_ok()
    })
}

/// # Safety
///
/// `s` must be null or a string returned by `GetEWMAStateJSON`, not yet freed.
#[unsafe(export_name = "FreeString")]
pub unsafe extern "C" fn ewma_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(s);
    }
}

// --- Diagnostics ---

#[unsafe(export_name = "GetEWMAInstanceCount")]
pub extern "C" fn ewma_instance_count() -> usize {
    guard(0, || GLOBAL_BRIDGE.with(|r| r.len()))
}

/// Static version string; do not free.
#[unsafe(export_name = "GetEWMAVersion")]
pub extern "C" fn ewma_version() -> *const c_char {
    static VERSION: &str = concat!("ewma-bridge-", env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

/// Install a stderr log subscriber. Returns `false` if one was already set.
#[unsafe(export_name = "InitEWMALogging")]
pub extern "C" fn ewma_init_logging(verbose: bool) -> bool {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    guard(false, || {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
}

/// Self-test trace for alpha 0.3, one line per step
pub fn self_test_lines() -> Vec<String> {
    let mut ewma = Ewma::new(0.3);
    [10.0, 20.0, 15.0, 25.0, 30.0]
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let result = ewma.update(x);
            format!("Step {}: Input={:.6}, EWMA={:.6}", i + 1, x, result)
        })
        .collect()
}

/// Print the self-test trace to stdout.
#[unsafe(export_name = "TestEWMA")]
pub extern "C" fn ewma_self_test() {
    guard((), || {
        println!("EWMA Test Results:");
        for line in self_test_lines() {
            println!("{}", line);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_handle() {
        assert_eq!(to_handle(5), 5);
        assert_eq!(to_handle(0), 0);
        assert_eq!(to_handle(-3), 0);
    }

    #[test]
    fn test_guard_catches_panic() {
        let out = guard(f64::NAN, || -> f64 { panic!("boom") });
        assert!(out.is_nan());
        assert!(guard(false, || true));
    }

    #[test]
    fn test_self_test_lines() {
        let lines = self_test_lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Step 1: Input=10.000000, EWMA=10.000000");
        assert_eq!(lines[1], "Step 2: Input=20.000000, EWMA=13.000000");
    }

    #[test]
    fn test_version_is_nul_terminated() {
        let version = unsafe { CStr::from_ptr(ewma_version()) };
        assert!(version.to_str().unwrap().starts_with("ewma-bridge-"));
    }
}
