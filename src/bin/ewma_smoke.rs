//! End-to-end run of the exported function table, in the order a host
//! binding would exercise it.

use std::ffi::CStr;
use std::process::ExitCode;

use tracing::{error, info};

use ewma_bridge::{
    ewma_create, ewma_destroy, ewma_free_string, ewma_get_state_json, ewma_get_value,
    ewma_reset, ewma_set_alpha, ewma_update, ewma_version,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let version = unsafe { CStr::from_ptr(ewma_version()) }.to_string_lossy();
    info!(%version, "Testing EWMA C library");

    let handle = ewma_create(0.3);
    if handle == 0 {
        error!("Failed to create EWMA instance");
        return ExitCode::FAILURE;
    }
    info!(handle, "Created EWMA instance");

    for value in [10.0, 20.0, 15.0, 25.0, 30.0] {
        let ewma = ewma_update(handle, value);
        info!(value, ewma, "update");
    }

    info!(value = ewma_get_value(handle), "Current EWMA value");

    ewma_reset(handle);
    info!(value = ewma_get_value(handle), "Value after reset");

    if ewma_set_alpha(handle, 0.7) {
        ewma_update(handle, 100.0);
        info!(
            value = ewma_get_value(handle),
            "Alpha changed to 0.7, value after update(100)"
        );
    } else {
        error!("Failed to change alpha");
    }

    let raw = ewma_get_state_json(handle);
    if !raw.is_null() {
        let state = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        info!(%state, "Current state");
        unsafe { ewma_free_string(raw) };
    }

    if !ewma_destroy(handle) {
        error!(handle, "Failed to destroy EWMA instance");
        return ExitCode::FAILURE;
    }
    info!(handle, "Destroyed EWMA instance");

    ExitCode::SUCCESS
}
