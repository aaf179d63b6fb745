//! Drives the exported C function table the way a host runtime would.
//! Tests share the process-wide registry, so each one works only with the
//! handles it creates.

use std::ffi::{CStr, CString};
use std::ptr;

use ewma_bridge::*;

fn state_json(handle: i64) -> String {
    let raw = ewma_get_state_json(handle);
    assert!(!raw.is_null());
    let text = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_owned();
    unsafe { ewma_free_string(raw) };
    text
}

fn set_state_json(handle: i64, json: &str) -> bool {
    let c = CString::new(json).unwrap();
    unsafe { ewma_set_state_json(handle, c.as_ptr()) }
}

fn batch(handle: i64, values: &[f64]) -> Option<Vec<f64>> {
    let out = unsafe { ewma_calculate_batch(handle, values.as_ptr(), values.len()) };
    if out.is_null() {
        return None;
    }
    let trace = unsafe { std::slice::from_raw_parts(out, values.len()) }.to_vec();
    unsafe { ewma_free_batch(out, values.len()) };
    Some(trace)
}

#[test]
fn test_smoke_sequence() {
    let h = ewma_create(0.3);
    assert!(h >= 1);

    assert_eq!(ewma_update(h, 10.0), 10.0);
    assert!((ewma_update(h, 20.0) - 13.0).abs() < 1e-10);
    assert!((ewma_get_value(h) - 13.0).abs() < 1e-10);

    assert!(ewma_reset(h));
    assert_eq!(ewma_get_value(h), 0.0);

    assert!(ewma_set_alpha(h, 0.7));
    assert_eq!(ewma_update(h, 100.0), 100.0);

    assert!(ewma_destroy(h));
}

#[test]
fn test_invalid_alpha_is_clamped_on_create() {
    let h = ewma_create(-1.0);
    assert!(h >= 1);
    let json = state_json(h);
    assert!(json.contains("\"alpha\":0.1"), "{}", json);
    assert!(ewma_destroy(h));
}

#[test]
fn test_set_alpha_rejects_out_of_range() {
    let h = ewma_create(0.3);
    ewma_update(h, 10.0);
    assert!(!ewma_set_alpha(h, 1.5));
    assert!(!ewma_set_alpha(h, -0.1));
    ewma_update(h, 20.0);
    assert!((ewma_get_value(h) - 13.0).abs() < 1e-10);
    assert!(ewma_destroy(h));
}

#[test]
fn test_destroyed_handle_reports_sentinels() {
    let h = ewma_create(0.5);
    assert!(ewma_destroy(h));

    assert!(ewma_update(h, 1.0).is_nan());
    assert!(ewma_get_value(h).is_nan());
    assert!(!ewma_reset(h));
    assert!(!ewma_set_alpha(h, 0.5));
    assert!(!ewma_destroy(h));
    assert!(batch(h, &[1.0, 2.0]).is_none());
    assert_eq!(state_json(h), r#"{"error":"instance not found"}"#);
    assert!(!set_state_json(h, r#"{"alpha":0.5,"value":1.0,"is_init":true}"#));
}

#[test]
fn test_reserved_and_negative_handles() {
    for h in [0, -1, i64::MIN] {
        assert!(ewma_update(h, 1.0).is_nan());
        assert!(!ewma_destroy(h));
        assert_eq!(state_json(h), r#"{"error":"instance not found"}"#);
    }
}

#[test]
fn test_handles_not_reissued() {
    let first = ewma_create(0.3);
    assert!(ewma_destroy(first));
    let second = ewma_create(0.3);
    assert_ne!(first, second);
    assert!(second > first);
    assert!(ewma_destroy(second));
}

#[test]
fn test_batch_trace() {
    let h = ewma_create(0.5);
    let trace = batch(h, &[10.0, 20.0, 15.0, 25.0]).unwrap();
    assert_eq!(trace, vec![10.0, 15.0, 15.0, 20.0]);
    assert_eq!(ewma_get_value(h), 20.0);
    assert!(ewma_destroy(h));
}

#[test]
fn test_batch_null_and_empty_inputs() {
    let h = ewma_create(0.5);
    ewma_update(h, 4.0);

    assert!(unsafe { ewma_calculate_batch(h, ptr::null(), 3) }.is_null());
    assert!(batch(h, &[]).is_none());
    assert_eq!(ewma_get_value(h), 4.0);

    unsafe { ewma_free_batch(ptr::null_mut(), 0) };
    assert!(ewma_destroy(h));
}

#[test]
fn test_state_json_round_trip_between_handles() {
    let src = ewma_create(0.3);
    ewma_update(src, 10.0);
    ewma_update(src, 20.0);
    let json = state_json(src);

    let dst = ewma_create(0.9);
    assert!(set_state_json(dst, &json));
    assert_eq!(ewma_get_value(dst).to_bits(), ewma_get_value(src).to_bits());
    assert_eq!(state_json(dst), json);

    assert!(ewma_destroy(src));
    assert!(ewma_destroy(dst));
}

#[test]
fn test_set_state_json_rejects_bad_input() {
    let h = ewma_create(0.3);
    ewma_update(h, 10.0);
    let before = state_json(h);

    assert!(!set_state_json(h, "{"));
    assert!(!set_state_json(h, r#"{"alpha":0.5}"#));
    assert!(!set_state_json(h, r#"{"error":"instance not found"}"#));
    assert!(!unsafe { ewma_set_state_json(h, ptr::null()) });

    let invalid_utf8 = [0xffu8, 0xfe, 0x00];
    assert!(!unsafe { ewma_set_state_json(h, invalid_utf8.as_ptr() as *const _) });

    assert_eq!(state_json(h), before);
    assert!(ewma_destroy(h));
}

#[test]
fn test_non_finite_state_reports_serialization_failure() {
    let h = ewma_create(0.5);
    ewma_update(h, f64::NAN);
    assert_eq!(state_json(h), r#"{"error":"serialization failed"}"#);
    assert!(ewma_reset(h));
    assert!(state_json(h).contains("\"is_init\":false"));
    assert!(ewma_destroy(h));
}

#[test]
fn test_concurrent_updates_on_shared_handle() {
    let h = ewma_create(1.0);
    let threads: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    assert_eq!(ewma_update(h, 2.0), 2.0);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(ewma_get_value(h), 2.0);
    assert!(ewma_destroy(h));
}
