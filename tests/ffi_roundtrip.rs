//! FFI round-trip tests — call the `extern "C"` functions directly from Rust
//! to catch marshalling bugs before the monitor GUI enters the picture.
//!
//! These mirror the safe-Rust tests in `integration.rs` but go through the
//! raw pointer / handle-based FFI boundary.

use std::ptr;

// The crate also builds as `rlib`, so the cdylib symbols link directly.
use haptick::ffi::*;
use haptick::geometry::GeometryModel;
use haptick::statics::WrenchSolver;
use haptick::types::*;

// ─────────────────────────────────────────────────────────────
//  Shared platform (30 mm top, 15 mm bottom, 6 mm pairs, 20 mm high)
// ─────────────────────────────────────────────────────────────

fn params() -> GeometryParameters {
    GeometryParameters {
        top_radius: 30e-3,
        top_separation: 6e-3,
        bottom_radius: 15e-3,
        bottom_separation: 6e-3,
        height: 20e-3,
    }
}

/// Create a handle via FFI; panics if null.
unsafe fn create_handle(p: &GeometryParameters) -> *mut HaptickHandle {
    let h = haptick_create(
        p.top_radius,
        p.top_separation,
        p.bottom_radius,
        p.bottom_separation,
        p.height,
    );
    assert!(!h.is_null(), "haptick_create returned null: {}", get_last_error());
    h
}

fn get_last_error() -> String {
    let mut buf = vec![0u8; 1024];
    let n = unsafe { haptick_last_error(buf.as_mut_ptr(), buf.len()) };
    if n <= 0 { return String::from("(no error)"); }
    String::from_utf8_lossy(&buf[..n as usize]).to_string()
}

// ─────────────────────────────────────────────────────────────
//  Test: create / free round-trip
// ─────────────────────────────────────────────────────────────

#[test]
fn ffi_create_and_free() {
    unsafe {
        let h = create_handle(&params());
        haptick_free(h);
    }
    // Also verify freeing null is safe
    unsafe { haptick_free(ptr::null_mut()); }
}

#[test]
fn ffi_singular_geometry_returns_null_with_message() {
    let r = 0.025;
    let p = GeometryParameters::from_angular(r, std::f64::consts::PI / 3.0, r, std::f64::consts::PI / 3.0, 0.02);
    let h = haptick_create(p.top_radius, p.top_separation, p.bottom_radius, p.bottom_separation, p.height);
    assert!(h.is_null());
    assert!(get_last_error().contains("singular"), "message: {}", get_last_error());
}

#[test]
fn ffi_invalid_parameters_return_null() {
    let h = haptick_create(-1.0, 6e-3, 15e-3, 6e-3, 20e-3);
    assert!(h.is_null());
    assert!(get_last_error().contains("top_radius"));
}

#[test]
fn ffi_last_error_truncates_to_buffer() {
    let _ = haptick_create(0.0, 0.0, 0.0, 0.0, 0.0);
    let mut buf = [0u8; 4];
    let n = unsafe { haptick_last_error(buf.as_mut_ptr(), buf.len()) };
    assert_eq!(n, 4);
    assert_eq!(&buf, b"inva");
}

// ─────────────────────────────────────────────────────────────
//  Test: solves agree with the safe API
// ─────────────────────────────────────────────────────────────

#[test]
fn ffi_strut_forces_match_rust() {
    let model = GeometryModel::new(params()).unwrap();
    let wrench = Wrench::new([0.01, -0.02, -0.196], [1e-3, 0.0, -2e-3]);
    let expected = WrenchSolver::new(&model).strut_forces(&wrench);

    unsafe {
        let h = create_handle(&params());
        let mut out = [0.0; NUM_STRUTS];
        let rc = haptick_strut_forces(h, wrench.force.as_ptr(), wrench.torque.as_ptr(), out.as_mut_ptr());
        assert_eq!(rc, 0, "strut forces failed: {}", get_last_error());
        assert_eq!(out, expected);
        haptick_free(h);
    }
}

#[test]
fn ffi_batch_matches_single() {
    let n = 7;
    let forces: Vec<f64> = (0..n * 3).map(|k| 0.05 * ((k as f64) * 0.7).sin()).collect();
    let torques: Vec<f64> = (0..n * 3).map(|k| 2e-3 * ((k as f64) * 1.3).cos()).collect();

    unsafe {
        let h = create_handle(&params());
        let mut batch = vec![0.0; n * NUM_STRUTS];
        let rc = haptick_strut_forces_batch(h, n, forces.as_ptr(), torques.as_ptr(), batch.as_mut_ptr());
        assert_eq!(rc, 0, "batch failed: {}", get_last_error());

        for i in 0..n {
            let mut single = [0.0; NUM_STRUTS];
            let rc = haptick_strut_forces(
                h,
                forces[i * 3..].as_ptr(),
                torques[i * 3..].as_ptr(),
                single.as_mut_ptr(),
            );
            assert_eq!(rc, 0);
            assert_eq!(&batch[i * NUM_STRUTS..(i + 1) * NUM_STRUTS], &single[..]);
        }
        haptick_free(h);
    }
}

#[test]
fn ffi_applied_wrench_round_trip() {
    let force = [0.03, 0.01, -0.1];
    let torque = [-1e-3, 4e-3, 5e-4];

    unsafe {
        let h = create_handle(&params());
        let mut x = [0.0; NUM_STRUTS];
        assert_eq!(0, haptick_strut_forces(h, force.as_ptr(), torque.as_ptr(), x.as_mut_ptr()));

        let mut f = [0.0; 3];
        let mut t = [0.0; 3];
        let rc = haptick_applied_wrench(h, x.as_ptr(), f.as_mut_ptr(), t.as_mut_ptr());
        assert_eq!(rc, 0);
        for d in 0..3 {
            assert!((f[d] - force[d]).abs() < 1e-12, "force {d}: {} vs {}", f[d], force[d]);
            assert!((t[d] - torque[d]).abs() < 1e-12, "torque {d}: {} vs {}", t[d], torque[d]);
        }
        haptick_free(h);
    }
}

#[test]
fn ffi_endpoints_are_row_major_strut_order() {
    let model = GeometryModel::new(params()).unwrap();
    let ends = model.endpoints();

    unsafe {
        let h = create_handle(&params());
        let mut top = [0.0; NUM_STRUTS * 3];
        let mut bottom = [0.0; NUM_STRUTS * 3];
        assert_eq!(0, haptick_endpoints(h, top.as_mut_ptr(), bottom.as_mut_ptr()));
        for i in 0..NUM_STRUTS {
            for d in 0..3 {
                assert_eq!(top[i * 3 + d], ends.top[[i, d]]);
                assert_eq!(bottom[i * 3 + d], ends.bottom[[i, d]]);
            }
        }
        haptick_free(h);
    }
}

#[test]
fn ffi_batch_rejects_overflowing_row_count() {
    let force = [0.0; 3];
    let torque = [0.0; 3];
    let mut out = [0.0; NUM_STRUTS];

    unsafe {
        let h = create_handle(&params());
        // Neither buffer is touched: the row count is rejected first.
        for n in [usize::MAX, usize::MAX / 3 + 1, usize::MAX / NUM_STRUTS + 1] {
            let rc = haptick_strut_forces_batch(h, n, force.as_ptr(), torque.as_ptr(), out.as_mut_ptr());
            assert_eq!(rc, 1, "n = {n}");
            assert!(get_last_error().contains("dimension mismatch"), "message: {}", get_last_error());
        }
        assert_eq!(out, [0.0; NUM_STRUTS]);
        haptick_free(h);
    }
}

// ─────────────────────────────────────────────────────────────
//  Test: null handles
// ─────────────────────────────────────────────────────────────

#[test]
fn ffi_null_handle_is_reported() {
    let force = [0.0; 3];
    let torque = [0.0; 3];
    let mut out = [0.0; NUM_STRUTS * 3];
    let mut out2 = [0.0; NUM_STRUTS * 3];

    unsafe {
        assert_eq!(2, haptick_strut_forces(ptr::null(), force.as_ptr(), torque.as_ptr(), out.as_mut_ptr()));
        assert_eq!(2, haptick_strut_forces_batch(ptr::null(), 1, force.as_ptr(), torque.as_ptr(), out.as_mut_ptr()));
        assert_eq!(2, haptick_applied_wrench(ptr::null(), out.as_ptr(), out2.as_mut_ptr(), out2[3..].as_mut_ptr()));
        assert_eq!(2, haptick_endpoints(ptr::null(), out.as_mut_ptr(), out2.as_mut_ptr()));
    }
}
