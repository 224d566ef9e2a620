//! C-compatible FFI for the monitor GUI and other non-Rust hosts.
//!
//! All functions are `#[no_mangle] extern "C"`.
//!
//! Memory convention:
//!   - Caller allocates flat arrays and passes pointers (+ row counts).
//!   - Opaque handles (`*mut HaptickHandle`) are created by Rust and freed
//!     by Rust via `haptick_free`.
//!   - Return codes: 0 success, 1 error (see `haptick_last_error`), 2 null
//!     handle.

use crate::geometry::GeometryModel;
use crate::statics::WrenchSolver;
use crate::types::{GeometryParameters, HaptickError, Wrench, NUM_STRUTS};
use ndarray::ArrayView2;
use std::cell::RefCell;
use std::slice;

const OK: i32 = 0;
const ERROR: i32 = 1;
const NULL_HANDLE: i32 = 2;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_last_error(e: &HaptickError) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = e.to_string());
}

/// Length of an `n × width` flat `f64` buffer, rejecting sizes no
/// allocation can have.
fn flat_len(n: usize, width: usize) -> Result<usize, HaptickError> {
    n.checked_mul(width)
        .filter(|&len| len <= isize::MAX as usize / std::mem::size_of::<f64>())
        .ok_or_else(|| {
            HaptickError::DimensionMismatch(format!("{n} rows of width {width} overflow a buffer"))
        })
}

// ─────────────────────────────────────────────────────────────
//  Opaque handle
// ─────────────────────────────────────────────────────────────

/// Handle owning an immutable geometry model.
pub struct HaptickHandle {
    pub model: GeometryModel,
}

/// Build a geometry model.  Returns null on failure; the reason is
/// available from `haptick_last_error`.
#[no_mangle]
pub extern "C" fn haptick_create(
    top_radius: f64,
    top_separation: f64,
    bottom_radius: f64,
    bottom_separation: f64,
    height: f64,
) -> *mut HaptickHandle {
    let params = GeometryParameters {
        top_radius,
        top_separation,
        bottom_radius,
        bottom_separation,
        height,
    };
    match GeometryModel::new(params) {
        Ok(model) => Box::into_raw(Box::new(HaptickHandle { model })),
        Err(e) => {
            set_last_error(&e);
            std::ptr::null_mut()
        }
    }
}

/// Free a handle.
///
/// # Safety
/// `handle` must be null or a pointer returned by `haptick_create`.
#[no_mangle]
pub unsafe extern "C" fn haptick_free(handle: *mut HaptickHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Copy the last error message (UTF-8, not NUL-terminated) into `buf`.
///
/// Returns the number of bytes written, 0 if there is no error.
///
/// # Safety
/// `buf` must be valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn haptick_last_error(buf: *mut u8, len: usize) -> i32 {
    LAST_ERROR.with(|cell| {
        let msg = cell.borrow();
        let n = msg.len().min(len);
        if n > 0 && !buf.is_null() {
            slice::from_raw_parts_mut(buf, n).copy_from_slice(&msg.as_bytes()[..n]);
        }
        n as i32
    })
}

// ─────────────────────────────────────────────────────────────
//  Solves
// ─────────────────────────────────────────────────────────────

/// Strut forces for one wrench.
///
/// # Safety
/// `force` and `torque` valid for 3 values, `out` for 6.
#[no_mangle]
pub unsafe extern "C" fn haptick_strut_forces(
    handle: *const HaptickHandle,
    force: *const f64,
    torque: *const f64,
    out: *mut f64,
) -> i32 {
    let Some(h) = handle.as_ref() else {
        return NULL_HANDLE;
    };
    let f = slice::from_raw_parts(force, 3);
    let t = slice::from_raw_parts(torque, 3);
    let wrench = Wrench::new([f[0], f[1], f[2]], [t[0], t[1], t[2]]);
    let x = WrenchSolver::new(&h.model).strut_forces(&wrench);
    slice::from_raw_parts_mut(out, NUM_STRUTS).copy_from_slice(&x);
    OK
}

/// Strut forces for `n` wrenches.
///
/// # Safety
/// `forces`, `torques` valid for `n × 3` row-major values, `out` for `n × 6`.
#[no_mangle]
pub unsafe extern "C" fn haptick_strut_forces_batch(
    handle: *const HaptickHandle,
    n: usize,
    forces: *const f64,
    torques: *const f64,
    out: *mut f64,
) -> i32 {
    let Some(h) = handle.as_ref() else {
        return NULL_HANDLE;
    };
    let (in_len, out_len) = match flat_len(n, 3).and_then(|i| flat_len(n, NUM_STRUTS).map(|o| (i, o))) {
        Ok(lens) => lens,
        Err(e) => {
            set_last_error(&e);
            return ERROR;
        }
    };
    let forces = slice::from_raw_parts(forces, in_len);
    let torques = slice::from_raw_parts(torques, in_len);

    let result = ArrayView2::from_shape((n, 3), forces)
        .and_then(|f| ArrayView2::from_shape((n, 3), torques).map(|t| (f, t)))
        .map_err(|e| HaptickError::DimensionMismatch(e.to_string()))
        .and_then(|(f, t)| WrenchSolver::new(&h.model).strut_forces_batch(f, t));

    match result {
        Ok(x) => {
            let out = slice::from_raw_parts_mut(out, out_len);
            for (dst, &src) in out.iter_mut().zip(x.iter()) {
                *dst = src;
            }
            OK
        }
        Err(e) => {
            set_last_error(&e);
            ERROR
        }
    }
}

/// Applied force and torque for one set of strut forces.
///
/// # Safety
/// `strut_forces` valid for 6 values, `out_force` and `out_torque` for 3.
#[no_mangle]
pub unsafe extern "C" fn haptick_applied_wrench(
    handle: *const HaptickHandle,
    strut_forces: *const f64,
    out_force: *mut f64,
    out_torque: *mut f64,
) -> i32 {
    let Some(h) = handle.as_ref() else {
        return NULL_HANDLE;
    };
    let mut x = [0.0; NUM_STRUTS];
    x.copy_from_slice(slice::from_raw_parts(strut_forces, NUM_STRUTS));
    let w = WrenchSolver::new(&h.model).applied_wrench(&x);
    slice::from_raw_parts_mut(out_force, 3).copy_from_slice(&w.force);
    slice::from_raw_parts_mut(out_torque, 3).copy_from_slice(&w.torque);
    OK
}

/// Joint coordinates in strut order.
///
/// # Safety
/// `out_top` and `out_bottom` valid for 6 × 3 row-major values.
#[no_mangle]
pub unsafe extern "C" fn haptick_endpoints(
    handle: *const HaptickHandle,
    out_top: *mut f64,
    out_bottom: *mut f64,
) -> i32 {
    let Some(h) = handle.as_ref() else {
        return NULL_HANDLE;
    };
    let endpoints = h.model.endpoints();
    let top = slice::from_raw_parts_mut(out_top, NUM_STRUTS * 3);
    let bottom = slice::from_raw_parts_mut(out_bottom, NUM_STRUTS * 3);
    for i in 0..NUM_STRUTS {
        for d in 0..3 {
            top[i * 3 + d] = endpoints.top[[i, d]];
            bottom[i * 3 + d] = endpoints.bottom[[i, d]];
        }
    }
    OK
}
