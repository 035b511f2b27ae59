//! Binding to the engine's C interface (`libfplll` built with its C wrapper,
//! plus `libgmp`).
//!
//! Raw pointers never leave this module except as the associated types of
//! [`LinkedEngine`], which are only ever held by the owned handles.

use std::ffi::{c_char, c_double, c_int, CStr};

use super::{EngineLibrary, EnumStatus};

#[repr(C)]
pub struct RawMatrix {
    _private: [u8; 0],
}

#[repr(C)]
pub struct RawGso {
    _private: [u8; 0],
}

#[repr(C)]
pub struct RawBkzParam {
    _private: [u8; 0],
}

#[link(name = "fplll")]
#[link(name = "gmp")]
extern "C" {
    fn fplll_int_matrix_init(rows: c_int, cols: c_int) -> *mut RawMatrix;
    fn fplll_int_matrix_free(matrix: *mut RawMatrix);
    // Parses with mpz_set_str in base 10; returns 0 on success.
    fn fplll_int_matrix_set_str(matrix: *mut RawMatrix, row: c_int, col: c_int, value: *const c_char) -> c_int;
    // Returned string is owned by the caller and released with fplll_string_free.
    fn fplll_int_matrix_get_str(matrix: *mut RawMatrix, row: c_int, col: c_int) -> *mut c_char;
    fn fplll_string_free(s: *mut c_char);

    fn fplll_gso_init(matrix: *mut RawMatrix) -> *mut RawGso;
    fn fplll_gso_update(gso: *mut RawGso) -> c_int;
    fn fplll_gso_free(gso: *mut RawGso);
    fn fplll_gso_get_r(gso: *mut RawGso, index: c_int) -> c_double;
    fn fplll_size_reduce(gso: *mut RawGso) -> c_int;
    // Returns 1 when a vector was found, 0 when the radius was exhausted,
    // negative on error.
    fn fplll_enumerate(
        gso: *mut RawGso,
        squared_radius: c_double,
        coords: *mut c_double,
        dim: c_int,
        squared_norm: *mut c_double,
    ) -> c_int;

    fn fplll_bkz_param_init(block_size: c_int) -> *mut RawBkzParam;
    fn fplll_bkz_param_free(param: *mut RawBkzParam);
    fn fplll_bkz_reduce(matrix: *mut RawMatrix, param: *mut RawBkzParam) -> c_int;
}

/// Foreign string with a single release point.
struct EngineString(*mut c_char);

impl EngineString {
    fn to_string_lossy(&self) -> String {
        // SAFETY: non-null, NUL-terminated string returned by the engine.
        unsafe { CStr::from_ptr(self.0) }.to_string_lossy().into_owned()
    }
}

impl Drop for EngineString {
    fn drop(&mut self) {
        // SAFETY: allocated by the engine and freed only here.
        unsafe { fplll_string_free(self.0) }
    }
}

pub struct Ptr<T>(*mut T);

// SAFETY: every pointer is created and freed within one query on one thread;
// the engine keeps no shared state between contexts.
unsafe impl<T> Send for Ptr<T> {}
unsafe impl<T> Sync for Ptr<T> {}

fn non_null<T>(ptr: *mut T) -> Option<Ptr<T>> {
    (!ptr.is_null()).then_some(Ptr(ptr))
}

fn to_int(value: usize) -> Option<c_int> {
    c_int::try_from(value).ok()
}

/// The engine library linked into this binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedEngine;

impl EngineLibrary for LinkedEngine {
    type Matrix = Ptr<RawMatrix>;
    type Gso = Ptr<RawGso>;
    type BkzParam = Ptr<RawBkzParam>;

    fn matrix_alloc(&self, rows: usize, cols: usize) -> Option<Self::Matrix> {
        let (rows, cols) = (to_int(rows)?, to_int(cols)?);
        // SAFETY: plain allocation; null is handled.
        non_null(unsafe { fplll_int_matrix_init(rows, cols) })
    }

    fn matrix_free(&self, matrix: Self::Matrix) {
        // SAFETY: called once per allocation by MatrixHandle::drop.
        unsafe { fplll_int_matrix_free(matrix.0) }
    }

    fn matrix_set_entry(&self, matrix: &Self::Matrix, row: usize, col: usize, value: &CStr) -> bool {
        let (Some(row), Some(col)) = (to_int(row), to_int(col)) else {
            return false;
        };
        // SAFETY: live matrix, in-bounds indices, NUL-terminated value.
        unsafe { fplll_int_matrix_set_str(matrix.0, row, col, value.as_ptr()) == 0 }
    }

    fn matrix_get_entry(&self, matrix: &Self::Matrix, row: usize, col: usize) -> Option<String> {
        let (row, col) = (to_int(row)?, to_int(col)?);
        // SAFETY: live matrix, in-bounds indices.
        let raw = unsafe { fplll_int_matrix_get_str(matrix.0, row, col) };
        if raw.is_null() {
            return None;
        }
        Some(EngineString(raw).to_string_lossy())
    }

    fn gso_alloc(&self, matrix: &Self::Matrix) -> Option<Self::Gso> {
        // SAFETY: the GSO handle borrows the matrix handle, so the matrix outlives it.
        non_null(unsafe { fplll_gso_init(matrix.0) })
    }

    fn gso_update(&self, gso: &Self::Gso) -> bool {
        // SAFETY: live context.
        unsafe { fplll_gso_update(gso.0) == 0 }
    }

    fn gso_free(&self, gso: Self::Gso) {
        // SAFETY: called once per allocation by GsoHandle::drop.
        unsafe { fplll_gso_free(gso.0) }
    }

    fn gso_squared_norm(&self, gso: &Self::Gso, index: usize) -> f64 {
        match to_int(index) {
            // SAFETY: live context; the engine returns NaN for out-of-range indices.
            Some(index) => unsafe { fplll_gso_get_r(gso.0, index) },
            None => f64::NAN,
        }
    }

    fn size_reduce(&self, gso: &Self::Gso) -> bool {
        // SAFETY: live context.
        unsafe { fplll_size_reduce(gso.0) == 0 }
    }

    fn enumerate(&self, gso: &Self::Gso, squared_radius: f64, coords: &mut [f64]) -> EnumStatus {
        let Some(dim) = to_int(coords.len()) else {
            return EnumStatus::Failed;
        };
        let mut squared_norm: c_double = 0.0;
        // SAFETY: `coords` holds `dim` writable doubles for the duration of the call.
        let status = unsafe { fplll_enumerate(gso.0, squared_radius, coords.as_mut_ptr(), dim, &mut squared_norm) };
        match status {
            1 => EnumStatus::Found { squared_norm },
            0 => EnumStatus::Exhausted,
            _ => EnumStatus::Failed,
        }
    }

    fn bkz_param_alloc(&self, block_size: usize) -> Option<Self::BkzParam> {
        // SAFETY: plain allocation; null is handled.
        non_null(unsafe { fplll_bkz_param_init(to_int(block_size)?) })
    }

    fn bkz_param_free(&self, param: Self::BkzParam) {
        // SAFETY: called once per allocation by BkzParamHandle::drop.
        unsafe { fplll_bkz_param_free(param.0) }
    }

    fn bkz_reduce(&self, matrix: &Self::Matrix, param: &Self::BkzParam) -> bool {
        // SAFETY: live matrix and parameter object.
        unsafe { fplll_bkz_reduce(matrix.0, param.0) == 0 }
    }
}

