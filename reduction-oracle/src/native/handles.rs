//! Owned handles for foreign engine resources.
//!
//! Each handle wraps one raw resource from an [`EngineLibrary`] and releases
//! it exactly once, in `Drop`. Handles borrow the library, and a GSO context
//! borrows the matrix it was built from, so a context can never outlive its
//! matrix.

use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;

use super::EngineLibrary;

pub struct MatrixHandle<'a, L: EngineLibrary> {
    lib: &'a L,
    raw: ManuallyDrop<L::Matrix>,
    rows: usize,
    cols: usize,
}

impl<'a, L: EngineLibrary> MatrixHandle<'a, L> {
    pub fn alloc(lib: &'a L, rows: usize, cols: usize) -> Option<Self> {
        let raw = lib.matrix_alloc(rows, cols)?;
        Some(Self {
            lib,
            raw: ManuallyDrop::new(raw),
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

impl<L: EngineLibrary> Deref for MatrixHandle<'_, L> {
    type Target = L::Matrix;

    fn deref(&self) -> &L::Matrix {
        &self.raw
    }
}

impl<L: EngineLibrary> Drop for MatrixHandle<'_, L> {
    fn drop(&mut self) {
        // SAFETY: `raw` is taken once, here, and never touched again.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        self.lib.matrix_free(raw);
    }
}

pub struct GsoHandle<'a, L: EngineLibrary> {
    lib: &'a L,
    raw: ManuallyDrop<L::Gso>,
    _matrix: PhantomData<&'a MatrixHandle<'a, L>>,
}

impl<'a, L: EngineLibrary> GsoHandle<'a, L> {
    pub fn alloc(lib: &'a L, matrix: &'a MatrixHandle<'a, L>) -> Option<Self> {
        let raw = lib.gso_alloc(matrix)?;
        Some(Self {
            lib,
            raw: ManuallyDrop::new(raw),
            _matrix: PhantomData,
        })
    }
}

impl<L: EngineLibrary> Deref for GsoHandle<'_, L> {
    type Target = L::Gso;

    fn deref(&self) -> &L::Gso {
        &self.raw
    }
}

impl<L: EngineLibrary> Drop for GsoHandle<'_, L> {
    fn drop(&mut self) {
        // SAFETY: see MatrixHandle::drop.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        self.lib.gso_free(raw);
    }
}

pub struct BkzParamHandle<'a, L: EngineLibrary> {
    lib: &'a L,
    raw: ManuallyDrop<L::BkzParam>,
}

impl<'a, L: EngineLibrary> BkzParamHandle<'a, L> {
    pub fn alloc(lib: &'a L, block_size: usize) -> Option<Self> {
        let raw = lib.bkz_param_alloc(block_size)?;
        Some(Self {
            lib,
            raw: ManuallyDrop::new(raw),
        })
    }
}

impl<L: EngineLibrary> Deref for BkzParamHandle<'_, L> {
    type Target = L::BkzParam;

    fn deref(&self) -> &L::BkzParam {
        &self.raw
    }
}

impl<L: EngineLibrary> Drop for BkzParamHandle<'_, L> {
    fn drop(&mut self) {
        // SAFETY: see MatrixHandle::drop.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        self.lib.bkz_param_free(raw);
    }
}
