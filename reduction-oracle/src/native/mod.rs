//! Foreign-library backend: calls the reduction engine in process.
//!
//! The engine's C interface is abstracted as [`EngineLibrary`]. Every entry is
//! marshalled through the string-based cell setter, so arbitrarily large
//! integers cross the boundary without loss. All foreign allocations live in
//! the owned handles of [`handles`] and are released when the query returns.
//!
//! The binding to the real library is compiled only with the `fplll`
//! feature; see [`linked_backend`].

pub mod handles;
#[cfg(feature = "fplll")]
pub mod linked;

use std::ffi::CString;

use lattice_core::{squared_norm, LatticeBasis};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::oracle::{enter_phase, BackendKind, FoundVector, Profile, QueryPhase, ReductionBackend, SvpOutcome};
use crate::OracleError;
use handles::{BkzParamHandle, GsoHandle, MatrixHandle};

/// Result of a radius-bounded enumeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumStatus {
    /// Coordinates were written; `squared_norm` is the engine's own figure.
    Found { squared_norm: f64 },
    /// No nonzero vector within the radius.
    Exhausted,
    Failed,
}

/// The reduction engine's foreign interface.
///
/// Raw resources are plain associated types; callers never free them
/// directly but go through the handles in [`handles`].
pub trait EngineLibrary: Send + Sync {
    type Matrix;
    type Gso;
    type BkzParam;

    fn matrix_alloc(&self, rows: usize, cols: usize) -> Option<Self::Matrix>;
    fn matrix_free(&self, matrix: Self::Matrix);
    /// Set a cell from a base-10 string. Returns `false` if the engine rejects it.
    fn matrix_set_entry(&self, matrix: &Self::Matrix, row: usize, col: usize, value: &std::ffi::CStr) -> bool;
    fn matrix_get_entry(&self, matrix: &Self::Matrix, row: usize, col: usize) -> Option<String>;

    fn gso_alloc(&self, matrix: &Self::Matrix) -> Option<Self::Gso>;
    fn gso_update(&self, gso: &Self::Gso) -> bool;
    fn gso_free(&self, gso: Self::Gso);
    /// Squared norm of the `index`-th Gram-Schmidt vector.
    fn gso_squared_norm(&self, gso: &Self::Gso, index: usize) -> f64;
    fn size_reduce(&self, gso: &Self::Gso) -> bool;
    /// Search for a nonzero vector of squared norm at most `squared_radius`,
    /// writing its coordinates in the current basis to `coords`.
    fn enumerate(&self, gso: &Self::Gso, squared_radius: f64, coords: &mut [f64]) -> EnumStatus;

    fn bkz_param_alloc(&self, block_size: usize) -> Option<Self::BkzParam>;
    fn bkz_param_free(&self, param: Self::BkzParam);
    fn bkz_reduce(&self, matrix: &Self::Matrix, param: &Self::BkzParam) -> bool;
}

#[derive(Debug, Clone)]
pub struct NativeConfig {
    /// Block size of the reduction run before enumeration; BKZ-2 is LLL.
    /// `None` enumerates on the input basis as given.
    pub preprocess_block_size: Option<usize>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            preprocess_block_size: Some(2),
        }
    }
}

pub struct NativeBackend<L: EngineLibrary> {
    lib: L,
    config: NativeConfig,
}

fn engine_failure(call: &str) -> OracleError {
    OracleError::ProcessFailure {
        status: format!("{} failed", call),
        stderr: String::new(),
    }
}

impl<L: EngineLibrary> NativeBackend<L> {
    pub fn new(lib: L, config: NativeConfig) -> Self {
        Self { lib, config }
    }

    pub fn library(&self) -> &L {
        &self.lib
    }

    fn marshal(&self, basis: &LatticeBasis) -> Result<MatrixHandle<'_, L>, OracleError> {
        let matrix = MatrixHandle::alloc(&self.lib, basis.rank(), basis.dimension())
            .ok_or_else(|| OracleError::SerializationFailure("matrix allocation failed".into()))?;
        for (i, row) in basis.rows().iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let cell = CString::new(value.to_string())
                    .map_err(|e| OracleError::SerializationFailure(e.to_string()))?;
                if !self.lib.matrix_set_entry(&matrix, i, j, &cell) {
                    return Err(OracleError::SerializationFailure(format!(
                        "engine rejected entry ({}, {}) = {}",
                        i, j, value
                    )));
                }
            }
        }
        Ok(matrix)
    }

    fn bkz(&self, matrix: &MatrixHandle<'_, L>, block_size: usize) -> Result<(), OracleError> {
        let param = BkzParamHandle::alloc(&self.lib, block_size)
            .ok_or_else(|| engine_failure("BKZ parameter allocation"))?;
        if !self.lib.bkz_reduce(matrix, &param) {
            return Err(engine_failure("BKZ reduction"));
        }
        Ok(())
    }

    /// Read the (possibly reduced) basis back out of the engine.
    fn read_rows(&self, matrix: &MatrixHandle<'_, L>) -> Result<Vec<Vec<BigInt>>, OracleError> {
        (0..matrix.rows())
            .map(|i| {
                (0..matrix.cols())
                    .map(|j| {
                        let cell = self
                            .lib
                            .matrix_get_entry(matrix, i, j)
                            .ok_or_else(|| OracleError::ParseFailure(format!("no entry at ({}, {})", i, j)))?;
                        cell.trim().parse::<BigInt>().map_err(|_| {
                            OracleError::ParseFailure(format!("entry ({}, {}) is not an integer: {:?}", i, j, cell))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Integer combination `sum round(c_i) * b_i`.
fn combine(rows: &[Vec<BigInt>], coords: &[f64]) -> Result<Vec<BigInt>, OracleError> {
    let dim = rows.first().map_or(0, Vec::len);
    let mut vector = vec![BigInt::zero(); dim];
    for (row, &c) in rows.iter().zip(coords) {
        let c = BigInt::from_f64(c.round())
            .ok_or_else(|| OracleError::ParseFailure(format!("coordinate {} is not finite", c)))?;
        if c.is_zero() {
            continue;
        }
        for (acc, x) in vector.iter_mut().zip(row) {
            *acc += &c * x;
        }
    }
    Ok(vector)
}

impl<L: EngineLibrary> ReductionBackend for NativeBackend<L> {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn shortest_vector(&self, basis: &LatticeBasis, radius: f64) -> Result<SvpOutcome, OracleError> {
        enter_phase(self.kind(), QueryPhase::Serializing);
        let matrix = self.marshal(basis)?;

        enter_phase(self.kind(), QueryPhase::Invoking);
        if let Some(block) = self.config.preprocess_block_size {
            let block = block.min(basis.rank());
            if block >= 2 {
                self.bkz(&matrix, block)?;
            }
        }
        let gso = GsoHandle::alloc(&self.lib, &matrix).ok_or_else(|| engine_failure("GSO allocation"))?;
        if !self.lib.gso_update(&gso) {
            return Err(engine_failure("GSO update"));
        }
        if !self.lib.size_reduce(&gso) || !self.lib.gso_update(&gso) {
            return Err(engine_failure("size reduction"));
        }

        let squared_radius = radius * radius;
        let mut coords = vec![0.0; basis.rank()];
        let reported = match self.lib.enumerate(&gso, squared_radius, &mut coords) {
            EnumStatus::Found { squared_norm } => squared_norm,
            EnumStatus::Exhausted => return Ok(SvpOutcome::NotFoundWithinRadius { radius }),
            EnumStatus::Failed => return Err(engine_failure("enumeration")),
        };

        enter_phase(self.kind(), QueryPhase::Parsing);
        let rows = self.read_rows(&matrix)?;
        let vector = combine(&rows, &coords)?;
        let exact = squared_norm(&vector);
        if exact.is_zero() {
            return Err(OracleError::ParseFailure("enumeration returned the zero vector".into()));
        }
        let exact = exact.to_f64().unwrap_or(f64::INFINITY);
        if (exact - reported).abs() > 1e-6 * exact.max(1.0) {
            log::warn!(
                "engine reported squared norm {} but the vector has {}; using the latter",
                reported,
                exact
            );
        }
        if exact > squared_radius * (1.0 + 1e-9) {
            return Ok(SvpOutcome::NotFoundWithinRadius { radius });
        }
        Ok(SvpOutcome::Found(FoundVector {
            vector: Some(vector),
            squared_norm: exact,
        }))
    }

    fn reduced_profile(&self, basis: &LatticeBasis, block_size: usize) -> Result<Profile, OracleError> {
        enter_phase(self.kind(), QueryPhase::Serializing);
        let matrix = self.marshal(basis)?;

        enter_phase(self.kind(), QueryPhase::Invoking);
        self.bkz(&matrix, block_size)?;
        let gso = GsoHandle::alloc(&self.lib, &matrix).ok_or_else(|| engine_failure("GSO allocation"))?;
        if !self.lib.gso_update(&gso) {
            return Err(engine_failure("GSO update"));
        }

        enter_phase(self.kind(), QueryPhase::Parsing);
        (0..basis.rank())
            .map(|i| {
                let r = self.lib.gso_squared_norm(&gso, i);
                if r.is_finite() && r > 0.0 {
                    Ok(0.5 * r.log2())
                } else {
                    Err(OracleError::ParseFailure(format!(
                        "Gram-Schmidt norm {} is {}",
                        i, r
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Profile::new)
    }
}

/// Native backend over the linked engine library.
#[cfg(feature = "fplll")]
pub fn linked_backend(config: NativeConfig) -> Result<Box<dyn ReductionBackend>, OracleError> {
    Ok(Box::new(NativeBackend::new(linked::LinkedEngine, config)))
}

/// Native backend over the linked engine library.
#[cfg(not(feature = "fplll"))]
pub fn linked_backend(_config: NativeConfig) -> Result<Box<dyn ReductionBackend>, OracleError> {
    Err(OracleError::BackendUnavailable(
        "built without the `fplll` feature; rebuild with `--features fplll`".into(),
    ))
}
