//! Integer lattices for heuristic experiments.
//!
//! Builds q-ary and uniformly random bases over arbitrary-precision integers,
//! computes their covolume exactly, and evaluates the Gaussian Heuristic.
//! Also carries small floating-point Gram-Schmidt and LLL routines used by the
//! in-process (simulated) reduction backend.

pub mod basis;
pub mod generate;
pub mod gso;
pub mod heuristic;
pub mod volume;

pub use basis::{inner_product, squared_norm, FloatBasis, LatticeBasis};
pub use generate::{qary_basis, qary_basis_os, random_basis, random_basis_os, EntryRange};
pub use gso::{basis_quality, gram_schmidt, gso_squared_norms, lll_reduce, BasisQuality, LllParams};
pub use heuristic::{gaussian_heuristic, gaussian_heuristic_for, gaussian_heuristic_log2};
pub use volume::{approximate_volume, volume, Volume};

/// Errors from basis construction and heuristic evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LatticeError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("a basis needs at least one row and one column")]
    EmptyBasis,

    #[error("row {row} has {found} entries, expected {expected}")]
    RaggedBasis {
        row: usize,
        expected: usize,
        found: usize,
    },
}
